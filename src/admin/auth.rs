use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};

use crate::admin::handlers::ApiError;
use crate::admin::AdminState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Guards mutating control-plane calls.
///
/// Loopback callers pass without a credential; everyone else needs
/// `Authorization: Bearer <admin.api_key>`.
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = effective_client_ip(peer, request.headers());
    if client.is_loopback() {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(auth_val) = auth_header else {
        tracing::warn!(client = %client, path = %request.uri().path(), "Missing credential on mutating call");
        return ApiError::AuthRequired.into_response();
    };

    match state.api_key.as_deref() {
        Some(key) if auth_val == format!("Bearer {key}") => next.run(request).await,
        _ => {
            tracing::warn!(client = %client, path = %request.uri().path(), "Rejected credential on mutating call");
            ApiError::Forbidden.into_response()
        }
    }
}

/// The address a request really comes from.
///
/// Requests relayed by the gateway's own data plane arrive from loopback, so
/// for those the right-most `X-Forwarded-For` entry (the hop our proxy
/// appended) is used instead of the socket peer.
pub fn effective_client_ip(peer: SocketAddr, headers: &HeaderMap) -> IpAddr {
    if !peer.ip().is_loopback() {
        return peer.ip();
    }

    headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .last()
        .and_then(|hop| hop.trim().parse().ok())
        .unwrap_or(peer.ip())
}
