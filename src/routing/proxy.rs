//! Single-host reverse proxy handler.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend target (scheme, authority,
//!   base path and query)
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Stream request and response bodies without buffering
//!
//! # Design Decisions
//! - One handler per route, all sharing a pooled upstream client
//! - The `Host` header is passed through untouched
//! - Upstream failures become a bare 502

use axum::{
    body::Body,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use url::Url;

/// Upstream HTTP client shared by every route.
pub type ProxyClient = Client<HttpConnector, Body>;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that apply to a single connection and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("proxy-connection"),
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the pooled client used for upstream requests.
pub fn build_client() -> ProxyClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Forwards requests to one backend base URL.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    target: Url,
    client: ProxyClient,
}

impl ReverseProxy {
    pub fn new(target: Url, client: ProxyClient) -> Self {
        Self { target, client }
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Forward `request` to the backend and return its response verbatim.
    pub async fn forward(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response {
        let (mut parts, body) = request.into_parts();

        parts.uri = match self.rewrite_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(target_url = %self.target, error = %e, "Failed to build upstream URI");
                return StatusCode::BAD_GATEWAY.into_response();
            }
        };
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        let upstream = Request::from_parts(parts, body);
        let uri = upstream.uri().clone();

        match self.client.request(upstream).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::warn!(upstream = %uri, error = %e, "Upstream request failed");
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }

    fn rewrite_uri(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let host = self.target.host_str().unwrap_or_default();
        let authority = match self.target.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let path = join_paths(self.target.path(), uri.path());
        let path_and_query = match (self.target.query(), uri.query()) {
            (Some(t), Some(r)) if !t.is_empty() => format!("{path}?{t}&{r}"),
            (Some(t), None) if !t.is_empty() => format!("{path}?{t}"),
            (_, Some(r)) => format!("{path}?{r}"),
            _ => path,
        };

        Ok(Uri::builder()
            .scheme(Scheme::try_from(self.target.scheme())?)
            .authority(Authority::try_from(authority.as_str())?)
            .path_and_query(PathAndQuery::try_from(path_and_query.as_str())?)
            .build()?)
    }
}

/// Join a base path and a request path with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let client_ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {client_ip}"),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
