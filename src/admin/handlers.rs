use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AdminState;
use crate::config::validation::validate_port;
use crate::routing::Route;

/// Structured result carried by every control-plane response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T = ()> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResult<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T> ApiResult<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Body of `PUT /v1/gateway/port`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePortRequest {
    pub port: String,
}

/// Control-plane failures, mapped onto HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("authorization required")]
    AuthRequired,

    #[error("invalid credential")]
    Forbidden,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResult::<()> {
            success: false,
            message: self.to_string(),
            data: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub message: &'static str,
}

pub async fn ping() -> Json<Pong> {
    Json(Pong {
        message: "pong from management service",
    })
}

pub async fn list_routes(State(state): State<AdminState>) -> Json<Vec<Route>> {
    Json(state.table.routes())
}

pub async fn create_route(
    State(state): State<AdminState>,
    body: Result<Json<Route>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResult>), ApiError> {
    let Json(route) = body?;

    match state.table.create_route(route) {
        Ok(()) => Ok((StatusCode::CREATED, Json(ApiResult::ok("created")))),
        Err(e) if e.is_invalid_input() => Err(ApiError::InvalidInput(e.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create route");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

pub async fn get_port(State(state): State<AdminState>) -> Json<ApiResult<String>> {
    Json(ApiResult::with_data(state.table.gateway_port()))
}

pub async fn set_port(
    State(state): State<AdminState>,
    body: Result<Json<ChangePortRequest>, JsonRejection>,
) -> Result<Json<ApiResult>, ApiError> {
    let Json(request) = body?;
    validate_port(&request.port).map_err(|e| ApiError::InvalidInput(e.to_string()))?;

    tracing::info!(port = %request.port, "Gateway port change requested");
    state
        .table
        .set_gateway_port(request.port.trim())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to change gateway port");
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(ApiResult::ok("ok")))
}
