use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use forecourt_types::domain::order::OrderStatus;
use forecourt_types::ports::gateway::GatewayError;

/// Application-level error taxonomy. `Validation` and `InvalidTransition`
/// are raised before any request leaves the console; the rest wrap gateway
/// failures. Local state is never left partially mutated by a failed
/// operation.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("backend read failed: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Write(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Fetch(msg) => AppError::Unavailable(msg),
            GatewayError::Write(msg) => AppError::Write(msg),
            GatewayError::NotFound(msg) => AppError::NotFound(msg),
            GatewayError::Auth(msg) => AppError::Auth(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Write(_) => StatusCode::CONFLICT,
        };

        let body = serde_json::to_string(&ErrorBody {
            error: self.to_string(),
        })
        .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}
