//! Gateway error types

use crate::filter::RejectReason;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_kernel::{EncodingError, ValidationErrors};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to callers of the gateway's HTTP endpoints.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Authentication(RejectReason),

    #[error(transparent)]
    Validation(ValidationErrors),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl From<ValidationErrors> for GatewayError {
    fn from(errors: ValidationErrors) -> Self {
        GatewayError::Validation(errors)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            GatewayError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
            }
            GatewayError::Authentication(reason) => {
                (StatusCode::UNAUTHORIZED, reason.code(), reason.to_string())
            }
            GatewayError::DependencyUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, "DEPENDENCY_UNAVAILABLE", msg)
            }
            GatewayError::Encoding(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ENCODING_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
