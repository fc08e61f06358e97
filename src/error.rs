//! Error types for the HR assistant.
//!
//! `HrError` covers every failure in the service and converts into the three
//! shapes callers need:
//! - RMCP's `ErrorData` for the MCP surface
//! - an axum response (`{"error": ...}` with a matching status) for HTTP
//! - a `{"success": false, "message": ...}` payload handed back to the model

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rmcp::{ErrorData, model::ErrorCode};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HrError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    UnexpectedResponse(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T, E = HrError> = std::result::Result<T, E>;

impl HrError {
    /// Payload returned to the language model in place of a tool result.
    pub fn to_tool_output(&self) -> Value {
        json!({
            "success": false,
            "message": self.to_string(),
        })
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParams(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnexpectedResponse(_)
            | Self::Llm(_)
            | Self::Http(_)
            | Self::HttpMiddleware(_) => StatusCode::BAD_GATEWAY,
            Self::MissingConfig(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<HrError> for ErrorData {
    fn from(err: HrError) -> Self {
        match err {
            HrError::InvalidParams(msg) => Self::new(ErrorCode::INVALID_PARAMS, msg, None),
            HrError::AccessDenied(msg) => Self::new(
                ErrorCode::INVALID_REQUEST,
                format!("Access denied: {msg}"),
                None,
            ),
            HrError::NotFound(msg) => Self::new(ErrorCode::RESOURCE_NOT_FOUND, msg, None),
            other => Self::new(ErrorCode::INTERNAL_ERROR, other.to_string(), None),
        }
    }
}

impl IntoResponse for HrError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_output_carries_message() {
        let err = HrError::AccessDenied("EMP200 is not on your team".to_string());
        let out = err.to_tool_output();
        assert_eq!(out["success"], false);
        assert_eq!(out["message"], "Access denied: EMP200 is not on your team");
    }

    #[test]
    fn invalid_params_maps_to_mcp_invalid_params() {
        let data = ErrorData::from(HrError::InvalidParams("employee_id".to_string()));
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn http_status_follows_variant() {
        assert_eq!(
            HrError::Authentication("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HrError::Llm("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
