//! Error types for the Saga server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use saga_model::KnowledgeError;
use serde::Serialize;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Error body returned by every failing route.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

/// A knowledge base error on its way out as an HTTP response.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] pub KnowledgeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            KnowledgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            KnowledgeError::Validation(_) => StatusCode::BAD_REQUEST,
            KnowledgeError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            KnowledgeError::NotFound { .. } => ErrorResponse {
                message: self.0.to_string(),
                code: "not_found".to_string(),
            },
            KnowledgeError::Validation(message) => ErrorResponse {
                message: message.clone(),
                code: "validation_error".to_string(),
            },
            KnowledgeError::Unexpected(detail) => {
                tracing::error!(error = %detail, "Unhandled failure");
                ErrorResponse {
                    message: "Internal server error".to_string(),
                    code: "internal_error".to_string(),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
