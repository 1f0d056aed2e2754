use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::utils::completion::CompletionError;
use crate::utils::pdf::PdfError;

pub const INVALID_REQUEST_BODY: &str = "Please enter a message";
pub const MISSING_CREDENTIAL_BODY: &str = "API key not found";
pub const PARSE_ERROR_BODY: &str = "failed to extract text from PDF";
pub const INTERNAL_ERROR_BODY: &str = "internal server error";

/// Every way a request to the service can fail. All variants end the current
/// request; none of them are retried.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Parse(#[from] PdfError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("API key for the completion provider is not configured")]
    Configuration,

    #[error("completion provider call failed: {0}")]
    Upstream(#[from] CompletionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Parse(_)
            | GatewayError::Configuration
            | GatewayError::Upstream(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body sent to the client. Upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::InvalidRequest(message) => message.clone(),
            GatewayError::Parse(_) => PARSE_ERROR_BODY.to_string(),
            GatewayError::Configuration => MISSING_CREDENTIAL_BODY.to_string(),
            GatewayError::Upstream(_) | GatewayError::Internal(_) => {
                INTERNAL_ERROR_BODY.to_string()
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
