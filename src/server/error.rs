//! Mapping of library errors onto HTTP responses

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ChunkdError;

/// A failed request: route message, cause, and whether to show the cause
#[derive(Debug)]
pub struct ApiError {
    message: &'static str,
    source: ChunkdError,
    expose_details: bool,
}

impl ApiError {
    pub fn new(message: &'static str, source: ChunkdError, expose_details: bool) -> Self {
        Self {
            message,
            source,
            expose_details,
        }
    }

    /// Malformed request body
    pub fn rejection(message: &'static str, rejection: JsonRejection, expose_details: bool) -> Self {
        Self::new(message, ChunkdError::Validation(rejection.body_text()), expose_details)
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.source)
    }
}

pub fn status_for(error: &ChunkdError) -> StatusCode {
    match error {
        ChunkdError::Validation(_) | ChunkdError::Json(_) => StatusCode::BAD_REQUEST,
        ChunkdError::NotFound(_) => StatusCode::NOT_FOUND,
        ChunkdError::ClaimLost(_) => StatusCode::CONFLICT,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}: {}", self.message, self.source);
        } else {
            log::warn!("{}: {}", self.message, self.source);
        }

        let body = if self.expose_details {
            json!({ "error": self.message, "details": self.source.to_string() })
        } else {
            json!({ "error": self.message })
        };
        (status, Json(body)).into_response()
    }
}
