//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use tether_core::AccessError;

/// Errors returned by the HTTP handlers
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// No admin secret is configured, so the admin API is switched off
    #[error("ADMIN_SECRET not configured")]
    AdminDisabled,

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Access(#[from] AccessError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AdminDisabled => StatusCode::NOT_IMPLEMENTED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Access(e) => match e {
                AccessError::MeetingNotFound => StatusCode::NOT_FOUND,
                AccessError::TokenNotFound
                | AccessError::MeetingExpired
                | AccessError::WindowExpired => StatusCode::GONE,
                AccessError::CapacityExceeded => StatusCode::FORBIDDEN,
                AccessError::Entropy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
