//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::openai::UpstreamError;

pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "Quota exceeded. Please check your plan and billing details.";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again later.";

// Errors

pub struct ApiError(anyhow::Error);

/// Convert `ApiError` into an Axum compatible response. Upstream
/// details are logged but never returned to the caller.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Always log the error
        tracing::error!("{:#}", self.0);

        let quota_exceeded = self
            .0
            .downcast_ref::<UpstreamError>()
            .is_some_and(UpstreamError::is_quota_exceeded);

        if quota_exceeded {
            (StatusCode::TOO_MANY_REQUESTS, QUOTA_EXCEEDED_MESSAGE).into_response()
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE).into_response()
        }
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}
