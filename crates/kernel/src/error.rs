//! Errors returned by page and plugin handlers.
//!
//! Every error answers with a status code and an `HX-Trigger` toast, so
//! HTMX forms report failures inline the same way they report success.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routes::helpers::toast;

/// Handler error.
#[derive(Debug, Error)]
pub enum AppError {
    /// The requested post, product or page does not exist.
    #[error("Not found")]
    NotFound,

    /// Submitted form data failed validation.
    #[error("Invalid data: {0}")]
    BadRequest(String),

    /// Anything else. Logged; the client only sees a generic message.
    #[error("Something went wrong, please try again")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            tracing::error!(error = %format!("{e:#}"), "request failed");
        }
        toast(self.status(), &self.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
