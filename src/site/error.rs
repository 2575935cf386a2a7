use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use super::routes::NOT_FOUND_PAGE;

/// Errors from the static site server.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// No file or route matched the request.
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Reading a page or binding the listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(ref path) => {
                tracing::info!(path = %path, "404 - File not found");
                (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response()
            }
            Self::Io(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Site internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
