use axum::response::{IntoResponse, Response};

use crate::{page::Page, pipeline::Outcome};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The client went away or sent a broken body mid-upload.
    #[error("failed to read request body: {0}")]
    Body(#[from] hyper::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "rejecting request");
        Page::from(Outcome::Malformed).into_response()
    }
}
