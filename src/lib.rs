//! mdprint - paste Markdown, get a printable, sanitized HTML page.
//!
//! A single form at `/`. A submission is size-checked, converted from
//! Markdown (CommonMark plus tables, footnotes and task lists), passed through
//! a whitelist sanitizer, and rendered back into the page.
//!
//! Every response carries a fixed set of security headers. The page may
//! only load scripts and styles from its own origin, and may not be framed.
//! Author HTML, when allowed at all, still goes through the sanitizer.

pub mod config;
pub mod error;
pub mod handler;
pub mod markdown;
pub mod page;
pub mod pipeline;
pub mod sanitize;

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
        HeaderValue,
    },
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

pub use config::Settings;
pub use pipeline::{Outcome, Pipeline, RenderResult};

pub const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; \
    img-src 'self' http: https:; \
    style-src 'self'; \
    script-src 'self'; \
    base-uri 'none'; \
    form-action 'self'; \
    frame-ancestors 'none'";

/// Build the application router around an immutable set of settings.
pub fn router(settings: Settings) -> Router {
    let pipeline = Arc::new(Pipeline::new(Arc::new(settings)));

    Router::new()
        .route("/", get(handler::index).post(handler::submit))
        .route("/static/app.js", get(handler::script))
        .route("/static/style.css", get(handler::stylesheet))
        .layer(Extension(pipeline))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
                )),
        )
}
