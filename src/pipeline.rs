use std::sync::Arc;

use axum::http::StatusCode;

use crate::{config::Settings, markdown, sanitize};

pub const EMPTY_MESSAGE: &str = "Paste Markdown to render.";
pub const MALFORMED_MESSAGE: &str = "Could not read the submitted form.";
pub const UNSUPPORTED_MESSAGE: &str = "Submit the form as application/x-www-form-urlencoded.";

/// The form field holding the Markdown source.
const MARKDOWN_FIELD: &str = "markdown";

/// What the page shows for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    /// The submission as received, to repopulate the form.
    pub source: String,
    /// Sanitized HTML; empty unless the submission rendered.
    pub rendered_html: String,
    pub error: Option<String>,
}

/// Terminal state of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing submitted yet.
    Idle,
    TooLarge { limit: usize },
    /// The body could not be read off the connection.
    Malformed,
    /// The body is not an urlencoded form.
    Unsupported,
    Empty { source: String },
    Rendered { source: String, html: String },
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Outcome::Malformed => StatusCode::BAD_REQUEST,
            Outcome::Unsupported => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Outcome::Idle | Outcome::Empty { .. } | Outcome::Rendered { .. } => StatusCode::OK,
        }
    }

    pub fn into_result(self) -> RenderResult {
        match self {
            Outcome::Idle => RenderResult::default(),
            Outcome::TooLarge { limit } => RenderResult {
                error: Some(too_large_message(limit)),
                ..RenderResult::default()
            },
            Outcome::Malformed => RenderResult {
                error: Some(MALFORMED_MESSAGE.into()),
                ..RenderResult::default()
            },
            Outcome::Unsupported => RenderResult {
                error: Some(UNSUPPORTED_MESSAGE.into()),
                ..RenderResult::default()
            },
            Outcome::Empty { source } => RenderResult {
                source,
                rendered_html: String::new(),
                error: Some(EMPTY_MESSAGE.into()),
            },
            Outcome::Rendered { source, html } => RenderResult {
                source,
                rendered_html: html,
                error: None,
            },
        }
    }
}

/// Size limit rounded up to whole kilobytes, never below one.
pub fn limit_kb(limit: usize) -> usize {
    (limit / 1024 + usize::from(limit % 1024 != 0)).max(1)
}

pub fn too_large_message(limit: usize) -> String {
    format!("Markdown is too large. Limit is {} KB.", limit_kb(limit))
}

/// First value of the `markdown` field; a repeated field keeps its first value.
fn markdown_field(body: &[u8]) -> String {
    form_urlencoded_pairs(body)
        .into_iter()
        .find_map(|(name, value)| (name == MARKDOWN_FIELD).then_some(value))
        .unwrap_or_default()
}

fn form_urlencoded_pairs(body: &[u8]) -> Vec<(String, String)> {
    // Percent-decoding is lossy, so a form body always decodes.
    serde_urlencoded::from_bytes(body).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "undecodable form body");
        Vec::new()
    })
}

/// Render-then-sanitize, configured once at startup.
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: Arc<Settings>,
}

impl Pipeline {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn max_content_length(&self) -> usize {
        self.settings.max_content_length
    }

    /// Whether a body of `len` bytes is within the size limit.
    pub fn admits(&self, len: u64) -> bool {
        len <= self.settings.max_content_length as u64
    }

    pub fn too_large(&self) -> Outcome {
        Outcome::TooLarge {
            limit: self.settings.max_content_length,
        }
    }

    /// Decode an urlencoded form body and render its `markdown` field.
    pub fn submit(&self, body: &[u8]) -> Outcome {
        if !self.admits(body.len() as u64) {
            return self.too_large();
        }
        self.render(markdown_field(body))
    }

    pub fn render(&self, source: String) -> Outcome {
        if source.trim().is_empty() {
            return Outcome::Empty { source };
        }

        let converted = markdown::convert(&source, self.settings.allow_html);
        let html = sanitize::sanitize(&converted);
        tracing::debug!(
            source_bytes = source.len(),
            converted_bytes = converted.len(),
            html_bytes = html.len(),
            "rendered submission"
        );
        Outcome::Rendered { source, html }
    }
}
