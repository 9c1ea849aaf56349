use axum::{
    headers::ContentType,
    http::StatusCode,
    response::{IntoResponse, Response},
    TypedHeader,
};

use crate::pipeline::{Outcome, RenderResult};

/// The form page, carrying the status the outcome maps to.
#[derive(Debug)]
pub struct Page {
    status: StatusCode,
    result: RenderResult,
}

impl Page {
    pub fn new(status: StatusCode, result: RenderResult) -> Self {
        Self { status, result }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn result(&self) -> &RenderResult {
        &self.result
    }
}

impl From<Outcome> for Page {
    fn from(outcome: Outcome) -> Self {
        let status = outcome.status();
        Self::new(status, outcome.into_result())
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (
            self.status,
            TypedHeader(ContentType::from(mime::TEXT_HTML_UTF_8)),
            render(&self.result),
        )
            .into_response()
    }
}

/// Escape `text` for element content or a double-quoted attribute value.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render(result: &RenderResult) -> String {
    let error = result
        .error
        .as_deref()
        .map(|message| {
            format!(
                "<p class=\"error no-print\" role=\"alert\">{}</p>\n",
                escape_html(message)
            )
        })
        .unwrap_or_default();

    let rendered = if result.rendered_html.is_empty() {
        String::new()
    } else {
        format!(
            "<article class=\"rendered\">\n{}</article>\n",
            result.rendered_html
        )
    };

    // The newline after <textarea> is eaten by the parser, so a source that
    // starts with one keeps it.
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Markdown Print</title>
<link rel="stylesheet" href="/static/style.css">
<script src="/static/app.js" defer></script>
</head>
<body>
<main>
<form method="post" action="/" class="no-print">
<label for="markdown">Markdown</label>
<textarea id="markdown" name="markdown" rows="16" spellcheck="false">
{source}</textarea>
<div class="actions">
<button type="submit">Render</button>
<button type="button" class="js-print">Print</button>
</div>
</form>
{error}{rendered}</main>
</body>
</html>
"#,
        source = escape_html(&result.source),
        error = error,
        rendered = rendered,
    )
}
