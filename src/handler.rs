use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::Extension,
    headers::{ContentLength, ContentType, HeaderMapExt},
    http::Request,
    response::IntoResponse,
    TypedHeader,
};
use mime::Mime;

use crate::{error::AppError, page::Page, pipeline::Outcome, pipeline::Pipeline};

const APP_JS: &str = include_str!("../static/app.js");
const STYLE_CSS: &str = include_str!("../static/style.css");

pub async fn index() -> Page {
    Outcome::Idle.into()
}

pub async fn submit(
    Extension(pipeline): Extension<Arc<Pipeline>>,
    mut request: Request<Body>,
) -> Result<Page, AppError> {
    let limit = pipeline.max_content_length();

    if let Some(content_type) = request.headers().typed_get::<ContentType>() {
        let content_type = Mime::from(content_type);
        if !is_form(&content_type) {
            tracing::info!(%content_type, "submission is not an urlencoded form");
            return Ok(Outcome::Unsupported.into());
        }
    }

    if let Some(ContentLength(len)) = request.headers().typed_get::<ContentLength>() {
        if !pipeline.admits(len) {
            tracing::info!(content_length = len, limit, "submission too large");
            return Ok(pipeline.too_large().into());
        }
    }

    let body = match read_limited(request.body_mut(), limit).await? {
        Some(body) => body,
        None => {
            tracing::info!(limit, "submission too large");
            return Ok(pipeline.too_large().into());
        }
    };

    Ok(pipeline.submit(&body).into())
}

fn is_form(content_type: &Mime) -> bool {
    content_type.type_() == mime::APPLICATION
        && content_type.subtype() == mime::WWW_FORM_URLENCODED
}

/// Buffer the body, giving up with `None` as soon as it passes `limit` bytes.
async fn read_limited(body: &mut Body, limit: usize) -> Result<Option<Vec<u8>>, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf))
}

pub async fn script() -> impl IntoResponse {
    (
        TypedHeader(ContentType::from(mime::APPLICATION_JAVASCRIPT_UTF_8)),
        APP_JS,
    )
}

pub async fn stylesheet() -> impl IntoResponse {
    (TypedHeader(ContentType::from(mime::TEXT_CSS_UTF_8)), STYLE_CSS)
}
