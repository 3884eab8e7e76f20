//! Request-side adapters between axum and the action dispatcher.
//!
//! - [`FormSubmission`] -- extracts a [`FormData`] from a urlencoded or
//!   multipart body.
//! - [`HeaderContext`] -- exposes request headers as a [`RequestContext`].

use anyhow::Context;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::{CONTENT_TYPE, REFERER};
use axum::http::{HeaderMap, HeaderValue};
use axum::Form;
use formaction_core::{FormData, RequestContext, UploadedFile};

use crate::error::{AppError, AppResult};

/// A raw form submission, in field order.
#[derive(Debug, Clone)]
pub struct FormSubmission(pub FormData);

const URL_ENCODED: &str = "application/x-www-form-urlencoded";

enum BodyKind {
    Multipart,
    UrlEncoded,
    /// No `Content-Type` at all; read as urlencoded.
    Undeclared,
    Other(String),
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return BodyKind::Undeclared;
    };
    let content_type = content_type.to_str().unwrap_or_default();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "multipart/form-data" => BodyKind::Multipart,
        URL_ENCODED => BodyKind::UrlEncoded,
        _ => BodyKind::Other(essence),
    }
}

impl<S> FromRequest<S> for FormSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(mut req: Request, state: &S) -> AppResult<Self> {
        match body_kind(req.headers()) {
            BodyKind::Multipart => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                read_multipart(multipart).await.map(FormSubmission)
            }
            BodyKind::Undeclared => {
                req.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(URL_ENCODED));
                read_urlencoded(req, state).await.map(FormSubmission)
            }
            BodyKind::UrlEncoded => read_urlencoded(req, state).await.map(FormSubmission),
            BodyKind::Other(content_type) => Err(AppError::UnsupportedMediaType(format!(
                "Expected a form submission, got `{content_type}`"
            ))),
        }
    }
}

async fn read_urlencoded<S: Send + Sync>(req: Request, state: &S) -> AppResult<FormData> {
    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(pairs.into_iter().collect())
}

/// Read every multipart field. Parts with a file name become files.
async fn read_multipart(mut multipart: Multipart) -> AppResult<FormData> {
    let mut form = FormData::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.append_file(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.append_text(name, text);
            }
        }
    }

    Ok(form)
}

/// Request headers viewed as diagnostic context for action errors.
pub struct HeaderContext<'a> {
    headers: &'a HeaderMap,
}

impl<'a> HeaderContext<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }
}

impl RequestContext for HeaderContext<'_> {
    fn referer(&self) -> anyhow::Result<Option<String>> {
        let Some(value) = self.headers.get(REFERER) else {
            return Ok(None);
        };
        let referer = value
            .to_str()
            .context("referer header is not visible ASCII")?;
        Ok(Some(referer.to_string()))
    }
}
