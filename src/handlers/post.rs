//! POST: accept form, JSON or multipart submissions against an existing path.
//!
//! | Content-Type                        | Effect                                      |
//! |-------------------------------------|---------------------------------------------|
//! | `application/x-www-form-urlencoded` | body stored as `file*.txt`, pairs echoed    |
//! | `application/json`                  | body stored as `file*.json`                 |
//! | `multipart/form-data; boundary=…`   | files saved into the target directory,      |
//! |                                     | fields stored as `fieldInfo*.json`          |
//!
//! Anything else is a 400.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;
use tokio::io::AsyncWriteExt;

use crate::handlers::{create_unique_file, HandlerContext, HandlerError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::multipart::{extract_boundary, MultipartForm};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";
const MULTIPART: &str = "multipart/form-data";

pub async fn handle(ctx: &HandlerContext, request: &Request) -> Result<Response, HandlerError> {
    tracing::info!(uri = %request.uri(), "Handling POST request");
    let location = ctx.resolve(request.uri());

    if !tokio::fs::try_exists(&location).await? {
        return Ok(Response::not_found());
    }

    let content_type = request.header("Content-Type").unwrap_or_default();
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        FORM_URLENCODED => handle_url_encoded(ctx, request, &location).await,
        JSON => handle_json(ctx, request, &location).await,
        _ if media_type.contains(MULTIPART) => match extract_boundary(content_type) {
            Some(boundary) => handle_multipart(ctx, request, &location, &boundary).await,
            None => {
                tracing::error!("Missing boundary in multipart/form-data request");
                let body = json!({
                    "error": "Bad request",
                    "message": "Missing boundary in multipart/form-data request",
                });
                Ok(Response::bad_request_with(body.to_string().into_bytes(), JSON))
            }
        },
        _ => Ok(Response::bad_request("Unsupported POST operation")),
    }
}

/// `a=1&b=2` → `{"a": "1", "b": "2"}`. Split on the first `=`; a pair without
/// one maps to an empty value. No percent-decoding is applied.
pub fn parse_url_encoded(body: &str) -> BTreeMap<String, String> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

async fn handle_url_encoded(
    ctx: &HandlerContext,
    request: &Request,
    location: &Path,
) -> Result<Response, HandlerError> {
    let body = String::from_utf8_lossy(request.body_or_empty());
    tracing::info!(body = %body, "Posting x-www-form-urlencoded request");

    if store(ctx, "file", "txt", request.body_or_empty()).await.is_none() {
        return Ok(Response::server_error("Failed to create file for form data"));
    }

    let pairs = parse_url_encoded(&body);
    let json = serde_json::to_vec(&pairs).unwrap_or_default();
    Ok(Response::created(json, JSON, &location.to_string_lossy()))
}

async fn handle_json(
    ctx: &HandlerContext,
    request: &Request,
    location: &Path,
) -> Result<Response, HandlerError> {
    tracing::info!(bytes = request.body_or_empty().len(), "Posting json request");

    let Some(stored) = store(ctx, "file", "json", request.body_or_empty()).await else {
        return Ok(Response::server_error("Failed to create file for form data"));
    };

    let body = json!({ "message": "JSON payload stored", "file": stored });
    Ok(Response::created(
        body.to_string().into_bytes(),
        JSON,
        &location.to_string_lossy(),
    ))
}

async fn handle_multipart(
    ctx: &HandlerContext,
    request: &Request,
    location: &Path,
    boundary: &str,
) -> Result<Response, HandlerError> {
    tracing::info!(boundary, "Found boundary");

    let form = match MultipartForm::decode(request.body_or_empty(), boundary, location).await {
        Ok(form) => form,
        Err(e) => {
            tracing::error!(error = %e, "Multipart upload failed");
            return Ok(Response::server_error("Internal error uploading file"));
        }
    };

    let metadata = serde_json::to_vec_pretty(&form.fields).unwrap_or_default();
    if store(ctx, "fieldInfo", "json", &metadata).await.is_none() {
        return Ok(Response::server_error("Failed to create file for form data"));
    }

    let mut body = serde_json::to_value(&form).unwrap_or_default();
    body["message"] = json!("Files uploaded successfully");
    Ok(Response::created(
        body.to_string().into_bytes(),
        JSON,
        &location.to_string_lossy(),
    ))
}

/// Write `contents` to a fresh `<stem>*.<ext>` in the web root and return its
/// file name, or `None` after logging why it could not be stored.
async fn store(ctx: &HandlerContext, stem: &str, ext: &str, contents: &[u8]) -> Option<String> {
    let result = async {
        let (path, mut file) = create_unique_file(ctx.web_root(), stem, ext).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        Ok::<_, std::io::Error>(path)
    }
    .await;

    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Stored request payload");
            path.file_name().map(|n| n.to_string_lossy().into_owned())
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create file for form data");
            None
        }
    }
}
