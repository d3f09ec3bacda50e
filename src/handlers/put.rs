//! PUT: write the body to the target path, replacing any existing file.

use crate::handlers::{HandlerContext, HandlerError};
use crate::http::request::Request;
use crate::http::response::Response;

pub async fn handle(ctx: &HandlerContext, request: &Request) -> Result<Response, HandlerError> {
    let location = ctx.resolve(request.uri());
    tracing::info!(path = %location.display(), "PUT at location");

    if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::error!(path = %location.display(), error = %e, "Failed to create parent directories");
            return Ok(Response::server_error("Failed to create directory structure"));
        }
    }

    let existed = tokio::fs::try_exists(&location).await.unwrap_or(false);
    tokio::fs::write(&location, request.body_or_empty()).await?;

    tracing::info!(
        path = %location.display(),
        bytes = request.body_or_empty().len(),
        "File successfully {}",
        if existed { "updated" } else { "created" }
    );
    Ok(Response::no_content(&location.to_string_lossy()))
}
