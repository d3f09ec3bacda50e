//! DELETE: remove a regular file.

use std::io;
use std::path::Path;

use crate::handlers::{HandlerContext, HandlerError};
use crate::http::request::Request;
use crate::http::response::Response;

pub async fn handle(ctx: &HandlerContext, request: &Request) -> Result<Response, HandlerError> {
    tracing::trace!("Handling DELETE request");
    let location = ctx.resolve(request.uri());

    let metadata = match tokio::fs::metadata(&location).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Response::not_found()),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        return Ok(Response::bad_request(
            "Cannot delete directory using DELETE request",
        ));
    }

    match tokio::fs::remove_file(&location).await {
        Ok(()) => {
            tracing::info!(path = %location.display(), "File successfully deleted");
            Ok(Response::no_content(&location.to_string_lossy()))
        }
        Err(e) => removal_failed(&location, e),
    }
}

/// Classify a failed `remove_file`.
fn removal_failed(location: &Path, e: io::Error) -> Result<Response, HandlerError> {
    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            tracing::warn!(path = %location.display(), "Delete denied");
            Ok(Response::forbidden("Access is denied"))
        }
        // Lost a race with another delete.
        io::ErrorKind::NotFound => Ok(Response::not_found()),
        _ => Err(e.into()),
    }
}
