//! GET: serve a file, or a directory's `index.html`.

use std::io;

use crate::handlers::{HandlerContext, HandlerError};
use crate::http::mime::content_type_for;
use crate::http::request::Request;
use crate::http::response::Response;

pub async fn handle(ctx: &HandlerContext, request: &Request) -> Result<Response, HandlerError> {
    tracing::info!(uri = %request.uri(), "Handling GET request");
    let location = ctx.resolve(request.uri());

    let metadata = match tokio::fs::metadata(&location).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Response::not_found()),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        let index = location.join("index.html");
        return match tokio::fs::read(&index).await {
            Ok(body) => Ok(Response::ok(body, "text/html")),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Response::not_found()),
            Err(e) => Err(e.into()),
        };
    }

    if metadata.is_file() {
        let body = tokio::fs::read(&location).await?;
        return Ok(Response::ok(body, content_type_for(&location)));
    }

    Ok(Response::not_found())
}
