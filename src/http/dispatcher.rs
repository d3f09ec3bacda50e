//! Method dispatch.
//!
//! Routes a parsed request to its filesystem handler and converts handler
//! failures into responses, so nothing propagates out of a worker.

use std::path::PathBuf;

use crate::handlers::{self, HandlerContext};
use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// Dispatches requests against one web root.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            ctx: HandlerContext::new(web_root),
        }
    }

    /// Produce the response for `request`.
    ///
    /// Returns `None` for methods the server does not implement; the caller
    /// closes the connection without answering.
    pub async fn dispatch(&self, request: &Request) -> Option<Response> {
        let result = match request.method() {
            Method::Get => handlers::get::handle(&self.ctx, request).await,
            Method::Post => handlers::post::handle(&self.ctx, request).await,
            Method::Put => handlers::put::handle(&self.ctx, request).await,
            Method::Delete => handlers::delete::handle(&self.ctx, request).await,
            Method::Other(method) => {
                tracing::warn!(method = %method, "Unsupported HTTP method");
                return None;
            }
        };

        Some(result.unwrap_or_else(|e| {
            tracing::error!(method = %request.method(), error = %e, "Error handling request");
            e.into_response()
        }))
    }
}
