//! Minimal origin HTTP server library.
//!
//! Accepts raw TCP connections, parses HTTP/1.1 requests by hand, and serves
//! GET/POST/PUT/DELETE against a directory on disk, including
//! `multipart/form-data` uploads.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod multipart;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
