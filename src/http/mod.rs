//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted TCP connection
//!     → server.rs (connection span, one request per connection)
//!     → parser.rs (request line, headers, Content-Length body)
//!     → dispatcher.rs (method → handlers::{get,post,put,delete})
//!     → response.rs (status line, Date, Connection: close, body)
//!     → Send to client, close
//! ```

pub mod dispatcher;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use parser::{ParseError, RequestParser};
pub use request::{Headers, Method, Request};
pub use response::{Response, StatusCode};
pub use server::{HttpServer, ServerError, ServerState};
