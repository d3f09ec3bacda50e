//! Response values and their wire serialization.
//!
//! # Responsibilities
//! - Represent a response as an immutable (status, headers, body) value
//! - Build canned responses for each status family
//! - Serialize a response onto a connection
//!
//! # Design Decisions
//! - Constructors are pure functions; writing is a separate step
//! - Every response carries `Date` and `Connection: close`
//! - Error bodies are `{"error": ..., "message": ...}` JSON objects

use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

const PROTOCOL_VERSION: &str = "HTTP/1.1";

const NOT_FOUND_BODY: &str = "<html><body><h1>404 Not Found</h1></body></html>";

const SERVICE_UNAVAILABLE_BODY: &str = "<html><body>\
<h1>503 Service Unavailable</h1>\
<p>The server is currently unable to handle the request due to temporary overloading or maintenance.</p>\
</body></html>";

/// An HTTP response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    fn new(status: StatusCode, body: Vec<u8>) -> Self {
        let mut headers = vec![
            ("Date".to_string(), http_date()),
            ("Connection".to_string(), "close".to_string()),
        ];
        if !body.is_empty() {
            headers.push(("Content-Length".to_string(), body.len().to_string()));
        }
        Self {
            status,
            headers,
            body,
        }
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    fn error_json(status: StatusCode, label: &str, message: &str) -> Self {
        let body = json!({ "error": label, "message": message }).to_string();
        Self::new(status, body.into_bytes()).with_header("Content-Type", "application/json")
    }

    /// 200 with a body of the given type.
    pub fn ok(body: Vec<u8>, content_type: &str) -> Self {
        Self::new(StatusCode::Ok, body).with_header("Content-Type", content_type)
    }

    /// 201 pointing at the created resource.
    pub fn created(body: Vec<u8>, content_type: &str, location: &str) -> Self {
        Self::new(StatusCode::Created, body)
            .with_header("Content-Type", content_type)
            .with_header("Location", location)
    }

    /// 204 naming the affected resource.
    pub fn no_content(content_location: &str) -> Self {
        Self::new(StatusCode::NoContent, Vec::new()).with_header("Content-Location", content_location)
    }

    /// 400 with an explanatory message.
    pub fn bad_request(message: &str) -> Self {
        Self::error_json(StatusCode::BadRequest, "Bad Request", message)
    }

    /// 400 with a caller-supplied body.
    pub fn bad_request_with(body: Vec<u8>, content_type: &str) -> Self {
        Self::new(StatusCode::BadRequest, body).with_header("Content-Type", content_type)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::error_json(StatusCode::Forbidden, "InsufficientPermissions", message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound, NOT_FOUND_BODY.as_bytes().to_vec())
            .with_header("Content-Type", "text/html")
    }

    pub fn server_error(message: &str) -> Self {
        Self::error_json(StatusCode::InternalServerError, "Server error", message)
    }

    /// 503 sent to connections refused by the admission gate.
    pub fn service_unavailable() -> Self {
        Self::new(
            StatusCode::ServiceUnavailable,
            SERVICE_UNAVAILABLE_BODY.as_bytes().to_vec(),
        )
        .with_header("Content-Type", "text/html")
        .with_header("Retry-After", "60")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serialize status line, headers, blank line and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}\r\n",
            PROTOCOL_VERSION,
            self.status.as_u16(),
            self.status.reason()
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Write the serialized response and flush.
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await
    }
}

/// Current time as an RFC 1123 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(response: &Response) -> String {
        String::from_utf8(response.to_bytes()).unwrap()
    }

    #[test]
    fn ok_serializes_status_line_headers_and_body() {
        let response = Response::ok(b"hello".to_vec(), "text/plain");
        let wire = text(&response);

        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("\r\nConnection: close\r\n"));
        assert!(wire.contains("\r\nContent-Length: 5\r\n"));
        assert!(wire.contains("\r\nContent-Type: text/plain\r\n"));
        assert!(wire.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn every_response_has_a_date() {
        let response = Response::no_content("./a.txt");
        let date = response.header("Date").unwrap();
        assert!(date.ends_with(" GMT"));
        assert_eq!(date.len(), "Sun, 06 Nov 1994 08:49:37 GMT".len());
    }

    #[test]
    fn no_content_has_no_body_or_length() {
        let response = Response::no_content("./a.txt");
        assert_eq!(response.status().as_u16(), 204);
        assert_eq!(response.header("Content-Length"), None);
        assert_eq!(response.header("Content-Location"), Some("./a.txt"));
        assert!(text(&response).ends_with("\r\n\r\n"));
    }

    #[test]
    fn service_unavailable_suggests_retry() {
        let response = Response::service_unavailable();
        assert_eq!(response.status(), StatusCode::ServiceUnavailable);
        assert_eq!(response.header("Retry-After"), Some("60"));
        assert!(text(&response).starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    }

    #[test]
    fn error_bodies_are_json_objects() {
        let response = Response::bad_request("Invalid request line format");
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["message"], "Invalid request line format");
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let forbidden: serde_json::Value =
            serde_json::from_slice(Response::forbidden("no").body()).unwrap();
        assert_eq!(forbidden["error"], "InsufficientPermissions");
    }

    #[test]
    fn reasons_cover_all_statuses() {
        assert_eq!(StatusCode::Unauthorized.reason(), "Unauthorized");
        assert_eq!(StatusCode::BadGateway.as_u16(), 502);
        assert_eq!(StatusCode::InternalServerError.reason(), "Internal Server Error");
    }

    #[tokio::test]
    async fn write_to_emits_serialized_bytes() {
        let response = Response::not_found();
        let mut out = Vec::new();
        response.write_to(&mut out).await.unwrap();
        assert_eq!(out, response.to_bytes());
    }
}
