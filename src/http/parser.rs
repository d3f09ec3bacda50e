//! Line-oriented HTTP/1.1 request parser.
//!
//! # Algorithm
//! ```text
//! request line  → exactly three space-separated tokens, else 400
//! header lines  → split on first ": ", malformed lines skipped
//! head size     → every line and the head as a whole are capped, else 400
//! blank line    → end of head
//! Content-Length N > 0 → read exactly N body bytes, else 400
//! ```
//!
//! Only the request-line shape, an oversized head, the Content-Length value
//! and a short body are fatal. An empty or absent request line means the client sent nothing;
//! the caller closes the connection without answering.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::config::LimitsConfig;
use crate::http::request::{Headers, Method, Request};
use crate::http::response::Response;

/// Why a request could not be parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Client sent something malformed.
    #[error("{0}")]
    BadRequest(String),

    /// Reading from the connection failed.
    #[error("Error parsing request: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    fn bad_request(message: &str) -> Self {
        ParseError::BadRequest(message.to_string())
    }

    /// The response a client receives for this failure.
    pub fn into_response(self) -> Response {
        match self {
            ParseError::BadRequest(message) => Response::bad_request(&message),
            ParseError::Io(e) => Response::server_error(&format!("Error parsing request: {}", e)),
        }
    }
}

/// Parses one request per connection.
#[derive(Debug, Clone)]
pub struct RequestParser {
    max_body_size: usize,
    max_header_line: usize,
    max_header_size: usize,
}

impl RequestParser {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_body_size: limits.max_body_size,
            max_header_line: limits.max_header_line,
            max_header_size: limits.max_header_size,
        }
    }

    /// Read one request from `reader`.
    ///
    /// Returns `Ok(None)` when the request line is blank or the stream ended
    /// before one arrived.
    pub async fn parse<R>(&self, reader: &mut R) -> Result<Option<Request>, ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut head = HeadBudget {
            line_limit: self.max_header_line,
            remaining: self.max_header_size,
        };

        let request_line = match head.read_line(reader).await? {
            Some(line) if !line.trim().is_empty() => line,
            _ => {
                tracing::debug!("Received an empty request line");
                return Ok(None);
            }
        };

        let tokens: Vec<&str> = request_line.split(' ').collect();
        let &[method, uri, version] = tokens.as_slice() else {
            tracing::warn!(request_line = %request_line, "Invalid request line format");
            return Err(ParseError::bad_request("Invalid request line format"));
        };
        tracing::debug!(request_line = %request_line, "Request line");

        let headers = read_headers(reader, &mut head).await?;
        let body = self.read_body(reader, &headers).await?;

        Ok(Some(Request::new(
            Method::from(method),
            uri,
            version,
            headers,
            body,
        )))
    }

    async fn read_body<R>(
        &self,
        reader: &mut R,
        headers: &Headers,
    ) -> Result<Option<Vec<u8>>, ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let Some(raw) = headers.get("Content-Length") else {
            return Ok(None);
        };

        let declared: i64 = raw.trim().parse().map_err(|_| {
            tracing::warn!(content_length = %raw, "Invalid Content-Length header");
            ParseError::bad_request("Invalid Content-Length header")
        })?;
        if declared <= 0 {
            return Ok(None);
        }

        let length = usize::try_from(declared)
            .ok()
            .filter(|&n| n <= self.max_body_size)
            .ok_or_else(|| {
                tracing::warn!(declared, max = self.max_body_size, "Content-Length over limit");
                ParseError::bad_request("Content-Length exceeds maximum body size")
            })?;

        let mut body = vec![0u8; length];
        match reader.read_exact(&mut body).await {
            Ok(_) => {
                tracing::trace!(bytes = length, "Request body read");
                Ok(Some(body))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::warn!(expected = length, "Incomplete body read");
                Err(ParseError::bad_request("Incomplete body read"))
            }
            Err(e) => Err(ParseError::Io(e)),
        }
    }
}

/// Read header lines up to the blank separator (or end of stream).
async fn read_headers<R>(reader: &mut R, head: &mut HeadBudget) -> Result<Headers, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Headers::new();
    while let Some(line) = head.read_line(reader).await? {
        if line.is_empty() {
            break;
        }
        match line.split_once(": ") {
            Some((name, value)) => headers.insert(name.trim(), value.trim()),
            None => tracing::warn!(header = %line, "Malformed header"),
        }
    }
    Ok(headers)
}

/// Bytes the request head may still use.
struct HeadBudget {
    line_limit: usize,
    remaining: usize,
}

impl HeadBudget {
    /// Read one line without its terminator. `None` at end of stream.
    ///
    /// Never buffers more than the per-line limit or what is left of the
    /// head budget, whichever is smaller.
    async fn read_line<R>(&mut self, reader: &mut R) -> Result<Option<String>, ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = self.line_limit.min(self.remaining);
        let mut buf = Vec::new();
        let read = (&mut *reader)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }
        if read > limit {
            tracing::warn!(limit, "Request header too large");
            return Err(ParseError::bad_request("Request header too large"));
        }
        self.remaining -= read;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::StatusCode;

    fn parser() -> RequestParser {
        RequestParser::new(&LimitsConfig::default())
    }

    async fn parse(raw: &str) -> Result<Option<Request>, ParseError> {
        let mut reader = raw.as_bytes();
        parser().parse(&mut reader).await
    }

    #[tokio::test]
    async fn parses_request_without_body() {
        let request = parse("GET /index.html HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.uri(), "/index.html");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.header("Host"), Some("localhost"));
        assert_eq!(request.headers().len(), 2);
        assert_eq!(request.body(), None);
    }

    #[tokio::test]
    async fn reads_exactly_content_length_bytes() {
        let request = parse("PUT /a.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello world")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.body(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn body_is_bytes_not_characters() {
        let raw = "POST /u HTTP/1.1\r\nContent-Length: 2\r\n\r\né";
        let request = parse(raw).await.unwrap().unwrap();
        assert_eq!(request.body(), Some("é".as_bytes()));
    }

    #[tokio::test]
    async fn blank_or_absent_request_line_is_silent() {
        assert!(parse("").await.unwrap().is_none());
        assert!(parse("\r\n").await.unwrap().is_none());
        assert!(parse("   \r\nHost: x\r\n\r\n").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_token_count_is_bad_request() {
        for line in ["GET /\r\n\r\n", "GET / HTTP/1.1 extra\r\n\r\n", "GET  / HTTP/1.1\r\n\r\n"] {
            let err = parse(line).await.unwrap_err();
            assert!(matches!(err, ParseError::BadRequest(_)), "{line:?}");
            assert_eq!(err.into_response().status(), StatusCode::BadRequest);
        }
    }

    #[tokio::test]
    async fn malformed_header_is_skipped() {
        let request = parse("GET / HTTP/1.1\r\nnot-a-header\r\nHost: h\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("Host"), Some("h"));
    }

    #[tokio::test]
    async fn duplicate_header_last_wins() {
        let request = parse("GET / HTTP/1.1\r\nX-A: 1\r\nX-A: 2\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.header("X-A"), Some("2"));
    }

    #[tokio::test]
    async fn invalid_content_length_is_bad_request() {
        let err = parse("POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid Content-Length header");
    }

    #[tokio::test]
    async fn zero_or_negative_length_means_no_body() {
        for len in ["0", "-3"] {
            let raw = format!("POST / HTTP/1.1\r\nContent-Length: {len}\r\n\r\nignored");
            let request = parse(&raw).await.unwrap().unwrap();
            assert_eq!(request.body(), None);
        }
    }

    #[tokio::test]
    async fn short_body_is_bad_request() {
        let err = parse("PUT /a HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Incomplete body read");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_reading() {
        let parser = RequestParser::new(&LimitsConfig {
            max_body_size: 4,
            ..LimitsConfig::default()
        });
        let mut reader = &b"PUT /a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..];
        let err = parser.parse(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "Content-Length exceeds maximum body size");
    }

    fn small_head_parser() -> RequestParser {
        RequestParser::new(&LimitsConfig {
            max_body_size: 16,
            max_header_line: 64,
            max_header_size: 256,
        })
    }

    #[tokio::test]
    async fn oversized_request_line_is_rejected() {
        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(1024 * 1024));
        let mut reader = raw.as_bytes();
        let err = small_head_parser().parse(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "Request header too large");
        assert_eq!(err.into_response().status(), StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn oversized_header_line_is_rejected() {
        let raw = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "b".repeat(1024 * 1024));
        let mut reader = raw.as_bytes();
        let err = small_head_parser().parse(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "Request header too large");
    }

    #[tokio::test]
    async fn unterminated_head_is_rejected() {
        let raw = "c".repeat(1024);
        let mut reader = raw.as_bytes();
        let err = small_head_parser().parse(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "Request header too large");
    }

    #[tokio::test]
    async fn too_many_header_lines_are_rejected() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        for i in 0..64 {
            raw.push_str(&format!("X-H{i}: v\r\n"));
        }
        raw.push_str("\r\n");
        let mut reader = raw.as_bytes();
        let err = small_head_parser().parse(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "Request header too large");
    }

    #[tokio::test]
    async fn head_at_the_limits_is_accepted() {
        // 62 bytes + CRLF = 64, the exact per-line limit.
        let raw = format!("GET / HTTP/1.1\r\nX-Fit: {}\r\n\r\n", "d".repeat(55));
        let mut reader = raw.as_bytes();
        let request = small_head_parser().parse(&mut reader).await.unwrap().unwrap();
        assert_eq!(request.header("X-Fit").map(str::len), Some(55));
    }

    #[tokio::test]
    async fn content_length_case_variants_use_last_received() {
        let raw = "PUT /a HTTP/1.1\r\nContent-Length: 5\r\ncontent-length: 3\r\nContent-Length: 7\r\n\r\nabcdefgh";
        let request = parse(raw).await.unwrap().unwrap();
        assert_eq!(request.body(), Some(&b"abcdefg"[..]));
    }

    #[tokio::test]
    async fn accepts_bare_newlines() {
        let request = parse("DELETE /x HTTP/1.0\nHost: h\n\n").await.unwrap().unwrap();
        assert_eq!(request.method(), &Method::Delete);
        assert_eq!(request.version(), "HTTP/1.0");
    }

    #[test]
    fn io_failure_maps_to_server_error() {
        let err = ParseError::from(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(err.into_response().status(), StatusCode::InternalServerError);
    }
}
