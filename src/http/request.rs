//! Minimal HTTP/1.1 request parsing.
//!
//! # Responsibilities
//! - Read one request (request line, headers, body) from a connection
//! - Enforce size limits on the header section and body
//! - Reject malformed input with a typed error
//!
//! This is a development server: one request per connection, no chunked
//! transfer encoding, no continuation lines.

use std::io::{self, BufRead, Read};
use std::net::SocketAddr;

use thiserror::Error;

/// Upper bound on the request line plus all header lines.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Upper bound on a request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A parsed HTTP request.
#[derive(Debug)]
pub struct Request {
    method: String,
    target: String,
    version: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    peer: SocketAddr,
}

impl Request {
    /// Request method (GET, POST, ...).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw request target as sent by the client.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    /// Query string, when present.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    /// Protocol version from the request line.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request body, empty unless a Content-Length was sent.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Peer address of the connection this request arrived on.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

/// Errors from reading a request off a connection.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Peer closed the connection before sending a complete request.
    #[error("connection closed before a complete request")]
    UnexpectedEof,

    /// The request line was not `METHOD TARGET VERSION`.
    #[error("malformed request line {0:?}")]
    BadRequestLine(String),

    /// A header line had no colon.
    #[error("malformed header line {0:?}")]
    BadHeader(String),

    /// Content-Length was present but not a number.
    #[error("invalid Content-Length {0:?}")]
    BadContentLength(String),

    /// Header section exceeded [`MAX_HEADER_BYTES`].
    #[error("header section too large")]
    HeadersTooLarge,

    /// Declared body length exceeded [`MAX_BODY_BYTES`].
    #[error("request body of {0} bytes is too large")]
    BodyTooLarge(usize),

    /// The connection failed mid-read.
    #[error("request read failed: {0}")]
    Io(#[from] io::Error),
}

/// Read and parse one request from `reader`.
pub fn read_request<R: BufRead>(reader: &mut R, peer: SocketAddr) -> Result<Request, ParseError> {
    let mut budget = MAX_HEADER_BYTES;

    let request_line = read_line(reader, &mut budget)?;
    let line = match request_line {
        Some(line) if !line.is_empty() => line,
        _ => return Err(ParseError::UnexpectedEof),
    };

    let mut parts = line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) if v.starts_with("HTTP/") => {
            (m.to_string(), t.to_string(), v.to_string())
        }
        _ => return Err(ParseError::BadRequestLine(line)),
    };

    let mut headers = Vec::new();
    loop {
        let header_line = match read_line(reader, &mut budget)? {
            Some(line) => line,
            None => return Err(ParseError::UnexpectedEof),
        };
        if header_line.is_empty() {
            break;
        }
        match header_line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
            _ => return Err(ParseError::BadHeader(header_line)),
        }
    }

    let body = match headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
    {
        Some((_, value)) => {
            let length: usize = value
                .parse()
                .map_err(|_| ParseError::BadContentLength(value.clone()))?;
            if length > MAX_BODY_BYTES {
                return Err(ParseError::BodyTooLarge(length));
            }
            let mut body = vec![0u8; length];
            reader.read_exact(&mut body).map_err(|err| {
                if err.kind() == io::ErrorKind::UnexpectedEof {
                    ParseError::UnexpectedEof
                } else {
                    ParseError::Io(err)
                }
            })?;
            body
        }
        None => Vec::new(),
    };

    Ok(Request {
        method,
        target,
        version,
        headers,
        body,
        peer,
    })
}

/// Read one CRLF- (or LF-) terminated line, charging `budget`.
/// `None` means clean EOF before any byte of the line.
fn read_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Option<String>, ParseError> {
    if *budget == 0 {
        return Err(ParseError::HeadersTooLarge);
    }
    let mut raw = Vec::new();
    let read = reader.take(*budget as u64).read_until(b'\n', &mut raw)?;
    if read == 0 {
        return Ok(None);
    }
    if !raw.ends_with(b"\n") {
        if read < *budget {
            // Stream ended mid-line.
            return Err(ParseError::UnexpectedEof);
        }
        // Line did not fit in the remaining budget.
        return Err(ParseError::HeadersTooLarge);
    }
    *budget -= read;

    while raw.last() == Some(&b'\n') || raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn parse(input: &[u8]) -> Result<Request, ParseError> {
        read_request(&mut BufReader::new(input), peer())
    }

    #[test]
    fn parses_get_with_headers() {
        let request = parse(
            b"GET /status?verbose=1 HTTP/1.1\r\nHost: localhost:8000\r\nAccept: */*\r\n\r\n",
        )
        .unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/status");
        assert_eq!(request.query(), Some("verbose=1"));
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.header("host"), Some("localhost:8000"));
        assert_eq!(request.header("HOST"), Some("localhost:8000"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn parses_body_by_content_length() {
        let request =
            parse(b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(request.body(), b"hello");
    }

    #[test]
    fn bare_lf_lines_are_accepted() {
        let request = parse(b"GET / HTTP/1.0\nHost: x\n\n").unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.header("host"), Some("x"));
    }

    #[test]
    fn empty_input_is_eof() {
        assert!(matches!(parse(b""), Err(ParseError::UnexpectedEof)));
    }

    #[test]
    fn truncated_body_is_eof() {
        let result = parse(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort");
        assert!(matches!(result, Err(ParseError::UnexpectedEof)));
    }

    #[test]
    fn rejects_malformed_request_line() {
        assert!(matches!(
            parse(b"GET /\r\n\r\n"),
            Err(ParseError::BadRequestLine(_))
        ));
        assert!(matches!(
            parse(b"GET / NOT-HTTP\r\n\r\n"),
            Err(ParseError::BadRequestLine(_))
        ));
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(matches!(
            parse(b"GET / HTTP/1.1\r\nno-colon-here\r\n\r\n"),
            Err(ParseError::BadHeader(_))
        ));
    }

    #[test]
    fn rejects_bad_content_length() {
        assert!(matches!(
            parse(b"POST / HTTP/1.1\r\nContent-Length: many\r\n\r\n"),
            Err(ParseError::BadContentLength(_))
        ));
    }

    #[test]
    fn rejects_oversized_declared_body() {
        let input = format!(
            "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_BYTES + 1
        );
        assert!(matches!(
            parse(input.as_bytes()),
            Err(ParseError::BodyTooLarge(_))
        ));
    }

    #[test]
    fn rejects_oversized_header_section() {
        let mut input = b"GET / HTTP/1.1\r\n".to_vec();
        input.extend(std::iter::repeat(b'a').take(MAX_HEADER_BYTES));
        assert!(matches!(
            parse(&input),
            Err(ParseError::HeadersTooLarge)
        ));
    }
}
