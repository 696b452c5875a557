use crate::http::request::{Method, Request, Version};
use std::collections::HashMap;

const CRLF: &str = "\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No line terminator, fewer than three request-line tokens, or bytes
    /// that are not UTF-8. Always answered with a 400.
    Malformed,
}

/// Parses one request head (request line plus header lines, normally ending
/// with the blank line).
///
/// A request line with more than three tokens, or with a version other than
/// `HTTP/1.0`/`HTTP/1.1`, still parses; its version is `Unknown`.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    let text = std::str::from_utf8(buf).map_err(|_| ParseError::Malformed)?;
    let text = text.trim_start_matches(CRLF);

    let (request_line, rest) = text.split_once(CRLF).ok_or(ParseError::Malformed)?;

    let tokens: Vec<&str> = request_line.split(' ').collect();
    if tokens.len() < 3 {
        return Err(ParseError::Malformed);
    }

    let version = if tokens.len() == 3 {
        Version::from_token(tokens[2])
    } else {
        Version::Unknown
    };

    let mut headers = HashMap::new();

    for line in rest.split(CRLF) {
        if line.is_empty() {
            break;
        }

        // Lines without the ": " separator carry nothing usable.
        if let Some((key, value)) = line.split_once(": ") {
            headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    Ok(Request {
        method: Method::from_token(tokens[0]),
        target: tokens[1].to_string(),
        version,
        headers,
    })
}

/// Position of the `\r\n\r\n` that ends a request head, if buffered yet.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
