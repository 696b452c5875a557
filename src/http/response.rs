use std::time::{Duration, SystemTime};

use crate::docroot::Resource;
use crate::http::mime::HTML_CONTENT_TYPE;

/// HTTP status codes the server can answer with.
///
/// - `Ok` (200): Full representation follows
/// - `NotModified` (304): Client's cached copy is still valid
/// - `BadRequest` (400): Malformed or unsupported request
/// - `NotFound` (404): Target resolves to no file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 304 Not Modified
    NotModified,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use htserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotModified.as_u16(), 304);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotModified => 304,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }

    /// Error responses always end the session.
    pub fn closes_connection(&self) -> bool {
        matches!(self, StatusCode::BadRequest | StatusCode::NotFound)
    }
}

/// The `Connection` header the server sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHeader {
    /// `Connection: keep-alive` plus a `Timeout` hint
    KeepAlive { timeout: Duration },
    /// `Connection: close`
    Close,
}

/// Represents a complete HTTP response ready to be sent to a client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Headers in the order they go on the wire
    pub headers: Vec<(String, String)>,
    /// Response body; `None` for 304 and for HEAD
    pub body: Option<Vec<u8>>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// Headers are emitted in insertion order.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html;charset=UTF-8")
///     .maybe_body(Some(b"<html></html>".to_vec()))
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a header. An existing header of the same name is replaced in place.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Adds `Connection`, and `Timeout` when keeping the connection alive.
    pub fn connection(self, connection: ConnectionHeader) -> Self {
        match connection {
            ConnectionHeader::KeepAlive { timeout } => self
                .header("Connection", "keep-alive")
                .header("Timeout", format!("timeout={}", timeout.as_secs())),
            ConnectionHeader::Close => self.header("Connection", "close"),
        }
    }

    /// Adds `Date`. Call last; it is the final header on the wire.
    pub fn date(self, now: SystemTime) -> Self {
        self.header("Date", httpdate::fmt_http_date(now))
    }

    /// Sets the body only when `body` is `Some`.
    pub fn maybe_body(mut self, body: Option<Vec<u8>>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// 200 for a static resource. `body` is `None` for HEAD.
    ///
    /// Content-Length always reflects the resource size, with or without a body.
    pub fn ok(
        resource: &Resource,
        body: Option<Vec<u8>>,
        connection: ConnectionHeader,
        now: SystemTime,
    ) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Last-Modified", httpdate::fmt_http_date(resource.modified))
            .header("Cache-Control", CACHE_CONTROL)
            .connection(connection)
            .header("Content-Length", resource.size.to_string())
            .header("Accept-Ranges", "bytes")
            .header("Content-Type", resource.category.content_type())
            .date(now)
            .maybe_body(body)
            .build()
    }

    /// 304 for a resource the client already holds.
    pub fn not_modified(resource: &Resource, connection: ConnectionHeader, now: SystemTime) -> Self {
        ResponseBuilder::new(StatusCode::NotModified)
            .header("Last-Modified", httpdate::fmt_http_date(resource.modified))
            .header("Cache-Control", CACHE_CONTROL)
            .connection(connection)
            .date(now)
            .build()
    }

    /// 400 or 404 carrying an error document. Always `Connection: close`.
    pub fn error(
        status: StatusCode,
        document: Vec<u8>,
        include_body: bool,
        now: SystemTime,
    ) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", HTML_CONTENT_TYPE)
            .header("Content-Length", document.len().to_string())
            .connection(ConnectionHeader::Close)
            .date(now)
            .maybe_body(include_body.then_some(document))
            .build()
    }

    /// Looks up a header value, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn keeps_alive(&self) -> bool {
        self.header("Connection") == Some("keep-alive")
    }
}

const CACHE_CONTROL: &str = "max-age=3600";
