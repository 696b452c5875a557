use std::collections::HashMap;

/// HTTP request methods.
///
/// Only GET and HEAD are served. Anything else is kept as `OTHER` so the
/// session can still answer it with a 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// Any other method token, upper-cased
    OTHER(String),
}

/// Protocol version taken from the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
    /// Missing, malformed or unsupported version token
    Unknown,
}

/// What the client asked for in its `Connection` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirective {
    /// `Connection: keep-alive`
    KeepAlive,
    /// `Connection: close`
    Close,
    /// Header absent or carrying any other value
    Unspecified,
}

/// Represents a parsed HTTP request from a client.
///
/// Header names are stored lowercased. No request body is ever consumed.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// The request target as sent (e.g., "/index.html")
    pub target: String,
    /// HTTP version
    pub version: Version,
    /// Request headers, keyed by lowercased field name
    pub headers: HashMap<String, String>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Version,
    headers: HashMap<String, String>,
}

impl Method {
    /// Classifies a method token. Comparison is done on the upper-cased token.
    ///
    /// # Example
    ///
    /// ```
    /// # use htserve::http::request::Method;
    /// assert_eq!(Method::from_token("get"), Method::GET);
    /// assert_eq!(Method::from_token("POST"), Method::OTHER("POST".into()));
    /// ```
    pub fn from_token(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            _ => Method::OTHER(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::OTHER(s) => s.as_str(),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Method::GET | Method::HEAD)
    }
}

impl Version {
    /// Only the exact tokens `HTTP/1.1` and `HTTP/1.0` are recognised.
    pub fn from_token(s: &str) -> Self {
        match s {
            "HTTP/1.1" => Version::Http11,
            "HTTP/1.0" => Version::Http10,
            _ => Version::Unknown,
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: Version::Http11,
            headers: HashMap::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Adds a header. The name is lowercased; a repeated name replaces the earlier value.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            target: self.target.ok_or("target missing")?,
            version: self.version,
            headers: self.headers,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by name, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Reads the `Connection` header.
    pub fn connection(&self) -> ConnectionDirective {
        match self.header("connection") {
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => ConnectionDirective::KeepAlive,
            Some(v) if v.eq_ignore_ascii_case("close") => ConnectionDirective::Close,
            _ => ConnectionDirective::Unspecified,
        }
    }

    /// Determines whether the session may read another request after this one.
    ///
    /// Only an explicit `Connection: close` ends the session; an absent header
    /// leaves it open.
    pub fn keep_alive(&self) -> bool {
        self.connection() != ConnectionDirective::Close
    }
}
