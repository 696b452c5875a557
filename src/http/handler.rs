//! Request dispatch: turns a parse result into exactly one response.
//!
//! Every failure mode (malformed request, unsupported method or version,
//! missing file, file vanishing mid-request, bad `If-Modified-Since`) is
//! recovered here by substituting the matching error response.

use std::time::{Duration, SystemTime};

use crate::docroot::{DocumentRoot, Resolution, Resource, ResourceError};
use crate::http::conditional::{self, Freshness};
use crate::http::parser::ParseError;
use crate::http::request::{ConnectionDirective, Method, Request, Version};
use crate::http::response::{ConnectionHeader, Response, StatusCode};

/// A response plus what the session needs to know about it.
#[derive(Debug)]
pub struct Handled {
    pub response: Response,
    /// URL path of the static file served, for the access log
    pub served: Option<String>,
    /// The session must close after writing this response
    pub close: bool,
}

#[derive(Debug, Clone)]
pub struct Handler {
    docroot: DocumentRoot,
    keep_alive_timeout: Duration,
}

impl Handler {
    pub fn new(docroot: DocumentRoot, keep_alive_timeout: Duration) -> Self {
        Self {
            docroot,
            keep_alive_timeout,
        }
    }

    /// Produces the response for one parsed (or unparseable) request.
    ///
    /// `now` becomes the `Date` header.
    pub async fn handle(&self, parsed: Result<Request, ParseError>, now: SystemTime) -> Handled {
        let request = match parsed {
            Ok(req) => req,
            Err(ParseError::Malformed) => {
                tracing::debug!("Malformed request");
                return self.error(StatusCode::BadRequest, true, now).await;
            }
        };

        if request.version == Version::Unknown || !request.method.is_supported() {
            tracing::debug!(
                method = request.method.as_str(),
                version = ?request.version,
                "Unsupported method or version"
            );
            return self
                .error(StatusCode::BadRequest, request.method != Method::HEAD, now)
                .await;
        }

        let with_body = request.method == Method::GET;

        if !request.target.starts_with('/') {
            return self.error(StatusCode::BadRequest, with_body, now).await;
        }

        let resource = match self.docroot.resolve(&request.target).await {
            Resolution::Found(resource) => resource,
            Resolution::NotFound => return self.error(StatusCode::NotFound, with_body, now).await,
        };

        self.respond(resource, &request, now).await
    }

    /// Answers a supported request for a resource that has already been
    /// resolved. The file is read only here, so it may have vanished since
    /// `resolve`; that case becomes a 404.
    pub async fn respond(&self, resource: Resource, request: &Request, now: SystemTime) -> Handled {
        let with_body = request.method == Method::GET;

        let freshness = match conditional::evaluate(resource.modified, &request.headers) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting conditional request");
                return self.error(StatusCode::BadRequest, with_body, now).await;
            }
        };

        let connection = self.connection_header(request);

        let response = match freshness {
            Freshness::NotModified => Response::not_modified(&resource, connection, now),
            Freshness::Modified if with_body => match self.read_body(&resource).await {
                Some(body) => {
                    let resource = Resource {
                        size: body.len() as u64,
                        ..resource.clone()
                    };
                    Response::ok(&resource, Some(body), connection, now)
                }
                None => return self.error(StatusCode::NotFound, with_body, now).await,
            },
            Freshness::Modified => Response::ok(&resource, None, connection, now),
        };

        Handled {
            response,
            served: Some(resource.url_path),
            close: !request.keep_alive(),
        }
    }

    async fn read_body(&self, resource: &Resource) -> Option<Vec<u8>> {
        match self.docroot.read(resource).await {
            Ok(body) => Some(body),
            Err(ResourceError::Vanished) => {
                tracing::debug!(path = %resource.url_path, "Resource vanished before read");
                None
            }
            Err(e) => {
                tracing::warn!(path = %resource.url_path, error = %e, "Failed to read resource");
                None
            }
        }
    }

    fn connection_header(&self, request: &Request) -> ConnectionHeader {
        match request.connection() {
            ConnectionDirective::KeepAlive => ConnectionHeader::KeepAlive {
                timeout: self.keep_alive_timeout,
            },
            _ => ConnectionHeader::Close,
        }
    }

    async fn error(&self, status: StatusCode, include_body: bool, now: SystemTime) -> Handled {
        let document = self.docroot.error_document(status).await;
        Handled {
            response: Response::error(status, document, include_body, now),
            served: None,
            close: true,
        }
    }
}
