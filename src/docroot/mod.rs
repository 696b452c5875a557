//! Filesystem boundary for static content.
//!
//! The server only ever reads from the document root: existence, size,
//! modification time and raw bytes. Resolution returns an explicit
//! [`Resolution`] so the caller picks the 200/304 or 404 branch itself.

pub mod resource;

pub use resource::{Resolution, Resource, ResourceError};

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs;

use crate::http::conditional::truncate_to_seconds;
use crate::http::mime::{self, ContentCategory};
use crate::http::response::StatusCode;

/// Target that `/` is served as.
pub const INDEX_PATH: &str = "/index.html";

/// A read-only directory of servable files plus the 400/404 documents.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: PathBuf,
}

impl DocumentRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a request target to the URL path that would be served.
    ///
    /// Returns `None` when the target can never name a servable file:
    /// unknown suffix, a `..` segment, or no leading `/`.
    ///
    /// # Example
    ///
    /// ```
    /// # use htserve::docroot::DocumentRoot;
    /// assert_eq!(DocumentRoot::route("/"), Some("/index.html".to_string()));
    /// assert_eq!(DocumentRoot::route("/a.png?v=2"), Some("/a.png".to_string()));
    /// assert_eq!(DocumentRoot::route("/notes.txt"), None);
    /// ```
    pub fn route(target: &str) -> Option<String> {
        let path = target
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        if !path.starts_with('/') {
            return None;
        }

        let path = if path == "/" { INDEX_PATH } else { path };

        if path.split('/').any(|segment| segment == "..") {
            return None;
        }

        match mime::classify(path) {
            ContentCategory::Unknown => None,
            _ => Some(path.to_string()),
        }
    }

    /// Looks the target up under the root and reads its metadata.
    pub async fn resolve(&self, target: &str) -> Resolution {
        let Some(url_path) = Self::route(target) else {
            return Resolution::NotFound;
        };

        let path = self.root.join(url_path.trim_start_matches('/'));

        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Resolution::NotFound,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat resource");
                }
                return Resolution::NotFound;
            }
        };

        let modified = match metadata.modified() {
            Ok(t) => truncate_to_seconds(t),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "No modification time for resource");
                return Resolution::NotFound;
            }
        };

        let category = mime::classify(&url_path);

        Resolution::Found(Resource {
            url_path,
            path,
            size: metadata.len(),
            modified,
            category,
        })
    }

    /// Reads the raw bytes of a resolved resource.
    pub async fn read(&self, resource: &Resource) -> Result<Vec<u8>, ResourceError> {
        fs::read(&resource.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ResourceError::Vanished,
            _ => ResourceError::Unreadable(e),
        })
    }

    /// Loads `400.html` or `404.html` from the root.
    ///
    /// Falls back to a short built-in body when the document is missing.
    /// Any other status gets an empty document.
    pub async fn error_document(&self, status: StatusCode) -> Vec<u8> {
        let (file, fallback) = match status {
            StatusCode::BadRequest => ("400.html", "400 Bad Request"),
            StatusCode::NotFound => ("404.html", "404 Not Found"),
            _ => return Vec::new(),
        };

        match fs::read(self.root.join(file)).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    document = file,
                    error = %e,
                    "Error document unavailable, using built-in body"
                );
                fallback.as_bytes().to_vec()
            }
        }
    }
}
