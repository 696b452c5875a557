use std::path::PathBuf;
use std::time::SystemTime;

use crate::http::mime::ContentCategory;

/// A static file under the document root, as seen at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// URL path it was served as (e.g., "/index.html")
    pub url_path: String,
    /// Location on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification, truncated to whole seconds
    pub modified: SystemTime,
    pub category: ContentCategory,
}

/// Outcome of looking a target up under the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Resource),
    NotFound,
}

/// Reading a resolved resource failed.
#[derive(Debug)]
pub enum ResourceError {
    /// The file existed at resolution time but is gone now
    Vanished,
    /// Any other I/O failure
    Unreadable(std::io::Error),
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::Vanished => write!(f, "resource vanished before it could be read"),
            ResourceError::Unreadable(e) => write!(f, "resource unreadable: {}", e),
        }
    }
}

impl std::error::Error for ResourceError {}
