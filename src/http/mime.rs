//! Content category detection from a path suffix.

/// The kinds of static file the server knows how to label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Html,
    Jpeg,
    Png,
    Unknown,
}

/// Ordered suffix table; the first match wins.
const SUFFIXES: &[(&str, ContentCategory)] = &[
    (".html", ContentCategory::Html),
    (".jpg", ContentCategory::Jpeg),
    (".png", ContentCategory::Png),
];

/// Classifies a path by its suffix, ignoring ASCII case.
///
/// # Example
///
/// ```
/// # use htserve::http::mime::{classify, ContentCategory};
/// assert_eq!(classify("/index.html"), ContentCategory::Html);
/// assert_eq!(classify("/a.html.bak"), ContentCategory::Unknown);
/// ```
pub fn classify(path: &str) -> ContentCategory {
    let lower = path.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|(_, category)| *category)
        .unwrap_or(ContentCategory::Unknown)
}

impl ContentCategory {
    /// Value for the `Content-Type` header.
    ///
    /// `Unknown` falls back to HTML. Routing never serves an unknown suffix,
    /// so the fallback only matters to callers building responses by hand.
    pub fn content_type(self) -> &'static str {
        match self {
            ContentCategory::Html => HTML_CONTENT_TYPE,
            ContentCategory::Jpeg => "image/jpeg",
            ContentCategory::Png => "image/png",
            ContentCategory::Unknown => HTML_CONTENT_TYPE,
        }
    }
}

pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";
