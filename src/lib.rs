//! htserve - static HTTP/1.1 origin server
//!
//! Serves HTML, JPEG and PNG files from a document root with GET/HEAD,
//! `If-Modified-Since` revalidation and keep-alive sessions.

pub mod access_log;
pub mod config;
pub mod docroot;
pub mod http;
pub mod server;
