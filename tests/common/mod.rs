#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const INDEX_HTML: &[u8] = b"<html><body>index</body></html>";
pub const NOT_FOUND_HTML: &[u8] = b"<html><body>404 here</body></html>";
pub const BAD_REQUEST_HTML: &[u8] = b"<html><body>400 here</body></html>";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh directory under the system temp dir, unique per call.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut p = std::env::temp_dir();
    p.push(format!("htserve-{}-{}-{}", tag, std::process::id(), n));
    let _ = std::fs::remove_dir_all(&p);
    std::fs::create_dir_all(&p).unwrap();
    p
}

/// A document root holding index.html, 400.html, 404.html and logo.png.
pub fn docroot(tag: &str) -> PathBuf {
    let root = scratch_dir(tag);
    write(&root, "index.html", INDEX_HTML);
    write(&root, "404.html", NOT_FOUND_HTML);
    write(&root, "400.html", BAD_REQUEST_HTML);
    write(&root, "logo.png", PNG_BYTES);
    root
}

pub fn write(root: &Path, name: &str, bytes: &[u8]) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}
