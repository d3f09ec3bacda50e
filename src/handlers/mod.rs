//! Filesystem-backed request handlers.
//!
//! # Data Flow
//! ```text
//! Request (from dispatcher)
//!     → resolve(web_root, uri)       literal concatenation, no canonicalization
//!     → get.rs / post.rs / put.rs / delete.rs
//!     → Response, or HandlerError mapped to 403/500 by the dispatcher
//! ```
//!
//! # Design Decisions
//! - Paths are not sanitized against `..`; the web root is not a sandbox
//! - No per-path locking: concurrent writers to one path race, last writer wins

pub mod delete;
pub mod get;
pub mod post;
pub mod put;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{File, OpenOptions};

use crate::http::response::Response;

/// Attempts made by [`create_unique_file`] before giving up.
const MAX_UNIQUE_ATTEMPTS: usize = 100;

/// Failure while applying a request to the filesystem.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HandlerError {
    /// Permission problems become 403, anything else 500.
    pub fn into_response(self) -> Response {
        match self {
            HandlerError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Response::forbidden("Access denied")
            }
            HandlerError::Io(_) => Response::server_error("Error handling request"),
        }
    }
}

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    web_root: PathBuf,
}

impl HandlerContext {
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    /// Map a request URI onto the filesystem.
    pub fn resolve(&self, uri: &str) -> PathBuf {
        resolve(&self.web_root, uri)
    }
}

/// Append `uri` to `web_root` as plain text.
pub fn resolve(web_root: &Path, uri: &str) -> PathBuf {
    let root = web_root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if uri.starts_with('/') {
        PathBuf::from(format!("{}{}", root, uri))
    } else {
        PathBuf::from(format!("{}/{}", root, uri))
    }
}

/// Create `<stem>.<ext>`, `<stem>1.<ext>`, … in `dir`, returning the first
/// name that did not exist yet. Creation is atomic (create-new), so two
/// concurrent callers never get the same file.
pub async fn create_unique_file(dir: &Path, stem: &str, ext: &str) -> io::Result<(PathBuf, File)> {
    for count in 0..=MAX_UNIQUE_ATTEMPTS {
        let name = if count == 0 {
            format!("{}.{}", stem, ext)
        } else {
            format!("{}{}.{}", stem, count, ext)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    tracing::error!(stem, ext, "Too many duplicate files");
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {}.{}", stem, ext),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::StatusCode;

    #[test]
    fn resolve_concatenates_literally() {
        assert_eq!(resolve(Path::new("./"), "/index.html"), PathBuf::from("./index.html"));
        assert_eq!(resolve(Path::new("/srv/www"), "/a/b.txt"), PathBuf::from("/srv/www/a/b.txt"));
        assert_eq!(resolve(Path::new("/srv/www"), "/../x"), PathBuf::from("/srv/www/../x"));
    }

    #[tokio::test]
    async fn unique_files_count_up() {
        let dir = tempfile::tempdir().unwrap();
        let (first, _) = create_unique_file(dir.path(), "file", "txt").await.unwrap();
        let (second, _) = create_unique_file(dir.path(), "file", "txt").await.unwrap();
        let (third, _) = create_unique_file(dir.path(), "file", "txt").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "file.txt");
        assert_eq!(second.file_name().unwrap(), "file1.txt");
        assert_eq!(third.file_name().unwrap(), "file2.txt");
    }

    #[test]
    fn permission_errors_are_forbidden() {
        let denied = HandlerError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.into_response().status(), StatusCode::Forbidden);

        let other = HandlerError::from(io::Error::from(io::ErrorKind::Other));
        assert_eq!(other.into_response().status(), StatusCode::InternalServerError);
    }
}
