//! `multipart/form-data` decoding.
//!
//! # Data Flow
//! ```text
//! buffered body + boundary
//!     → decoder.rs (split on "--<boundary>", headers / content per part)
//!     → Content-Disposition name / filename
//!     → filename present: upload.rs (deduplicated save into the upload dir)
//!     → otherwise: form field (last occurrence of a name wins)
//!     → MultipartForm { files, fields }
//! ```
//!
//! # Design Decisions
//! - The whole body is already in memory; no streaming parser
//! - Parsing is byte-oriented, so binary uploads round-trip unless their
//!   content contains the delimiter line itself

pub mod decoder;
pub mod upload;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

pub use decoder::{split_parts, Disposition, Part};
pub use upload::{save_upload, UploadedFile};

use crate::observability::metrics;

/// Failure while decoding a multipart body.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not prepare upload directory {path}: {source}")]
    UploadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not save upload {filename:?}: {source}")]
    Save {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of decoding one multipart request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultipartForm {
    /// One entry per part that carried a filename.
    pub files: Vec<UploadedFile>,
    /// Plain form fields by name.
    #[serde(rename = "formData")]
    pub fields: BTreeMap<String, String>,
}

impl MultipartForm {
    /// Decode `body` and save every file part into `upload_dir`.
    pub async fn decode(body: &[u8], boundary: &str, upload_dir: &Path) -> Result<Self, UploadError> {
        if !tokio::fs::try_exists(upload_dir).await.unwrap_or(false) {
            tokio::fs::create_dir_all(upload_dir)
                .await
                .map_err(|source| UploadError::UploadDir {
                    path: upload_dir.display().to_string(),
                    source,
                })?;
        }

        let mut form = MultipartForm::default();
        for part in split_parts(body, boundary) {
            let Some(disposition) = part.disposition() else {
                tracing::debug!("Multipart part without Content-Disposition skipped");
                continue;
            };

            match (disposition.filename, disposition.name) {
                (Some(filename), _) => {
                    let saved = save_upload(upload_dir, &filename, part.trimmed_content())
                        .await
                        .map_err(|source| UploadError::Save {
                            filename: filename.clone(),
                            source,
                        })?;
                    metrics::record_upload();
                    form.files.push(saved);
                }
                (None, Some(name)) if !name.trim().is_empty() => {
                    let value = String::from_utf8_lossy(part.trimmed_content()).into_owned();
                    tracing::info!(field = %name, value = %value, "Processed form field");
                    form.fields.insert(name, value);
                }
                (None, _) => tracing::debug!("Multipart part without a name skipped"),
            }
        }

        Ok(form)
    }
}

/// Boundary parameter of a `multipart/form-data` Content-Type, unquoted.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let at = content_type.find("boundary=")?;
    let raw = content_type[at + "boundary=".len()..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    let boundary = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);

    (!boundary.is_empty()).then(|| boundary.to_string())
}
