//! Saving uploaded file parts without clobbering existing files.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Name used when the client-supplied filename has no usable final component.
const FALLBACK_NAME: &str = "upload";

/// Description of one saved upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Filename as sent by the client. Untrusted.
    pub original_name: String,
    /// Name the file was stored under.
    pub saved_name: String,
    /// Absolute path of the stored file.
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
}

/// Final path component of a client filename, accepting `/` and `\` separators.
pub fn base_name(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match name {
        "" | "." | ".." => FALLBACK_NAME,
        name => name,
    }
}

/// `a.txt` → `a_1.txt`, `README` → `README_1`. Attempt 0 is the name itself.
pub fn candidate_name(base: &str, attempt: usize) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    match base.rfind('.') {
        Some(dot) => format!("{}_{}{}", &base[..dot], attempt, &base[dot..]),
        None => format!("{}_{}", base, attempt),
    }
}

/// Store `content` in `dir` under the first free candidate name.
///
/// Each candidate is opened with create-new semantics, so neither an existing
/// file nor a concurrent upload with the same name is ever overwritten.
pub async fn save_upload(dir: &Path, filename: &str, content: &[u8]) -> io::Result<UploadedFile> {
    let base = base_name(filename);

    let mut attempt = 0;
    let (path, mut file) = loop {
        let path = dir.join(candidate_name(base, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    };

    file.write_all(content).await?;
    file.flush().await?;

    let saved_name = candidate_name(base, attempt);
    let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
    tracing::info!(path = %path.display(), bytes = content.len(), "File saved successfully");

    Ok(UploadedFile {
        original_name: filename.to_string(),
        saved_name,
        path,
        size: content.len() as u64,
    })
}
