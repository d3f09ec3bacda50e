//! File extension → Content-Type table used when serving files.

use std::path::Path;

/// Fallback for unknown or missing extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Infer a content type from the file name's extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext {
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "json" => "application/json",
        "css" => "text/css",
        "js" => "application/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
