//! MIME type guessing for outgoing files.
//!
//! Browsers fill `fileInfo.type` from the file picker; a terminal client only
//! has a path, so the type is derived from the extension.  The values match
//! what browsers report so a receiving web client renders images inline.

use std::path::Path;

/// Fallback when the extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Returns the MIME type for `filename` based on its extension.
///
/// Matching is case-insensitive.  Names without an extension map to
/// [`DEFAULT_MIME_TYPE`].
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return DEFAULT_MIME_TYPE,
    };
    match ext.as_str() {
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        // Text
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "md" => "text/markdown",
        "csv" => "text/csv",
        // Documents
        "pdf" => "application/pdf",
        // Video
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => DEFAULT_MIME_TYPE,
    }
}
