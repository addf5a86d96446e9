//! `data:` URI encoding for file contents.
//!
//! File messages carry the whole file inline as
//!
//! ```text
//! data:<mime>;base64,<standard base64 with padding>
//! ```
//!
//! which is exactly what a browser's `FileReader.readAsDataURL` produces, so
//! files sent from a web peer can be saved here and vice versa.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use super::mime::DEFAULT_MIME_TYPE;

/// Errors returned by [`decode_data_uri`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataUriError {
    /// The string does not start with `data:`.
    #[error("not a data URI")]
    MissingScheme,

    /// There is no `,` separating the header from the data.
    #[error("data URI has no payload separator")]
    MissingSeparator,

    /// Only base64-encoded data URIs are produced by chat clients.
    #[error("data URI is not base64 encoded")]
    NotBase64,

    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encodes `bytes` as a base64 data URI with the given MIME type.
///
/// An empty `mime_type` is replaced by `application/octet-stream`.
///
/// # Examples
///
/// ```rust
/// use peerchat_core::encode_data_uri;
///
/// assert_eq!(encode_data_uri("text/plain", b"hi"), "data:text/plain;base64,aGk=");
/// ```
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.trim().is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Parses a base64 data URI back into its MIME type and raw bytes.
///
/// # Errors
///
/// See [`DataUriError`] for the rejected shapes.
pub fn decode_data_uri(uri: &str) -> Result<DataUri, DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
    let (header, data) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(DataUriError::NotBase64);
    }

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| DataUriError::InvalidBase64(e.to_string()))?;

    Ok(DataUri {
        mime_type: if mime.is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}
