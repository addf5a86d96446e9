//! JSON payload codec for the data channel.
//!
//! Each data-channel text frame carries exactly one JSON-encoded
//! [`ChatMessage`].  Decoding is tolerant in the same way web clients are:
//!
//! | Frame                                             | Result                          |
//! |---------------------------------------------------|---------------------------------|
//! | object with `type` = `text`/`file` and valid shape | `Ok(ChatMessage)`               |
//! | not an object, or no truthy `type`                | [`PayloadError::MissingKind`]   |
//! | `type` present but not `text`/`file`              | [`PayloadError::UnknownKind`]   |
//! | known `type` but other fields wrong               | [`PayloadError::Malformed`]     |
//! | not JSON at all                                   | [`PayloadError::InvalidJson`]   |
//!
//! The first two error kinds are "silent": the frame simply lacks a recognized
//! kind marker and callers drop it without surfacing anything.  The others are
//! still dropped but are worth a log line.

use serde_json::Value;
use thiserror::Error;

use crate::domain::message::{ChatMessage, MessageKind};

/// Errors produced while decoding or encoding a data-channel payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The frame text is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    /// The payload is not an object or has no truthy `type` field.
    #[error("payload has no kind marker")]
    MissingKind,

    /// The `type` field names a kind this client does not know.
    #[error("unknown message kind: {0}")]
    UnknownKind(String),

    /// The kind is known but the remaining fields do not fit the message shape.
    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: &'static str, reason: String },

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl PayloadError {
    /// Returns `true` for frames that are dropped without any diagnostics,
    /// i.e. frames lacking a recognized kind marker.
    pub fn is_silent(&self) -> bool {
        matches!(self, PayloadError::MissingKind | PayloadError::UnknownKind(_))
    }
}

/// Serializes `message` into a data-channel text frame.
///
/// # Errors
///
/// Returns [`PayloadError::Encode`] if serialization fails.
pub fn encode_payload(message: &ChatMessage) -> Result<String, PayloadError> {
    serde_json::to_string(message).map_err(|e| PayloadError::Encode(e.to_string()))
}

/// Decodes a data-channel text frame.
///
/// # Errors
///
/// See the table in the module documentation.
pub fn decode_frame(frame: &str) -> Result<ChatMessage, PayloadError> {
    let value: Value =
        serde_json::from_str(frame).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
    decode_payload(value)
}

/// Decodes an already-parsed JSON value.
///
/// # Errors
///
/// See the table in the module documentation.
pub fn decode_payload(value: Value) -> Result<ChatMessage, PayloadError> {
    let kind = match value.as_object().and_then(|obj| obj.get("type")) {
        Some(marker) if is_truthy(marker) => match marker.as_str() {
            Some(name) => {
                MessageKind::from_wire(name).ok_or_else(|| PayloadError::UnknownKind(name.to_string()))?
            }
            None => return Err(PayloadError::UnknownKind(marker.to_string())),
        },
        _ => return Err(PayloadError::MissingKind),
    };

    let message: ChatMessage =
        serde_json::from_value(value).map_err(|e| PayloadError::Malformed {
            kind: kind.as_str(),
            reason: e.to_string(),
        })?;

    if message.kind == MessageKind::File && message.file_info.is_none() {
        return Err(PayloadError::Malformed {
            kind: kind.as_str(),
            reason: "missing fileInfo".to_string(),
        });
    }
    Ok(message)
}

/// JavaScript truthiness for a JSON value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
