//! The chat message record exchanged between peers.
//!
//! On the wire a message is a JSON object:
//!
//! ```json
//! {"type":"text","content":"hello","sender":"Alice","timestamp":1700000000000}
//! {"type":"file","content":"data:image/png;base64,...","sender":"Bob",
//!  "timestamp":1700000000001,"fileInfo":{"name":"a.png","size":1234,"type":"image/png"}}
//! ```
//!
//! `fileInfo` is only present for file messages.  Messages are immutable once
//! built and are never deduplicated or persisted.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::identity::PeerIdentity;

/// Discriminates the two message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
}

impl MessageKind {
    /// Wire name of the kind (`"text"` or `"file"`).
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File => "file",
        }
    }

    /// Looks up a kind by its wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "text" => Some(MessageKind::Text),
            "file" => Some(MessageKind::File),
            _ => None,
        }
    }
}

/// Metadata describing the file carried by a [`MessageKind::File`] message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Original file name, without directories.
    pub name: String,
    /// Size of the raw file contents in bytes.
    pub size: u64,
    /// MIME type, e.g. `image/png`.
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text as typed, or a `data:` URI for files.
    pub content: String,
    /// Username of the author.
    pub sender: String,
    /// Milliseconds since the Unix epoch at which the author created it.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
}

impl ChatMessage {
    /// Builds a text message stamped with the current time.
    ///
    /// `content` is stored exactly as typed; callers validate non-emptiness.
    pub fn text(sender: &PeerIdentity, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            content: content.into(),
            sender: sender.as_str().to_string(),
            timestamp: now_millis(),
            file_info: None,
        }
    }

    /// Builds a file message stamped with the current time.
    pub fn file(sender: &PeerIdentity, data_uri: impl Into<String>, info: FileInfo) -> Self {
        Self {
            kind: MessageKind::File,
            content: data_uri.into(),
            sender: sender.as_str().to_string(),
            timestamp: now_millis(),
            file_info: Some(info),
        }
    }

    /// Returns `true` when `identity` authored this message.
    pub fn is_from(&self, identity: &PeerIdentity) -> bool {
        self.sender == identity.as_str()
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
