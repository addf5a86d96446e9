//! # peerchat-core
//!
//! Shared library for peerchat containing the chat domain types, the JSON
//! payload codec spoken on the data channel, and small presentation helpers.
//!
//! This crate has zero dependencies on sockets, WebRTC, or terminal I/O.
//!
//! # Architecture overview (for beginners)
//!
//! peerchat lets two people exchange text and files directly over a
//! peer-to-peer data channel.  A public signaling service is only used to find
//! the other peer and negotiate the channel; after that, messages travel
//! straight between the two machines.
//!
//! This crate (`peerchat-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – The nouns of the system: who you are ([`PeerIdentity`]),
//!   what you say ([`ChatMessage`]), the conversation so far ([`MessageLog`]),
//!   and the one persisted preference ([`ThemePreference`]).
//!
//! - **`protocol`** – How a [`ChatMessage`] becomes a JSON text frame and back,
//!   including the tolerant decoding rules for frames from other clients, and
//!   the `data:` URI encoding used for file contents.
//!
//! - **`display`** – Human-friendly file sizes and file-type icons.

pub mod display;
pub mod domain;
pub mod protocol;

pub use display::{file_type_icon, format_file_size};
pub use domain::identity::{generate_username, generate_username_with, IdentityError, PeerIdentity};
pub use domain::message::{ChatMessage, FileInfo, MessageKind};
pub use domain::message_log::MessageLog;
pub use domain::theme::ThemePreference;
pub use protocol::data_uri::{decode_data_uri, encode_data_uri, DataUri, DataUriError};
pub use protocol::mime::guess_mime_type;
pub use protocol::payload::{decode_frame, decode_payload, encode_payload, PayloadError};
