//! Wire formats used on the peer-to-peer data channel.
//!
//! - [`payload`] – JSON encoding of [`crate::ChatMessage`] frames.
//! - [`data_uri`] – `data:` URIs carrying file contents inside a message.
//! - [`mime`] – MIME type guessing for outgoing files.

pub mod data_uri;
pub mod mime;
pub mod payload;

pub use data_uri::{decode_data_uri, encode_data_uri, DataUri, DataUriError};
pub use mime::guess_mime_type;
pub use payload::{decode_frame, decode_payload, encode_payload, PayloadError};
