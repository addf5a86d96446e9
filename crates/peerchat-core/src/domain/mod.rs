//! Domain entities for peerchat.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What lives here? (for beginners)
//!
//! The domain layer is the innermost ring of a layered application.  It knows
//! nothing about WebSockets, WebRTC, or the terminal; it only describes the
//! things a chat *is made of*:
//!
//! - an identity that doubles as a network address,
//! - typed messages (text or file),
//! - an append-only log of those messages,
//! - the user's theme preference.
//!
//! Everything in here can be unit-tested without a runtime or network.

/// Usernames: validation and random generation.
pub mod identity;

/// The chat message record and its file metadata.
pub mod message;

/// Ordered, append-only message history.
pub mod message_log;

/// Dark/light display preference.
pub mod theme;
