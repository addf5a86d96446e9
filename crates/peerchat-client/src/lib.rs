//! peerchat-client library crate.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Terminal (stdin commands / stdout rendering)
//!         ↕  Command / UiEvent
//! [peerchat-client]
//!   ├── domain/           Plain configuration types
//!   ├── application/      ChatSession state machine, reconnect timer,
//!   │                     event loop, onboarding, ports (traits)
//!   └── infrastructure/
//!         ├── signaling/  PeerJS signaling server client (tokio-tungstenite)
//!         ├── channel/    WebRTC data channel links (webrtc)
//!         ├── storage/    Theme preference file (toml)
//!         ├── ui_bridge/  Terminal rendering and command parsing
//!         └── mock        Recording test doubles for the ports
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `peerchat-core`, and the port traits
//!   it defines; it never names a WebSocket or WebRTC type.
//! - `infrastructure` implements the ports and turns network callbacks into
//!   [`application::events::SessionEvent`] values.
//!
//! # For beginners: how does a message get from Alice to Bob?
//!
//! 1. Both register their username with a public PeerJS signaling server.
//! 2. Alice asks the server to forward a WebRTC *offer* to "Bob".  Bob's
//!    client answers, and the two exchange ICE candidates through the server.
//! 3. Once the data channel opens, the server is no longer involved: chat
//!    messages are JSON text frames sent directly between the two peers.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: the chat session and its event loop.
pub mod application;

/// Infrastructure layer: signaling, data channels, storage, and terminal UI.
pub mod infrastructure;
