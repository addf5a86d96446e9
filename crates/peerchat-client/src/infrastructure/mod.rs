//! Infrastructure layer for the chat client.
//!
//! Contains the adapters that touch the outside world: the PeerJS signaling
//! WebSocket, WebRTC data channels, the preferences file and the terminal.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `peerchat_core`, but MUST NOT be imported by the `application` or domain
//! layers.
//!
//! # Sub-modules
//!
//! - **`signaling`** – `PeerJsSignaling`, the [`SignalingNetwork`] adapter.
//!   Registers with a PeerJS server over WebSocket, sends heartbeats, relays
//!   SDP offers/answers and ICE candidates, and reports server loss as events.
//!
//! - **`channel`** – `WebRtcLink`, the [`PeerLink`] adapter.  One task per
//!   link owns the `RTCPeerConnection` and its data channel.
//!
//! - **`storage`** – the theme preference, persisted as TOML in the platform
//!   config directory.
//!
//! - **`ui_bridge`** – terminal command parsing and rendering of UI events.
//!
//! - **`mock`** – recording doubles for both ports, used by the tests.
//!
//! [`SignalingNetwork`]: crate::application::ports::SignalingNetwork
//! [`PeerLink`]: crate::application::ports::PeerLink

pub mod channel;
pub mod mock;
pub mod signaling;
pub mod storage;
pub mod ui_bridge;
