//! Domain layer for peerchat-client.
//!
//! Chat entities (identity, message, log, theme) live in `peerchat-core`;
//! this module only adds the client's runtime configuration.

pub mod config;

pub use config::{ClientConfig, ReconnectPolicy, SignalingConfig, DEFAULT_STUN_SERVERS};
