//! Client configuration types.
//!
//! [`ClientConfig`] is the single source of truth for all runtime settings.
//! It is populated from CLI arguments in `main.rs` or from
//! [`ClientConfig::default`] in tests; nothing in here reads the environment.

use std::path::PathBuf;
use std::time::Duration;

/// Public STUN servers used when none are configured.
pub const DEFAULT_STUN_SERVERS: [&str; 6] = [
    "stun:stun.l.google.com:19302",
    "stun:global.stun.twilio.com:3478",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

/// Where and how to reach the PeerJS signaling server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingConfig {
    /// Host name of the signaling server.
    pub host: String,
    pub port: u16,
    /// Mount path of the server; `peerjs` is appended to it.
    pub path: String,
    /// `true` for `wss://`, `false` for plain `ws://`.
    pub secure: bool,
    /// API key expected by the server (`peerjs` for the public cloud server).
    pub key: String,
    /// How often a `HEARTBEAT` is sent to keep the registration alive.
    pub ping_interval: Duration,
}

impl Default for SignalingConfig {
    /// The public PeerJS cloud server.
    fn default() -> Self {
        Self {
            host: "0.peerjs.com".to_string(),
            port: 443,
            path: "/".to_string(),
            secure: true,
            key: "peerjs".to_string(),
            ping_interval: Duration::from_secs(5),
        }
    }
}

/// Delays before a reconnect attempt to the signaling server.
///
/// There is no backoff and no jitter: every failure schedules one attempt
/// after a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after a signaling error.  The attempt is skipped if the
    /// registration turns out to still be connected.
    pub after_error: Duration,
    /// Delay after the signaling connection was lost.
    pub after_disconnect: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            after_error: Duration::from_secs(5),
            after_disconnect: Duration::from_secs(2),
        }
    }
}

/// All runtime configuration for the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub signaling: SignalingConfig,
    /// STUN/TURN URLs handed to every WebRTC peer connection.
    pub ice_servers: Vec<String>,
    pub reconnect: ReconnectPolicy,
    /// Default directory for `/save` when no directory is given.
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling: SignalingConfig::default(),
            ice_servers: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            reconnect: ReconnectPolicy::default(),
            download_dir: PathBuf::from("."),
        }
    }
}
