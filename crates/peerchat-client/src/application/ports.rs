//! Ports: the traits the chat session uses to reach the outside world.
//!
//! The session never names a WebSocket or a WebRTC type.  It talks to a
//! [`SignalingNetwork`] (registration with the signaling server, outbound
//! connection requests) and to [`PeerLink`]s (one direct channel to one
//! remote peer).  Infrastructure adapters implement these traits and report
//! everything that happens asynchronously as
//! [`SessionEvent`](super::events::SessionEvent)s.
//!
//! All methods are synchronous and fire-and-forget: `connect` hands back a
//! link immediately, and whether negotiation succeeds arrives later as a
//! `LinkOpened` or `LinkErrored` event.

use std::fmt;

use peerchat_core::PeerIdentity;
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

/// Prefix of data-connection ids, shared with web clients.
pub const LINK_ID_PREFIX: &str = "dc_";

/// Errors reported synchronously by a [`SignalingNetwork`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// The registration was destroyed and cannot be used again.
    #[error("this peer cannot reconnect to the server. It has already been destroyed.")]
    Destroyed,

    /// The signaling connection is down; new connections cannot be negotiated.
    #[error("cannot connect to new peer after disconnecting from server.")]
    Disconnected,

    /// `reconnect` or `connect` was called before `register`.
    #[error("not registered with the signaling server")]
    NotRegistered,

    /// The configured server address does not form a valid URL.
    #[error("invalid signaling server URL: {0}")]
    InvalidUrl(String),
}

/// Errors reported synchronously by a [`PeerLink`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link was closed locally or its driver task has stopped.
    #[error("connection is closed")]
    Closed,

    /// The data channel has not opened yet.
    #[error("connection is not open")]
    NotOpen,
}

/// Identifier of one data connection, e.g. `dc_x7Kq2mP0aZ`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkId(String);

impl LinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random id with the `dc_` prefix.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        Self(format!("{LINK_ID_PREFIX}{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How payloads are serialized on a data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serialization {
    /// One JSON document per text frame.
    Json,
}

impl Serialization {
    pub fn as_str(self) -> &'static str {
        match self {
            Serialization::Json => "json",
        }
    }
}

/// Options for an outbound connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Ordered, retransmitted delivery.
    pub reliable: bool,
    pub serialization: Serialization,
}

impl Default for ConnectOptions {
    /// A reliable, JSON-serialized channel.
    fn default() -> Self {
        Self {
            reliable: true,
            serialization: Serialization::Json,
        }
    }
}

/// Registration with a signaling network plus outbound connection requests.
///
/// Lifecycle events (`open`, `disconnected`, `error`, inbound offers) are not
/// returned from these methods; the adapter pushes them into the session's
/// event channel.
#[cfg_attr(test, mockall::automock)]
pub trait SignalingNetwork: Send {
    /// Registers `identity` with the signaling server.
    ///
    /// # Errors
    ///
    /// Fails synchronously only for configuration problems or a destroyed
    /// handle; network failures arrive as events.
    fn register(&mut self, identity: &PeerIdentity) -> Result<(), SignalingError>;

    /// Re-opens a lost signaling connection under the same identity.
    ///
    /// # Errors
    ///
    /// Returns [`SignalingError::Destroyed`] if the handle can never reconnect.
    fn reconnect(&mut self) -> Result<(), SignalingError>;

    /// `true` while the signaling connection is down.
    fn is_disconnected(&self) -> bool;

    /// Starts negotiating a direct channel to `target`.
    ///
    /// # Errors
    ///
    /// Fails synchronously when the signaling connection is not usable.
    fn connect(
        &mut self,
        target: &PeerIdentity,
        options: ConnectOptions,
    ) -> Result<Box<dyn PeerLink>, SignalingError>;

    /// Releases the registration.  No events are delivered afterwards.
    fn destroy(&mut self);
}

/// One direct channel to a remote peer.
pub trait PeerLink: Send + fmt::Debug {
    fn id(&self) -> &LinkId;

    /// Identity of the remote peer.
    fn peer(&self) -> &PeerIdentity;

    /// Queues one text frame for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] if the link can no longer carry data.
    fn send(&self, payload: &str) -> Result<(), LinkError>;

    /// Closes the channel.  Idempotent.
    fn close(&mut self);
}
