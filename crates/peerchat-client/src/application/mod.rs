//! Application layer for peerchat-client.
//!
//! Use cases and state machines that orchestrate the domain and the ports.
//! Nothing in here opens a socket: the network is reached only through the
//! [`ports::SignalingNetwork`] and [`ports::PeerLink`] traits, and everything
//! asynchronous comes back as a [`events::SessionEvent`].

/// Traits implemented by infrastructure adapters.
pub mod ports;

/// Network events in, UI events out.
pub mod events;

/// The single replaceable reconnect timer.
pub mod reconnect;

/// Connection manager and message exchange.
pub mod session;

/// The event loop driving a session.
pub mod driver;

/// Username selection before going online.
pub mod onboarding;

pub use driver::{run_session, Command};
pub use events::{Notification, SessionEvent, Severity, UiEvent};
pub use session::{ChatSession, ConnectionState, FileAttachment, SessionError};
