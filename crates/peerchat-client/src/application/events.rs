//! Events flowing into and out of the chat session.
//!
//! ```text
//! infrastructure ──SessionEvent──▶ ChatSession ──UiEvent──▶ front end
//! ```
//!
//! Network callbacks never touch session state directly.  They push a
//! [`SessionEvent`] into an unbounded channel and the single event loop folds
//! it into the state machine.  Everything the user should see leaves the
//! session as a [`UiEvent`].

use peerchat_core::{ChatMessage, PeerIdentity};
use tokio::sync::mpsc;

use super::ports::{LinkId, PeerLink};
use super::session::ConnectionState;

/// Something that happened on the network.
#[derive(Debug)]
pub enum SessionEvent {
    /// The signaling server accepted the registration under `id`.
    SignalingOpened { id: String },
    /// The signaling connection was lost.
    SignalingDisconnected,
    /// The signaling server or socket reported an error.
    SignalingErrored { reason: String },
    /// A remote peer offered a connection; the link is still negotiating.
    Offer(Box<dyn PeerLink>),
    /// The data channel of `link` opened.
    LinkOpened { link: LinkId },
    /// A text frame arrived on `link`.
    LinkData { link: LinkId, payload: String },
    /// `link` was closed by the remote side or the transport.
    LinkClosed { link: LinkId },
    /// `link` failed during negotiation or while open.
    LinkErrored { link: LinkId, reason: String },
}

pub type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;
pub type SessionEventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// How prominently a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    /// Something failed.
    Destructive,
}

/// A transient, user-facing notice (a "toast").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }
}

/// Something the front end should render.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The user's identity for this session.
    IdentityChosen(PeerIdentity),
    /// The connection state changed.  `peer` is the remote side of the
    /// current link, if there is one.
    ConnectionStateChanged {
        state: ConnectionState,
        peer: Option<PeerIdentity>,
    },
    /// A message was appended to the log at `index`.
    MessageAppended { index: usize, message: ChatMessage },
    Notification(Notification),
    /// Plain feedback for a local command, e.g. a rejected input or a saved file.
    Status(String),
}

pub type UiEventSender = mpsc::UnboundedSender<UiEvent>;
pub type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;
