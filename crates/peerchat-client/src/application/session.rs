//! The chat session: connection manager plus message exchange.
//!
//! [`ChatSession`] exclusively owns the signaling handle, the current peer
//! link, the [`MessageLog`], and the [`ReconnectTimer`].  It is driven from a
//! single event loop, so none of its state is behind a lock.
//!
//! # Connection states
//!
//! ```text
//! Idle ──start──▶ Registering ──open──▶ Online ──connect/offer──▶ Connecting
//!                      │                  ▲  ▲                        │
//!                      │        close/error│  └──────reconnect ok──┐  │ channel open
//!                      ▼                  │                       │  ▼
//!                 Reconnecting ◀──────────┴── signaling lost ─── Connected
//! ```
//!
//! The state is derived from two facts: how the signaling registration is
//! doing, and whether there is a link (and whether it has opened).  While the
//! signaling server is reachable the link decides between `Online`,
//! `Connecting` and `Connected`; a lost signaling connection shows as
//! `Reconnecting` even though an open data channel keeps working.
//!
//! # Reconnection
//!
//! | Trigger              | Notification                 | Attempt after |
//! |----------------------|------------------------------|---------------|
//! | signaling error      | Connection Error / reason    | 5 s, only if actually disconnected |
//! | signaling disconnect | Connection Lost              | 2 s, failure is reported |
//!
//! Each trigger replaces the pending attempt; a signaling `open` cancels it.

use std::fmt;

use peerchat_core::{
    decode_frame, encode_data_uri, encode_payload, guess_mime_type, ChatMessage, FileInfo,
    MessageLog, PayloadError, PeerIdentity,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::ReconnectPolicy;

use super::events::{Notification, SessionEvent, UiEvent, UiEventSender};
use super::ports::{ConnectOptions, LinkError, LinkId, PeerLink, SignalingError, SignalingNetwork};
use super::reconnect::{ReconnectCause, ReconnectTimer};

/// Externally visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Registering,
    Online,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Registering => "registering",
            ConnectionState::Online => "online",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by user-initiated session operations.
///
/// Network failures never show up here; they arrive later as events and are
/// turned into notifications.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("peer id must not be empty")]
    EmptyTarget,

    #[error("already connected to {0}; disconnect first")]
    AlreadyConnected(PeerIdentity),

    #[error("not connected to a peer")]
    NotConnected,

    #[error("session has already been started")]
    AlreadyStarted,

    #[error("session has been shut down")]
    TornDown,

    #[error("signaling: {0}")]
    Signaling(#[from] SignalingError),

    #[error("send failed: {0}")]
    Link(#[from] LinkError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// A file picked by the user, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    /// Wraps `bytes`, guessing the MIME type from `name`.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name).to_string();
        Self {
            name,
            mime_type,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outbound,
    Inbound,
}

#[derive(Debug)]
struct ActiveLink {
    handle: Box<dyn PeerLink>,
    direction: Direction,
    open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalingStatus {
    Idle,
    Registering,
    Online,
    Reconnecting,
}

/// One chat session for one identity.
pub struct ChatSession<S: SignalingNetwork> {
    identity: PeerIdentity,
    signaling: S,
    status: SignalingStatus,
    link: Option<ActiveLink>,
    log: MessageLog,
    timer: ReconnectTimer,
    policy: ReconnectPolicy,
    ui: UiEventSender,
    published: ConnectionState,
    torn_down: bool,
}

impl<S: SignalingNetwork> ChatSession<S> {
    pub fn new(
        identity: PeerIdentity,
        signaling: S,
        policy: ReconnectPolicy,
        ui: UiEventSender,
    ) -> Self {
        Self {
            identity,
            signaling,
            status: SignalingStatus::Idle,
            link: None,
            log: MessageLog::new(),
            timer: ReconnectTimer::new(),
            policy,
            ui,
            published: ConnectionState::Idle,
            torn_down: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    pub fn state(&self) -> ConnectionState {
        match self.status {
            SignalingStatus::Idle => ConnectionState::Idle,
            SignalingStatus::Registering => ConnectionState::Registering,
            SignalingStatus::Reconnecting => ConnectionState::Reconnecting,
            SignalingStatus::Online => match &self.link {
                None => ConnectionState::Online,
                Some(link) if link.open => ConnectionState::Connected,
                Some(_) => ConnectionState::Connecting,
            },
        }
    }

    /// Remote identity of the current link, open or still negotiating.
    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.link.as_ref().map(|l| l.handle.peer())
    }

    /// `true` when an open data channel can carry messages.
    pub fn can_send(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.open)
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn pending_reconnect(&self) -> Option<ReconnectCause> {
        self.timer.pending()
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ── User operations ───────────────────────────────────────────────────────

    /// Registers the identity with the signaling network.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyStarted`] on a second call, or the
    /// adapter's synchronous [`SignalingError`].
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.status != SignalingStatus::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        self.emit(UiEvent::IdentityChosen(self.identity.clone()));

        self.signaling.register(&self.identity)?;
        info!("registering as {}", self.identity);
        self.status = SignalingStatus::Registering;
        self.publish_state();
        Ok(())
    }

    /// Requests a reliable, JSON-serialized channel to `target`.
    ///
    /// The outcome arrives later as a link event.  If the signaling adapter
    /// refuses synchronously, a notification is raised and `Ok` is returned.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyTarget`] for a blank id and
    /// [`SessionError::AlreadyConnected`] while a channel is open.
    pub fn connect_to(&mut self, target: &str) -> Result<(), SessionError> {
        self.ensure_live()?;
        let target = PeerIdentity::parse(target).map_err(|_| SessionError::EmptyTarget)?;
        if let Some(link) = self.link.as_ref().filter(|l| l.open) {
            return Err(SessionError::AlreadyConnected(link.handle.peer().clone()));
        }

        match self.signaling.connect(&target, ConnectOptions::default()) {
            Ok(handle) => {
                info!(peer = %target, link = %handle.id(), "dialing peer");
                self.adopt(handle, Direction::Outbound);
            }
            Err(e) => {
                warn!(peer = %target, "connect request refused: {e}");
                self.notify(Notification::destructive(
                    "Connection Error",
                    format!("Failed to connect to {target}. Please check the ID and try again."),
                ));
            }
        }
        self.publish_state();
        Ok(())
    }

    /// Sends `text` as typed and appends it to the log.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyMessage`] for blank input,
    /// [`SessionError::NotConnected`] without an open channel, and
    /// [`SessionError::Link`] if the link refuses the frame.  Nothing is
    /// appended on error.
    pub fn send_text(&mut self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let message = ChatMessage::text(&self.identity, text);
        self.transmit(message)
    }

    /// Sends a whole file inline as a data URI and appends it to the log.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::send_text`], minus the emptiness check.
    pub fn send_file(&mut self, attachment: FileAttachment) -> Result<(), SessionError> {
        let content = encode_data_uri(&attachment.mime_type, &attachment.bytes);
        let info = FileInfo {
            name: attachment.name,
            size: attachment.bytes.len() as u64,
            mime_type: attachment.mime_type,
        };
        let message = ChatMessage::file(&self.identity, content, info);
        self.transmit(message)
    }

    /// Closes the current link, if any, without a notification.
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            info!(peer = %link.handle.peer(), "closing connection");
            link.handle.close();
        }
        self.publish_state();
    }

    // ── Event handling ────────────────────────────────────────────────────────

    /// Folds one network event into the session.
    pub fn handle(&mut self, event: SessionEvent) {
        if self.torn_down {
            debug!("ignoring event after shutdown: {event:?}");
            if let SessionEvent::Offer(mut handle) = event {
                handle.close();
            }
            return;
        }

        match event {
            SessionEvent::SignalingOpened { id } => self.on_signaling_open(id),
            SessionEvent::SignalingDisconnected => self.on_signaling_disconnected(),
            SessionEvent::SignalingErrored { reason } => self.on_signaling_error(reason),
            SessionEvent::Offer(handle) => {
                info!(peer = %handle.peer(), link = %handle.id(), "accepting incoming connection");
                self.adopt(handle, Direction::Inbound);
            }
            SessionEvent::LinkOpened { link } => self.on_link_open(&link),
            SessionEvent::LinkData { link, payload } => self.on_link_data(&link, &payload),
            SessionEvent::LinkClosed { link } => self.on_link_closed(&link),
            SessionEvent::LinkErrored { link, reason } => self.on_link_error(&link, &reason),
        }
        self.publish_state();
    }

    /// Runs the pending reconnect attempt if it is due at `now`.
    pub fn fire_reconnect(&mut self, now: Instant) {
        if self.torn_down {
            return;
        }
        match self.timer.take_due(now) {
            None => {}
            Some(ReconnectCause::SignalingError) => {
                if !self.signaling.is_disconnected() {
                    debug!("signaling still connected; skipping reconnect");
                    return;
                }
                info!("reconnecting to signaling server after error");
                if let Err(e) = self.signaling.reconnect() {
                    error!("reconnection failed: {e}");
                }
            }
            Some(ReconnectCause::Disconnected) => {
                info!("reconnecting to signaling server after disconnect");
                if let Err(e) = self.signaling.reconnect() {
                    error!("reconnection failed: {e}");
                    self.notify(Notification::destructive(
                        "Reconnection Failed",
                        "Please restart peerchat to try again.",
                    ));
                }
            }
        }
    }

    /// Releases the link, the pending timer, and the signaling registration.
    ///
    /// Idempotent; also runs on drop.  Events handled afterwards are ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.timer.cancel();
        if let Some(mut link) = self.link.take() {
            link.handle.close();
        }
        self.signaling.destroy();
        self.status = SignalingStatus::Idle;
        self.publish_state();
        info!("session for {} shut down", self.identity);
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn on_signaling_open(&mut self, id: String) {
        self.timer.cancel();
        self.status = SignalingStatus::Online;
        info!("registered with signaling server as {id}");
        self.notify(Notification::info(
            "Connected to network",
            format!("Your ID is: {id}"),
        ));
    }

    fn on_signaling_disconnected(&mut self) {
        warn!("lost connection to signaling server");
        self.status = SignalingStatus::Reconnecting;
        self.notify(Notification::info(
            "Connection Lost",
            "Attempting to reconnect...",
        ));
        self.timer.schedule(
            ReconnectCause::Disconnected,
            Instant::now(),
            self.policy.after_disconnect,
        );
    }

    fn on_signaling_error(&mut self, reason: String) {
        error!("signaling error: {reason}");
        self.notify(Notification::destructive("Connection Error", reason));
        self.timer.schedule(
            ReconnectCause::SignalingError,
            Instant::now(),
            self.policy.after_error,
        );
    }

    fn on_link_open(&mut self, id: &LinkId) {
        let Some(link) = self.active_mut(id) else {
            debug!(link = %id, "open from inactive connection ignored");
            return;
        };
        link.open = true;
        let peer = link.handle.peer().clone();
        let direction = link.direction;
        info!(peer = %peer, "data channel open");

        let description = match direction {
            Direction::Outbound => format!("Connected to {peer}"),
            Direction::Inbound => format!("{peer} connected to you"),
        };
        self.notify(Notification::info("Connected", description));
    }

    fn on_link_data(&mut self, id: &LinkId, payload: &str) {
        if self.active_mut(id).is_none() {
            debug!(link = %id, "data from inactive connection ignored");
            return;
        }
        match decode_frame(payload) {
            Ok(message) => self.append(message),
            Err(e) if e.is_silent() => debug!(link = %id, "dropping payload: {e}"),
            Err(e) => warn!(link = %id, "dropping payload: {e}"),
        }
    }

    fn on_link_closed(&mut self, id: &LinkId) {
        let Some(mut link) = self.take_active(id) else {
            debug!(link = %id, "close from inactive connection ignored");
            return;
        };
        link.handle.close();
        if !link.open && link.direction == Direction::Outbound {
            info!(peer = %link.handle.peer(), "outbound connection closed before opening");
            return;
        }
        info!(peer = %link.handle.peer(), "peer disconnected");
        self.notify(Notification::info(
            "Disconnected",
            "The peer has disconnected",
        ));
    }

    fn on_link_error(&mut self, id: &LinkId, reason: &str) {
        let Some(mut link) = self.take_active(id) else {
            debug!(link = %id, "error from inactive connection ignored: {reason}");
            return;
        };
        let peer = link.handle.peer().clone();
        error!(peer = %peer, "connection error: {reason}");
        link.handle.close();

        let description = if !link.open && link.direction == Direction::Outbound {
            format!("Failed to connect to {peer}: {reason}")
        } else {
            "Error in peer connection. Please try reconnecting.".to_string()
        };
        self.notify(Notification::destructive("Connection Error", description));
    }

    /// Makes `handle` the current link, closing whatever was there before.
    fn adopt(&mut self, handle: Box<dyn PeerLink>, direction: Direction) {
        if let Some(mut previous) = self.link.take() {
            debug!(link = %previous.handle.id(), "replacing previous connection");
            previous.handle.close();
        }
        self.link = Some(ActiveLink {
            handle,
            direction,
            open: false,
        });
    }

    fn active_mut(&mut self, id: &LinkId) -> Option<&mut ActiveLink> {
        self.link.as_mut().filter(|l| l.handle.id() == id)
    }

    fn take_active(&mut self, id: &LinkId) -> Option<ActiveLink> {
        if self.link.as_ref().is_some_and(|l| l.handle.id() == id) {
            self.link.take()
        } else {
            None
        }
    }

    fn transmit(&mut self, message: ChatMessage) -> Result<(), SessionError> {
        self.ensure_live()?;
        let link = match self.link.as_ref() {
            Some(link) if link.open => link,
            _ => return Err(SessionError::NotConnected),
        };
        let frame = encode_payload(&message)?;
        link.handle.send(&frame)?;
        self.append(message);
        Ok(())
    }

    fn append(&mut self, message: ChatMessage) {
        let index = self.log.push(message.clone());
        self.emit(UiEvent::MessageAppended { index, message });
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.torn_down {
            Err(SessionError::TornDown)
        } else {
            Ok(())
        }
    }

    fn notify(&self, notification: Notification) {
        self.emit(UiEvent::Notification(notification));
    }

    fn emit(&self, event: UiEvent) {
        // The front end may already be gone during shutdown.
        let _ = self.ui.send(event);
    }

    fn publish_state(&mut self) {
        let state = self.state();
        if state != self.published {
            debug!("connection state {} -> {}", self.published, state);
            self.published = state;
            self.emit(UiEvent::ConnectionStateChanged {
                state,
                peer: self.peer().cloned(),
            });
        }
    }
}

impl<S: SignalingNetwork> Drop for ChatSession<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
