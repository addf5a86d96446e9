//! Recording test doubles for the signaling and link ports.
//!
//! # Why hand-written mocks?
//!
//! The real adapters need a signaling server and a second WebRTC peer.  These
//! doubles replace all network I/O with in-memory recording so tests can drive
//! a [`ChatSession`](crate::application::session::ChatSession) by feeding it
//! events and then inspect exactly what it asked the network to do.
//!
//! Both types are cheap handles around shared state: hand one clone to the
//! session and keep another in the test to make assertions.
//!
//! ```ignore
//! let signaling = MockSignaling::new();
//! let mut session = ChatSession::new(id, signaling.clone(), policy, ui_tx);
//! session.start()?;
//! assert_eq!(signaling.state().registered.len(), 1);
//! ```
//!
//! # Failure switches
//!
//! `set_fail_connect`, `set_fail_reconnect` and [`MockLink::fail_sends`]
//! make the corresponding calls return an error, to exercise error paths.

use std::sync::{Arc, Mutex, MutexGuard};

use peerchat_core::PeerIdentity;

use crate::application::ports::{
    ConnectOptions, LinkError, LinkId, PeerLink, SignalingError, SignalingNetwork,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Signaling ─────────────────────────────────────────────────────────────────

/// Everything a [`MockSignaling`] has been asked to do.
#[derive(Debug, Default)]
pub struct MockSignalingState {
    /// Identities passed to `register`.
    pub registered: Vec<PeerIdentity>,
    /// Number of `reconnect` calls (including failed ones).
    pub reconnects: usize,
    /// Targets and options passed to `connect`.
    pub connects: Vec<(PeerIdentity, ConnectOptions)>,
    /// Links handed out by `connect`, in order.
    pub links: Vec<MockLink>,
    pub destroyed: bool,
    pub destroy_calls: usize,
    /// Value returned by `is_disconnected`.
    pub disconnected: bool,
    pub fail_connect: bool,
    pub fail_reconnect: bool,
}

/// A [`SignalingNetwork`] that records calls instead of opening sockets.
#[derive(Debug, Clone, Default)]
pub struct MockSignaling {
    state: Arc<Mutex<MockSignalingState>>,
}

impl MockSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks and returns the recorded state.
    pub fn state(&self) -> MutexGuard<'_, MockSignalingState> {
        lock(&self.state)
    }

    /// The most recent link returned from `connect`.
    pub fn last_link(&self) -> Option<MockLink> {
        self.state().links.last().cloned()
    }

    pub fn set_disconnected(&self, disconnected: bool) {
        self.state().disconnected = disconnected;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state().fail_connect = fail;
    }

    pub fn set_fail_reconnect(&self, fail: bool) {
        self.state().fail_reconnect = fail;
    }
}

impl SignalingNetwork for MockSignaling {
    fn register(&mut self, identity: &PeerIdentity) -> Result<(), SignalingError> {
        self.state().registered.push(identity.clone());
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), SignalingError> {
        let mut state = self.state();
        state.reconnects += 1;
        if state.fail_reconnect {
            return Err(SignalingError::Destroyed);
        }
        Ok(())
    }

    fn is_disconnected(&self) -> bool {
        self.state().disconnected
    }

    fn connect(
        &mut self,
        target: &PeerIdentity,
        options: ConnectOptions,
    ) -> Result<Box<dyn PeerLink>, SignalingError> {
        let mut state = self.state();
        state.connects.push((target.clone(), options));
        if state.fail_connect {
            return Err(SignalingError::Disconnected);
        }
        let link = MockLink::new(LinkId::generate().as_str(), target.as_str());
        state.links.push(link.clone());
        Ok(Box::new(link))
    }

    fn destroy(&mut self) {
        let mut state = self.state();
        state.destroyed = true;
        state.destroy_calls += 1;
    }
}

// ── Link ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MockLinkState {
    sent: Vec<String>,
    closed: bool,
    should_fail: bool,
}

/// A [`PeerLink`] that records sent frames and whether it was closed.
#[derive(Debug, Clone)]
pub struct MockLink {
    id: LinkId,
    peer: PeerIdentity,
    state: Arc<Mutex<MockLinkState>>,
}

impl MockLink {
    /// Creates a link with the given id to `peer`.
    ///
    /// # Panics
    ///
    /// Panics if `peer` is blank; test fixtures always pass a name.
    pub fn new(id: &str, peer: &str) -> Self {
        Self {
            id: LinkId::new(id),
            peer: PeerIdentity::parse(peer).unwrap_or_else(|e| panic!("mock peer {peer:?}: {e}")),
            state: Arc::default(),
        }
    }

    pub fn id(&self) -> &LinkId {
        &self.id
    }

    /// Frames passed to `send`, in order.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.state).sent.clone()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// When `true`, `send` returns [`LinkError::Closed`] and records nothing.
    pub fn fail_sends(&self, fail: bool) {
        lock(&self.state).should_fail = fail;
    }
}

impl PeerLink for MockLink {
    fn id(&self) -> &LinkId {
        &self.id
    }

    fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    fn send(&self, payload: &str) -> Result<(), LinkError> {
        let mut state = lock(&self.state);
        if state.should_fail || state.closed {
            return Err(LinkError::Closed);
        }
        state.sent.push(payload.to_string());
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.state).closed = true;
    }
}
