//! Direct peer channels.
//!
//! A link is created either by dialing (`WebRtcLink::dial`) or by accepting
//! an inbound offer (`WebRtcLink::accept`).  While it negotiates, signaling
//! traffic addressed to its connection id is routed to it through the
//! [`LinkRegistry`], which the signaling socket task shares with every link.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::application::events::SessionEventSender;
use crate::infrastructure::signaling::protocol::{ClientMessage, IceCandidate, SessionDescription};

pub mod link;

pub use self::link::WebRtcLink;

/// Signaling traffic delivered to one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// The remote side's SDP answer.
    Answer(SessionDescription),
    /// A trickled remote ICE candidate.
    Candidate(IceCandidate),
    /// The remote peer left the signaling server.
    RemoteLeft,
    /// A message to the remote peer could not be delivered.
    Expired,
}

#[derive(Debug)]
struct Route {
    peer: String,
    tx: mpsc::UnboundedSender<Negotiation>,
}

/// Connection id → negotiating link.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    routes: Arc<Mutex<HashMap<String, Route>>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, connection_id: &str, peer: &str, tx: mpsc::UnboundedSender<Negotiation>) {
        self.routes().insert(
            connection_id.to_string(),
            Route {
                peer: peer.to_string(),
                tx,
            },
        );
    }

    pub fn remove(&self, connection_id: &str) {
        self.routes().remove(connection_id);
    }

    /// Delivers `signal` to the link with `connection_id`.
    ///
    /// Returns `false` if no such link is registered.
    pub fn route(&self, connection_id: &str, signal: Negotiation) -> bool {
        match self.routes().get(connection_id) {
            Some(route) => route.tx.send(signal).is_ok(),
            None => false,
        }
    }

    /// Delivers `signal` to every link with `peer`.  Returns how many received it.
    pub fn route_peer(&self, peer: &str, signal: Negotiation) -> usize {
        self.routes()
            .values()
            .filter(|route| route.peer == peer)
            .filter(|route| route.tx.send(signal.clone()).is_ok())
            .count()
    }

    /// Drops every route; link tasks see their signal stream end.
    pub fn clear(&self) {
        self.routes().clear();
    }

    pub fn len(&self) -> usize {
        self.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What every link task needs from the signaling adapter.
#[derive(Debug, Clone)]
pub struct LinkContext {
    /// STUN/TURN URLs for ICE.
    pub ice_servers: Arc<Vec<String>>,
    /// Outbound signaling frames (offers, answers, candidates).
    pub signals: mpsc::UnboundedSender<ClientMessage>,
    /// The session's event channel.
    pub events: SessionEventSender,
    pub registry: LinkRegistry,
}
