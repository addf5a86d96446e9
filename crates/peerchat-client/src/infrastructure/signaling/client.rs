//! WebSocket client for a PeerJS signaling server.
//!
//! Architecture:
//! - `PeerJsSignaling` is the synchronous [`SignalingNetwork`] handle owned by
//!   the session.  Each `register`/`reconnect` spawns one socket task.
//! - The socket task reads server frames, writes queued client frames and a
//!   `HEARTBEAT` every ping interval.  Lifecycle changes go out as
//!   [`SessionEvent`]s.
//! - Outbound frames from links are queued on one unbounded channel that
//!   outlives individual sockets, so candidates produced while the server is
//!   unreachable are delivered after the next `OPEN`.
//!
//! # Failure handling
//!
//! | Situation                          | Events                          | Handle afterwards |
//! |------------------------------------|---------------------------------|-------------------|
//! | socket cannot connect / is lost    | `SignalingErrored`, `SignalingDisconnected` | disconnected |
//! | `ID-TAKEN`/`INVALID-KEY`/`ERROR` before the first `OPEN` | `SignalingDisconnected`, `SignalingErrored` | destroyed |
//! | the same after an `OPEN`           | `SignalingDisconnected`, `SignalingErrored` | disconnected |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use peerchat_core::PeerIdentity;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::protocol::{ClientMessage, ErrorPayload, ServerMessage, DATA_CONNECTION, HEARTBEAT_FRAME};
use crate::application::events::{SessionEvent, SessionEventSender};
use crate::application::ports::{ConnectOptions, PeerLink, SignalingError, SignalingNetwork};
use crate::domain::config::SignalingConfig;
use crate::infrastructure::channel::{LinkContext, LinkRegistry, Negotiation, WebRtcLink};

/// Reason reported when an established socket drops.
const LOST_CONNECTION: &str = "Lost connection to server.";

/// Builds the PeerJS WebSocket URL for `id`.
///
/// `path` is normalised to start and end with `/`, then `peerjs` is appended:
/// `wss://0.peerjs.com/peerjs?key=peerjs&id=Alice&token=…`.
///
/// # Errors
///
/// Returns [`SignalingError::InvalidUrl`] if the host or path do not form a
/// valid URL.
pub fn server_url(config: &SignalingConfig, id: &PeerIdentity, token: &str) -> Result<Url, SignalingError> {
    let scheme = if config.secure { "wss" } else { "ws" };

    let mut path = config.path.trim().to_string();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if !path.ends_with('/') {
        path.push('/');
    }

    let mut url = Url::parse(&format!("{scheme}://{}:{}{path}peerjs", config.host, config.port))
        .map_err(|e| SignalingError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("key", &config.key)
        .append_pair("id", id.as_str())
        .append_pair("token", token);
    Ok(url)
}

// ── Shared state ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Flags {
    disconnected: AtomicBool,
    destroyed: AtomicBool,
    /// Set on the first `OPEN`; decides whether a server rejection is fatal.
    opened_once: AtomicBool,
}

impl Flags {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn set_disconnected(&self, value: bool) {
        self.disconnected.store(value, Ordering::SeqCst);
    }
}

type Outbox = Arc<Mutex<mpsc::UnboundedReceiver<ClientMessage>>>;

// ── Handle ────────────────────────────────────────────────────────────────────

/// [`SignalingNetwork`] backed by a PeerJS signaling server.
pub struct PeerJsSignaling {
    config: SignalingConfig,
    identity: Option<PeerIdentity>,
    /// Random per-process token; the server uses it to tell reconnects of the
    /// same id apart from impostors.
    token: String,
    flags: Arc<Flags>,
    links: LinkContext,
    outbox: Outbox,
    shutdown: Option<oneshot::Sender<()>>,
}

impl PeerJsSignaling {
    /// Creates an unregistered handle.  Nothing touches the network until
    /// [`SignalingNetwork::register`].
    pub fn new(config: SignalingConfig, ice_servers: Vec<String>, events: SessionEventSender) -> Self {
        let (signals, outbox) = mpsc::unbounded_channel();
        Self {
            config,
            identity: None,
            token: Uuid::new_v4().simple().to_string(),
            flags: Arc::default(),
            links: LinkContext {
                ice_servers: Arc::new(ice_servers),
                signals,
                events,
                registry: LinkRegistry::new(),
            },
            outbox: Arc::new(Mutex::new(outbox)),
            shutdown: None,
        }
    }

    fn open_socket(&mut self, identity: &PeerIdentity) -> Result<(), SignalingError> {
        let url = server_url(&self.config, identity, &self.token)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        // Any earlier socket task has already ended; dropping its sender is a no-op.
        self.shutdown = Some(shutdown_tx);

        let socket = Socket {
            identity: identity.clone(),
            key: self.config.key.clone(),
            flags: Arc::clone(&self.flags),
            links: self.links.clone(),
        };
        info!("connecting to signaling server {}:{}", self.config.host, self.config.port);
        tokio::spawn(socket.run(
            url.to_string(),
            self.config.ping_interval,
            Arc::clone(&self.outbox),
            shutdown_rx,
        ));
        Ok(())
    }
}

impl SignalingNetwork for PeerJsSignaling {
    fn register(&mut self, identity: &PeerIdentity) -> Result<(), SignalingError> {
        if self.flags.is_destroyed() {
            return Err(SignalingError::Destroyed);
        }
        self.identity = Some(identity.clone());
        self.open_socket(identity)
    }

    fn reconnect(&mut self) -> Result<(), SignalingError> {
        if self.flags.is_destroyed() {
            return Err(SignalingError::Destroyed);
        }
        let Some(identity) = self.identity.clone() else {
            return Err(SignalingError::NotRegistered);
        };
        if !self.flags.is_disconnected() {
            debug!("reconnect requested while still connected; ignoring");
            return Ok(());
        }
        info!("reconnecting to signaling server as {identity}");
        self.flags.set_disconnected(false);
        self.open_socket(&identity)
    }

    fn is_disconnected(&self) -> bool {
        self.flags.is_disconnected()
    }

    fn connect(
        &mut self,
        target: &PeerIdentity,
        options: ConnectOptions,
    ) -> Result<Box<dyn PeerLink>, SignalingError> {
        if self.flags.is_destroyed() || self.flags.is_disconnected() {
            return Err(SignalingError::Disconnected);
        }
        if self.identity.is_none() {
            return Err(SignalingError::NotRegistered);
        }
        let link = WebRtcLink::dial(self.links.clone(), target.clone(), options);
        Ok(Box::new(link))
    }

    fn destroy(&mut self) {
        if self.flags.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.flags.set_disconnected(true);
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.links.registry.clear();
        debug!("signaling registration destroyed");
    }
}

impl Drop for PeerJsSignaling {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ── Socket task ───────────────────────────────────────────────────────────────

/// How a socket task ended.
#[derive(Debug, PartialEq, Eq)]
enum SocketEnd {
    /// `destroy` was called.
    Shutdown,
    /// The server rejected the registration; events were already sent.
    Rejected,
    /// The server closed the socket.
    Closed,
}

/// Whether to keep reading after a frame.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Reject,
}

struct Socket {
    identity: PeerIdentity,
    key: String,
    flags: Arc<Flags>,
    links: LinkContext,
}

impl Socket {
    fn emit(&self, event: SessionEvent) {
        if self.links.events.send(event).is_err() {
            debug!("session gone; dropping signaling event");
        }
    }

    async fn run(
        self,
        url: String,
        ping_interval: std::time::Duration,
        outbox: Outbox,
        shutdown: oneshot::Receiver<()>,
    ) {
        let reason = match self.pump(&url, ping_interval, outbox, shutdown).await {
            Ok(SocketEnd::Shutdown) => {
                debug!("signaling socket shut down");
                return;
            }
            Ok(SocketEnd::Rejected) => return,
            Ok(SocketEnd::Closed) => LOST_CONNECTION.to_string(),
            Err(e) => {
                warn!("signaling socket failed: {e:#}");
                if self.flags.opened_once.load(Ordering::SeqCst) {
                    LOST_CONNECTION.to_string()
                } else {
                    e.to_string()
                }
            }
        };

        if self.flags.is_destroyed() {
            return;
        }
        info!("signaling connection lost");
        self.flags.set_disconnected(true);
        self.emit(SessionEvent::SignalingErrored { reason });
        self.emit(SessionEvent::SignalingDisconnected);
    }

    async fn pump(
        &self,
        url: &str,
        ping_interval: std::time::Duration,
        outbox: Outbox,
        mut shutdown: oneshot::Receiver<()>,
    ) -> anyhow::Result<SocketEnd> {
        let (ws, _) = tokio::select! {
            _ = &mut shutdown => return Ok(SocketEnd::Shutdown),
            result = connect_async(url) => result.context("Could not connect to the signaling server")?,
        };
        debug!("signaling socket connected");
        let (mut sink, mut stream) = ws.split();

        // Held for the socket's lifetime; the next socket waits for it.
        let mut outbox = outbox.lock().await;
        let mut heartbeat = interval_at(Instant::now() + ping_interval, ping_interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(SocketEnd::Shutdown);
                }

                frame = stream.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if self.handle_frame(&text) == Flow::Reject {
                            let _ = sink.send(WsMessage::Close(None)).await;
                            return Ok(SocketEnd::Rejected);
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return Ok(SocketEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("signaling socket error"),
                },

                Some(message) = outbox.recv() => {
                    let json = message.to_json().context("could not encode signaling frame")?;
                    sink.send(WsMessage::Text(json)).await.context("could not send signaling frame")?;
                }

                _ = heartbeat.tick() => {
                    sink.send(WsMessage::Text(HEARTBEAT_FRAME.to_string()))
                        .await
                        .context("could not send heartbeat")?;
                }
            }
        }
    }

    /// Applies one server frame.
    fn handle_frame(&self, text: &str) -> Flow {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("ignoring malformed signaling frame: {e}");
                return Flow::Continue;
            }
        };

        match message {
            ServerMessage::Open => {
                info!("registered with signaling server as {}", self.identity);
                self.flags.set_disconnected(false);
                self.flags.opened_once.store(true, Ordering::SeqCst);
                self.emit(SessionEvent::SignalingOpened {
                    id: self.identity.to_string(),
                });
            }
            ServerMessage::IdTaken { .. } => {
                return self.reject(format!("ID \"{}\" is taken", self.identity));
            }
            ServerMessage::InvalidKey { .. } => {
                return self.reject(format!("API KEY \"{}\" is invalid", self.key));
            }
            ServerMessage::Error { payload } => {
                let ErrorPayload { msg } = payload.unwrap_or_default();
                return self.reject(msg);
            }
            ServerMessage::Offer { src, payload } => {
                if payload.connection_type != DATA_CONNECTION {
                    debug!("ignoring {} offer from {src}", payload.connection_type);
                    return Flow::Continue;
                }
                let peer = match PeerIdentity::parse(&src) {
                    Ok(peer) => peer,
                    Err(e) => {
                        warn!("ignoring offer with invalid source {src:?}: {e}");
                        return Flow::Continue;
                    }
                };
                info!("incoming connection from {peer}");
                let link = WebRtcLink::accept(self.links.clone(), peer, payload);
                self.emit(SessionEvent::Offer(Box::new(link)));
            }
            ServerMessage::Answer { src, payload } => {
                let id = payload.connection_id.clone();
                if !self.links.registry.route(&id, Negotiation::Answer(payload.sdp)) {
                    debug!("answer from {src} for unknown connection {id}");
                }
            }
            ServerMessage::Candidate { src, payload } => {
                let id = payload.connection_id.clone();
                if !self.links.registry.route(&id, Negotiation::Candidate(payload.candidate)) {
                    debug!("candidate from {src} for unknown connection {id}");
                }
            }
            ServerMessage::Leave { src } => {
                debug!("{src} left the signaling server");
                self.links.registry.route_peer(&src, Negotiation::RemoteLeft);
            }
            ServerMessage::Expire { src } => {
                debug!("message to {src} expired");
                self.links.registry.route_peer(&src, Negotiation::Expired);
            }
            ServerMessage::Heartbeat | ServerMessage::Unknown => {}
        }
        Flow::Continue
    }

    /// The server refused the registration.
    fn reject(&self, reason: String) -> Flow {
        warn!("signaling server rejected registration: {reason}");
        if !self.flags.opened_once.load(Ordering::SeqCst) {
            self.flags.destroyed.store(true, Ordering::SeqCst);
        }
        self.flags.set_disconnected(true);
        self.emit(SessionEvent::SignalingDisconnected);
        self.emit(SessionEvent::SignalingErrored { reason });
        Flow::Reject
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
