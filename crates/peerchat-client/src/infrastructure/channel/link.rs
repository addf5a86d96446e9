//! WebRTC data-channel implementation of [`PeerLink`].
//!
//! # How a link works (for beginners)
//!
//! Two peers cannot open a direct channel on their own: they first swap an
//! SDP *offer* and *answer* plus a handful of ICE *candidates* (possible
//! network paths) through the signaling server.  Once ICE finds a path the
//! data channel opens and text frames flow peer to peer.
//!
//! ```text
//!  dialer                    signaling server                   acceptor
//!    │ ── OFFER  (sdp, connectionId) ──▶  ──▶  WebRtcLink::accept │
//!    │ ◀── ANSWER (sdp)              ◀──  ◀──                     │
//!    │ ◀─▶ CANDIDATE …               ◀─▶  ◀─▶                     │
//!    │ ════════════════ data channel (direct) ═══════════════════ │
//! ```
//!
//! Each link is a small handle plus one spawned task.  The task owns the
//! `RTCPeerConnection`; the handle only queues commands to it, so
//! [`PeerLink::send`] and [`PeerLink::close`] never block.  Everything the
//! task observes is reported as a [`SessionEvent`] tagged with the link id.
//!
//! Outgoing payloads go out as data-channel *string* messages.  Inbound
//! frames are accepted either way: PeerJS 1.5 and later deliver its `json`
//! serialization as UTF-8 binary frames, so any frame that decodes as UTF-8
//! is handed to the session as text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use peerchat_core::PeerIdentity;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use super::{LinkContext, Negotiation};
use crate::application::events::{SessionEvent, SessionEventSender};
use crate::application::ports::{ConnectOptions, LinkError, LinkId, PeerLink};
use crate::infrastructure::signaling::protocol::{
    AnswerPayload, CandidatePayload, ClientMessage, IceCandidate, OfferPayload,
    SessionDescription, BROWSER, DATA_CONNECTION,
};

#[derive(Debug)]
enum LinkCommand {
    Send(String),
    Close,
}

/// Which side of the negotiation this link plays.
enum Role {
    Dialer(ConnectOptions),
    Acceptor(OfferPayload),
}

/// Handle to one WebRTC data connection.
#[derive(Debug)]
pub struct WebRtcLink {
    id: LinkId,
    peer: PeerIdentity,
    commands: mpsc::UnboundedSender<LinkCommand>,
    closed: bool,
}

impl WebRtcLink {
    /// Starts negotiating an outbound connection to `peer`.
    ///
    /// The OFFER is sent as soon as the local description is ready.
    pub fn dial(ctx: LinkContext, peer: PeerIdentity, options: ConnectOptions) -> Self {
        Self::spawn(ctx, LinkId::generate(), peer, Role::Dialer(options))
    }

    /// Answers an inbound `offer` from `peer`.
    pub fn accept(ctx: LinkContext, peer: PeerIdentity, offer: OfferPayload) -> Self {
        let id = LinkId::new(offer.connection_id.clone());
        Self::spawn(ctx, id, peer, Role::Acceptor(offer))
    }

    fn spawn(ctx: LinkContext, id: LinkId, peer: PeerIdentity, role: Role) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        ctx.registry.insert(id.as_str(), peer.as_str(), signal_tx);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(drive_link(
            ctx,
            id.clone(),
            peer.clone(),
            role,
            signal_rx,
            command_rx,
        ));

        Self {
            id,
            peer,
            commands: command_tx,
            closed: false,
        }
    }
}

impl PeerLink for WebRtcLink {
    fn id(&self) -> &LinkId {
        &self.id
    }

    fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    fn send(&self, payload: &str) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.commands
            .send(LinkCommand::Send(payload.to_string()))
            .map_err(|_| LinkError::Closed)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.commands.send(LinkCommand::Close);
        }
    }
}

impl Drop for WebRtcLink {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Link task ─────────────────────────────────────────────────────────────────

async fn drive_link(
    ctx: LinkContext,
    id: LinkId,
    peer: PeerIdentity,
    role: Role,
    signals: mpsc::UnboundedReceiver<Negotiation>,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
) {
    let outcome = match build_peer_connection(&ctx.ice_servers).await {
        Ok(pc) => {
            let mut channel = None;
            let outcome = negotiate_and_run(
                &ctx,
                &pc,
                &id,
                &peer,
                role,
                &mut channel,
                signals,
                commands,
            )
            .await;
            if let Some(dc) = channel {
                let _ = dc.close().await;
            }
            if let Err(e) = pc.close().await {
                debug!(link = %id, "error closing peer connection: {e}");
            }
            outcome
        }
        Err(e) => Err(e),
    };

    ctx.registry.remove(id.as_str());
    match outcome {
        Ok(()) => debug!(link = %id, "link task finished"),
        Err(e) => {
            warn!(link = %id, peer = %peer, "link failed: {e:#}");
            let _ = ctx.events.send(SessionEvent::LinkErrored {
                link: id,
                reason: e.to_string(),
            });
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn negotiate_and_run(
    ctx: &LinkContext,
    pc: &Arc<RTCPeerConnection>,
    id: &LinkId,
    peer: &PeerIdentity,
    role: Role,
    channel: &mut Option<Arc<RTCDataChannel>>,
    mut signals: mpsc::UnboundedReceiver<Negotiation>,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
) -> anyhow::Result<()> {
    watch_ice_candidates(pc, ctx.signals.clone(), peer, id);
    watch_connection_state(pc, ctx.events.clone(), peer, id);

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Arc<RTCDataChannel>>();
    let opened = Arc::new(AtomicBool::new(false));

    match role {
        Role::Dialer(options) => {
            let init = RTCDataChannelInit {
                ordered: Some(options.reliable),
                max_retransmits: (!options.reliable).then_some(0),
                ..Default::default()
            };
            let dc = pc
                .create_data_channel(id.as_str(), Some(init))
                .await
                .context("could not create data channel")?;
            watch_data_channel(&dc, ctx.events.clone(), id, opened.clone());
            *channel = Some(dc);

            let offer = pc.create_offer(None).await.context("could not create offer")?;
            pc.set_local_description(offer.clone()).await?;
            info!(link = %id, "offering connection to {peer}");
            let _ = ctx.signals.send(ClientMessage::Offer {
                dst: peer.to_string(),
                payload: OfferPayload {
                    sdp: SessionDescription::offer(offer.sdp),
                    connection_type: DATA_CONNECTION.to_string(),
                    connection_id: id.to_string(),
                    label: Some(id.to_string()),
                    reliable: options.reliable,
                    serialization: Some(options.serialization.as_str().to_string()),
                    metadata: None,
                    browser: Some(BROWSER.to_string()),
                },
            });
        }
        Role::Acceptor(offer) => {
            let (events, link, opened) = (ctx.events.clone(), id.clone(), opened.clone());
            pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                watch_data_channel(&dc, events.clone(), &link, opened.clone());
                let _ = inbound_tx.send(dc);
                Box::pin(async {})
            }));

            let remote = RTCSessionDescription::offer(offer.sdp.sdp)?;
            pc.set_remote_description(remote)
                .await
                .context("could not apply remote offer")?;
            let answer = pc.create_answer(None).await.context("could not create answer")?;
            pc.set_local_description(answer.clone()).await?;
            info!(link = %id, "answering connection from {peer}");
            let _ = ctx.signals.send(ClientMessage::Answer {
                dst: peer.to_string(),
                payload: AnswerPayload {
                    sdp: SessionDescription::answer(answer.sdp),
                    connection_type: DATA_CONNECTION.to_string(),
                    connection_id: id.to_string(),
                    browser: Some(BROWSER.to_string()),
                },
            });
        }
    }

    loop {
        tokio::select! {
            // The announced channel must be stored before a queued send runs.
            biased;

            Some(dc) = inbound_rx.recv() => {
                debug!(link = %id, "remote data channel '{}' announced", dc.label());
                *channel = Some(dc);
            }

            signal = signals.recv() => match signal {
                Some(Negotiation::Answer(answer)) => {
                    let remote = RTCSessionDescription::answer(answer.sdp)?;
                    pc.set_remote_description(remote)
                        .await
                        .context("could not apply remote answer")?;
                }
                Some(Negotiation::Candidate(candidate)) => {
                    if candidate.candidate.is_empty() {
                        continue;
                    }
                    if let Err(e) = pc.add_ice_candidate(candidate_init(candidate)).await {
                        warn!(link = %id, "ignoring remote ICE candidate: {e}");
                    }
                }
                Some(Negotiation::RemoteLeft) => {
                    info!(link = %id, "{peer} left the signaling server");
                    let _ = ctx.events.send(SessionEvent::LinkClosed { link: id.clone() });
                    return Ok(());
                }
                Some(Negotiation::Expired) => {
                    on_expired(opened.load(Ordering::Acquire), peer, id)?;
                }
                // Registry cleared: the signaling adapter was destroyed.
                None => return Ok(()),
            },

            command = commands.recv() => match command {
                Some(LinkCommand::Send(text)) => match channel.as_ref() {
                    Some(dc) => {
                        dc.send_text(text).await.context("could not send on data channel")?;
                    }
                    None => return Err(anyhow!(LinkError::NotOpen)),
                },
                Some(LinkCommand::Close) | None => return Ok(()),
            },
        }
    }
}

/// An EXPIRE only fails a link that never opened.
fn on_expired(opened: bool, peer: &PeerIdentity, id: &LinkId) -> anyhow::Result<()> {
    if opened {
        info!(link = %id, "{peer} is unavailable to signaling; keeping open channel");
        Ok(())
    } else {
        Err(anyhow!("Could not connect to peer {peer}"))
    }
}

async fn build_peer_connection(ice_servers: &[String]) -> anyhow::Result<Arc<RTCPeerConnection>> {
    let mut media = MediaEngine::default();
    media.register_default_codecs()?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media)?;

    let api = APIBuilder::new()
        .with_media_engine(media)
        .with_interceptor_registry(registry)
        .build();

    let config = RTCConfiguration {
        ice_servers: ice_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let pc = api
        .new_peer_connection(config)
        .await
        .context("could not create peer connection")?;
    Ok(Arc::new(pc))
}

fn candidate_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
    }
}

// ── Callbacks ─────────────────────────────────────────────────────────────────

/// Trickles local ICE candidates to the remote peer as they are gathered.
fn watch_ice_candidates(
    pc: &RTCPeerConnection,
    signals: mpsc::UnboundedSender<ClientMessage>,
    peer: &PeerIdentity,
    id: &LinkId,
) {
    let dst = peer.to_string();
    let connection_id = id.to_string();
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let signals = signals.clone();
        let dst = dst.clone();
        let connection_id = connection_id.clone();
        Box::pin(async move {
            let Some(candidate) = candidate else {
                return;
            };
            match candidate.to_json() {
                Ok(init) => {
                    let _ = signals.send(ClientMessage::Candidate {
                        dst,
                        payload: CandidatePayload {
                            candidate: IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_mline_index: init.sdp_mline_index,
                                username_fragment: init.username_fragment,
                            },
                            connection_type: DATA_CONNECTION.to_string(),
                            connection_id,
                        },
                    });
                }
                Err(e) => warn!("could not serialize local ICE candidate: {e}"),
            }
        })
    }));
}

fn watch_connection_state(
    pc: &RTCPeerConnection,
    events: SessionEventSender,
    peer: &PeerIdentity,
    id: &LinkId,
) {
    let peer = peer.to_string();
    let id = id.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        debug!(link = %id, "peer connection state: {state}");
        if state == RTCPeerConnectionState::Failed {
            let _ = events.send(SessionEvent::LinkErrored {
                link: id.clone(),
                reason: format!("Negotiation of connection to {peer} failed."),
            });
        }
        Box::pin(async {})
    }));
}

/// Forwards data-channel lifecycle and text frames to the session.
fn watch_data_channel(
    dc: &Arc<RTCDataChannel>,
    events: SessionEventSender,
    id: &LinkId,
    opened: Arc<AtomicBool>,
) {
    let (open_events, open_id) = (events.clone(), id.clone());
    dc.on_open(Box::new(move || {
        info!(link = %open_id, "data channel open");
        opened.store(true, Ordering::Release);
        let _ = open_events.send(SessionEvent::LinkOpened { link: open_id });
        Box::pin(async {})
    }));

    let (message_events, message_id) = (events.clone(), id.clone());
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        if let Some(payload) = frame_text(&msg, &message_id) {
            let _ = message_events.send(SessionEvent::LinkData {
                link: message_id.clone(),
                payload,
            });
        }
        Box::pin(async {})
    }));

    let (close_events, close_id) = (events.clone(), id.clone());
    dc.on_close(Box::new(move || {
        debug!(link = %close_id, "data channel closed");
        let _ = close_events.send(SessionEvent::LinkClosed {
            link: close_id.clone(),
        });
        Box::pin(async {})
    }));

    let error_id = id.clone();
    dc.on_error(Box::new(move |err: webrtc::Error| {
        let _ = events.send(SessionEvent::LinkErrored {
            link: error_id.clone(),
            reason: err.to_string(),
        });
        Box::pin(async {})
    }));
}

/// The UTF-8 text carried by a frame, whether sent as a string or as bytes.
fn frame_text(msg: &DataChannelMessage, id: &LinkId) -> Option<String> {
    match std::str::from_utf8(&msg.data) {
        Ok(text) => Some(text.to_string()),
        Err(e) if msg.is_string => {
            warn!(link = %id, "dropping non UTF-8 text frame: {e}");
            None
        }
        Err(_) => {
            debug!(link = %id, "dropping {} byte binary frame", msg.data.len());
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
