//! JSON frames of the PeerJS signaling protocol.
//!
//! Every frame is a JSON object whose `type` field names the message:
//!
//! ```text
//! server → client   OPEN, ID-TAKEN, INVALID-KEY, ERROR,
//!                   OFFER, ANSWER, CANDIDATE, LEAVE, EXPIRE, HEARTBEAT
//! client → server   OFFER, ANSWER, CANDIDATE, HEARTBEAT
//! ```
//!
//! Forwarded messages carry `src` (sender id) when coming from the server and
//! `dst` (recipient id) when sent by the client; the server fills in `src`.
//! Only data connections are handled; media offers are parsed and ignored.
//!
//! # Example frames
//!
//! ```json
//! {"type":"OPEN"}
//! {"type":"OFFER","src":"Bob","dst":"Alice","payload":{
//!     "sdp":{"type":"offer","sdp":"v=0..."},"type":"data",
//!     "connectionId":"dc_x7Kq2mP0aZ","label":"dc_x7Kq2mP0aZ",
//!     "reliable":true,"serialization":"json"}}
//! {"type":"CANDIDATE","dst":"Bob","payload":{
//!     "candidate":{"candidate":"candidate:1 1 udp ...","sdpMid":"0","sdpMLineIndex":0},
//!     "type":"data","connectionId":"dc_x7Kq2mP0aZ"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `payload.type` value for data connections.
pub const DATA_CONNECTION: &str = "data";

/// Identifies this client in offers and answers.
pub const BROWSER: &str = "peerchat";

/// Text of a heartbeat frame.
pub const HEARTBEAT_FRAME: &str = r#"{"type":"HEARTBEAT"}"#;

// ── Payload types ─────────────────────────────────────────────────────────────

/// An SDP offer or answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// `"offer"` or `"answer"`.
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: "answer".to_string(),
            sdp: sdp.into(),
        }
    }
}

/// A trickled ICE candidate in browser `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub sdp: SessionDescription,
    /// `"data"` or `"media"`.
    #[serde(rename = "type")]
    pub connection_type: String,
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub reliable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub sdp: SessionDescription,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePayload {
    pub candidate: IceCandidate,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub connection_id: String,
}

/// Human-readable error text attached to `ERROR` and friends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub msg: String,
}

// ── Frames ────────────────────────────────────────────────────────────────────

/// A frame received from the signaling server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ServerMessage {
    /// The registration was accepted.
    Open,
    /// Another peer already holds the requested id.
    IdTaken {
        #[serde(default)]
        payload: Option<ErrorPayload>,
    },
    /// The API key was rejected.
    InvalidKey {
        #[serde(default)]
        payload: Option<ErrorPayload>,
    },
    Error {
        #[serde(default)]
        payload: Option<ErrorPayload>,
    },
    Offer {
        src: String,
        payload: OfferPayload,
    },
    Answer {
        src: String,
        payload: AnswerPayload,
    },
    Candidate {
        src: String,
        payload: CandidatePayload,
    },
    /// The remote peer left the server.
    Leave { src: String },
    /// A message to `src` could not be delivered.
    Expire { src: String },
    Heartbeat,
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parses one text frame.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for frames that are not valid JSON or do
    /// not match any known shape.
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// A frame sent to the signaling server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ClientMessage {
    Heartbeat,
    Offer { dst: String, payload: OfferPayload },
    Answer { dst: String, payload: AnswerPayload },
    Candidate { dst: String, payload: CandidatePayload },
}

impl ClientMessage {
    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
