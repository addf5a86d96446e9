//! PeerJS signaling adapter.
//!
//! - [`protocol`] – the JSON frames exchanged with the server.
//! - [`client`] – [`PeerJsSignaling`], which keeps the WebSocket alive,
//!   reports its lifecycle as session events and routes negotiation traffic
//!   to the links in [`crate::infrastructure::channel`].

pub mod client;
pub mod protocol;

pub use client::{server_url, PeerJsSignaling};
