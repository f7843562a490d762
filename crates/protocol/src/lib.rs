//! barrio-protocol – Nachrichten des Signaling-Relays
//!
//! Dieses Crate definiert alle Events, die zwischen Peer und Relay
//! ausgetauscht werden, sowie das JSON-Wire-Format der Text-Frames.

pub mod control;
pub mod wire;

pub use control::{
    AcceptCallRequest, BuddyDatensatz, BuddyRef, CallBuddyRequest, ClientEvent, PeerRecord,
    ReadyRequest, ServerEvent,
};
pub use wire::{ProtocolError, TextCodec};
