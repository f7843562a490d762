//! barrio-signaling – WebSocket-Relay fuer WebRTC-Signaling
//!
//! Dieser Crate implementiert den Rendezvous-Dienst von Barrio. Peers
//! verbinden sich per WebSocket, bekommen eine Identitaet, sehen wer sonst
//! online ist und tauschen Anruf-Anfragen und Anruf-Annahmen aus. Die
//! Signal-Payloads (SDP, ICE) reicht der Relay unveraendert durch.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (SignalingServer, optional TLS)
//!     |
//!     v
//! PeerConnection (pro Verbindung ein Task)
//!     |  Verbunden (anonym) -> Angekuendigt -> Getrennt
//!     |
//!     v
//! MessageDispatcher (einziger Schreiber, ein Lock)
//!     |
//!     +-- PeerRegistry   (wer ist online, mit Nickname und Signal)
//!     +-- presence       (client-id, buddies-list, new-buddy, buddy-disconnected)
//!     +-- CallRouter     (buddy-calling, call-accepted)
//!
//! EventBroadcaster – Zustellung ueber die Send-Queues der Peers
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod presence;
pub mod registry;
pub mod router;
pub mod server_state;

// Bequeme Re-Exporte
pub use broadcast::{EventBroadcaster, PeerTransport};
pub use connection::PeerConnection;
pub use dispatcher::{DispatchErgebnis, MessageDispatcher, PeerBefehl};
pub use error::{SignalingError, SignalingResult};
pub use listener::SignalingServer;
pub use registry::PeerRegistry;
pub use router::{CallRouter, RelayErgebnis};
pub use server_state::{SignalingConfig, SignalingState};
