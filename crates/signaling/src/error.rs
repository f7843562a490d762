//! Fehlertypen fuer den Signaling-Relay

use barrio_core::types::PeerId;
use barrio_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Relay
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Fehler (Handshake, Frame)
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Protokollfehler (ungueltiger Umschlag, unbekanntes Event)
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtocolError),

    /// Identitaet ist bereits registriert (Invariante verletzt)
    #[error("Peer-Identitaet bereits vergeben: {0}")]
    DoppelteIdentitaet(PeerId),

    /// Peer ist nicht (mehr) verbunden
    #[error("Peer nicht verbunden: {0}")]
    PeerUnbekannt(PeerId),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,
}

impl SignalingError {
    /// Veraltete Referenz auf einen bereits getrennten Peer
    ///
    /// Solche Fehler sind erwartbar (spaete Nachrichten nach Disconnect) und
    /// werden nur auf Debug-Level geloggt.
    pub fn ist_veraltet(&self) -> bool {
        matches!(self, Self::PeerUnbekannt(_))
    }
}

/// Result-Typ fuer den Signaling-Relay
pub type SignalingResult<T> = Result<T, SignalingError>;
