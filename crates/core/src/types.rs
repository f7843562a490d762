//! Gemeinsame Identifikations- und Nutzdatentypen fuer Barrio
//!
//! IDs verwenden das Newtype-Pattern, damit Peer-Identitaeten nicht mit
//! beliebigen Strings verwechselt werden koennen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Eindeutige Identitaet einer Peer-Verbindung
///
/// Wird pro akzeptierter Verbindung neu erzeugt und nie wiederverwendet.
/// Auf dem Draht erscheint sie als nackter UUID-String.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub Uuid);

impl PeerId {
    /// Erstellt eine neue zufaellige PeerId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

impl std::str::FromStr for PeerId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let roh = s.strip_prefix("peer:").unwrap_or(s);
        Uuid::parse_str(roh)
            .map(Self)
            .map_err(|_| CoreError::UngueltigePeerId(s.to_string()))
    }
}

/// Opake Signalisierungsdaten (SDP/ICE) eines Peers
///
/// Der Relay interpretiert den Inhalt nie, er wird unveraendert
/// weitergereicht.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalPayload(pub serde_json::Value);

impl SignalPayload {
    pub fn new(wert: serde_json::Value) -> Self {
        Self(wert)
    }

    /// Gibt den rohen JSON-Wert zurueck
    pub fn als_json(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for SignalPayload {
    fn from(wert: serde_json::Value) -> Self {
        Self(wert)
    }
}
