//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jede Nachricht belegt genau einen Text-Frame mit einem JSON-Umschlag:
//!
//! ```text
//! {"event": "client::ready", "data": {"nickname": "alice", "signal": {...}}}
//! ```
//!
//! Das Dekodieren laeuft zweistufig: zuerst wird der Umschlag gelesen, dann
//! anhand des Event-Namens der typisierte Inhalt. So lassen sich unbekannte
//! Events von kaputtem JSON unterscheiden.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::control::{
    ClientEvent, ServerEvent, CLIENT_ACCEPT_CALL, CLIENT_CALL_BUDDY, CLIENT_READY,
    SERVER_BUDDIES_LIST, SERVER_BUDDY_CALLING, SERVER_BUDDY_DISCONNECTED, SERVER_CALL_ACCEPTED,
    SERVER_CLIENT_ID_GENERATED, SERVER_NEW_BUDDY,
};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Nachrichtengroesse (1 MB)
pub const DEFAULT_MAX_NACHRICHT_BYTES: usize = 1024 * 1024;

const CLIENT_EVENTS: &[&str] = &[CLIENT_READY, CLIENT_CALL_BUDDY, CLIENT_ACCEPT_CALL];

const SERVER_EVENTS: &[&str] = &[
    SERVER_CLIENT_ID_GENERATED,
    SERVER_BUDDIES_LIST,
    SERVER_NEW_BUDDY,
    SERVER_BUDDY_DISCONNECTED,
    SERVER_BUDDY_CALLING,
    SERVER_CALL_ACCEPTED,
];

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Kodieren oder Dekodieren einer Nachricht
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Nachricht zu gross: {laenge} Bytes (Maximum: {max} Bytes)")]
    ZuGross { laenge: usize, max: usize },

    #[error("Ungueltiger Umschlag: {0}")]
    Umschlag(#[source] serde_json::Error),

    #[error("Unbekanntes Event: {0}")]
    UnbekanntesEvent(String),

    #[error("Ungueltige Daten fuer '{event}': {quelle}")]
    Daten {
        event: String,
        #[source]
        quelle: serde_json::Error,
    },

    #[error("JSON-Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Umschlag
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Umschlag {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// TextCodec
// ---------------------------------------------------------------------------

/// Codec fuer Text-Frames
///
/// Prueft die Groesse und bildet zwischen JSON-Text und typisierten
/// Events ab.
#[derive(Debug, Clone)]
pub struct TextCodec {
    max_nachricht_bytes: usize,
}

impl TextCodec {
    /// Erstellt einen neuen `TextCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_nachricht_bytes: DEFAULT_MAX_NACHRICHT_BYTES,
        }
    }

    /// Erstellt einen `TextCodec` mit benutzerdefinierter maximaler Groesse
    pub fn with_max_size(max_nachricht_bytes: usize) -> Self {
        Self { max_nachricht_bytes }
    }

    /// Dekodiert eine Peer-Nachricht
    ///
    /// # Fehler
    /// - `ZuGross` wenn der Text das Limit ueberschreitet
    /// - `Umschlag` bei kaputtem JSON oder fehlendem `event`
    /// - `UnbekanntesEvent` fuer Namen, die kein Client-Event sind
    /// - `Daten` wenn der Inhalt nicht zum Event passt
    pub fn client_event_dekodieren(&self, text: &str) -> Result<ClientEvent, ProtocolError> {
        self.dekodieren(text, CLIENT_EVENTS)
    }

    /// Dekodiert eine Relay-Nachricht (Gegenstueck fuer Clients und Tests)
    pub fn server_event_dekodieren(&self, text: &str) -> Result<ServerEvent, ProtocolError> {
        self.dekodieren(text, SERVER_EVENTS)
    }

    /// Kodiert eine Relay-Nachricht als JSON-Text
    pub fn server_event_kodieren(&self, event: &ServerEvent) -> Result<String, ProtocolError> {
        self.kodieren(event)
    }

    /// Kodiert eine Peer-Nachricht als JSON-Text
    pub fn client_event_kodieren(&self, event: &ClientEvent) -> Result<String, ProtocolError> {
        self.kodieren(event)
    }

    fn kodieren<T: Serialize>(&self, event: &T) -> Result<String, ProtocolError> {
        let text = serde_json::to_string(event).map_err(ProtocolError::Serialisierung)?;
        self.groesse_pruefen(text.len())?;
        Ok(text)
    }

    fn dekodieren<T: DeserializeOwned>(
        &self,
        text: &str,
        bekannte_events: &[&str],
    ) -> Result<T, ProtocolError> {
        self.groesse_pruefen(text.len())?;

        let umschlag: Umschlag = serde_json::from_str(text).map_err(ProtocolError::Umschlag)?;
        if !bekannte_events.contains(&umschlag.event.as_str()) {
            return Err(ProtocolError::UnbekanntesEvent(umschlag.event));
        }

        let event = umschlag.event;
        let neu_verpackt = serde_json::json!({ "event": event, "data": umschlag.data });
        serde_json::from_value(neu_verpackt)
            .map_err(|quelle| ProtocolError::Daten { event, quelle })
    }

    fn groesse_pruefen(&self, laenge: usize) -> Result<(), ProtocolError> {
        if laenge > self.max_nachricht_bytes {
            return Err(ProtocolError::ZuGross {
                laenge,
                max: self.max_nachricht_bytes,
            });
        }
        Ok(())
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
