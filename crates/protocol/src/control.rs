//! Control-Protokoll (WebSocket)
//!
//! Definiert alle Nachrichten die zwischen Peer und Relay ausgetauscht
//! werden.
//!
//! ## Design
//! - Jede Nachricht ist ein JSON-Umschlag `{"event": <name>, "data": {...}}`
//! - Event-Namen sind nach Richtung gruppiert: `client::*` (Peer -> Relay)
//!   und `server::*` (Relay -> Peer)
//! - Signal-Payloads bleiben opak und werden unveraendert durchgereicht

use barrio_core::types::{PeerId, SignalPayload};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event-Namen
// ---------------------------------------------------------------------------

pub const CLIENT_READY: &str = "client::ready";
pub const CLIENT_CALL_BUDDY: &str = "client::call-buddy";
pub const CLIENT_ACCEPT_CALL: &str = "client::accept-call";

pub const SERVER_CLIENT_ID_GENERATED: &str = "server::client-id-generated";
pub const SERVER_BUDDIES_LIST: &str = "server::buddies-list";
pub const SERVER_NEW_BUDDY: &str = "server::new-buddy";
pub const SERVER_BUDDY_DISCONNECTED: &str = "server::buddy-disconnected";
pub const SERVER_BUDDY_CALLING: &str = "server::buddy-calling";
pub const SERVER_CALL_ACCEPTED: &str = "server::call-accepted";

// ---------------------------------------------------------------------------
// Peer-Datensatz
// ---------------------------------------------------------------------------

/// Eintrag eines verbundenen Peers ("Buddy")
///
/// Direkt nach dem Verbinden enthaelt der Datensatz nur die `id`. Nickname
/// und Signal werden gesetzt, sobald der Peer `client::ready` sendet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalPayload>,
}

impl PeerRecord {
    /// Erstellt einen anonymen Datensatz (nur Identitaet)
    pub fn neu(id: PeerId) -> Self {
        Self {
            id,
            nickname: None,
            signal: None,
        }
    }

    /// Prueft ob der Peer sich bereits angekuendigt hat
    pub fn ist_angekuendigt(&self) -> bool {
        self.nickname.is_some() || self.signal.is_some()
    }
}

/// Verweis auf einen Buddy in Anruf-Nachrichten
///
/// Clients senden hier entweder die nackte Identitaet oder ihren ganzen
/// Datensatz. Der Relay reicht die Form unveraendert weiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuddyRef {
    Id(PeerId),
    Record(BuddyDatensatz),
}

impl BuddyRef {
    /// Loest die Identitaet auf, unabhaengig von der Form
    pub fn id(&self) -> PeerId {
        match self {
            Self::Id(id) => *id,
            Self::Record(datensatz) => datensatz.id,
        }
    }
}

impl From<PeerId> for BuddyRef {
    fn from(id: PeerId) -> Self {
        Self::Id(id)
    }
}

impl From<PeerRecord> for BuddyRef {
    fn from(record: PeerRecord) -> Self {
        Self::Record(record.into())
    }
}

/// Buddy-Objekt aus einer Anruf-Nachricht
///
/// Nur die `id` wird gelesen; alle anderen Felder bleiben als rohes JSON
/// erhalten und gehen unveraendert an das Ziel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuddyDatensatz {
    pub id: PeerId,
    #[serde(flatten)]
    pub felder: serde_json::Map<String, serde_json::Value>,
}

impl From<PeerRecord> for BuddyDatensatz {
    fn from(record: PeerRecord) -> Self {
        let mut felder = serde_json::Map::new();
        if let Some(nickname) = record.nickname {
            felder.insert("nickname".into(), serde_json::Value::String(nickname));
        }
        if let Some(signal) = record.signal {
            felder.insert("signal".into(), signal.0);
        }
        Self {
            id: record.id,
            felder,
        }
    }
}

// ---------------------------------------------------------------------------
// Peer -> Relay
// ---------------------------------------------------------------------------

/// Ankuendigung nach dem Verbinden (Nickname + eigenes Signal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub signal: Option<SignalPayload>,
}

/// Anruf-Anfrage an einen anderen Buddy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBuddyRequest {
    /// Anrufer (Identitaet oder Datensatz, wird durchgereicht)
    pub caller: BuddyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_signal: Option<SignalPayload>,
    /// Ziel des Anrufs
    pub buddy_id: PeerId,
}

/// Annahme eines eingehenden Anrufs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCallRequest {
    /// Angerufener (Identitaet oder Datensatz, wird durchgereicht)
    pub callee: BuddyRef,
    /// Urspruenglicher Anrufer, an den die Annahme geht
    pub buddy: BuddyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee_signal: Option<SignalPayload>,
}

/// Alle Nachrichten die ein Peer an den Relay senden darf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "client::ready")]
    Ready(ReadyRequest),
    #[serde(rename = "client::call-buddy")]
    CallBuddy(CallBuddyRequest),
    #[serde(rename = "client::accept-call")]
    AcceptCall(AcceptCallRequest),
}

impl ClientEvent {
    /// Event-Name auf dem Draht
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => CLIENT_READY,
            Self::CallBuddy(_) => CLIENT_CALL_BUDDY,
            Self::AcceptCall(_) => CLIENT_ACCEPT_CALL,
        }
    }
}

// ---------------------------------------------------------------------------
// Relay -> Peer
// ---------------------------------------------------------------------------

/// Alle Nachrichten die der Relay an Peers sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Zugewiesene Identitaet (nur an den neuen Peer)
    #[serde(rename = "server::client-id-generated")]
    ClientIdGenerated { id: PeerId },

    /// Roster aller anderen Peers (nur an den neuen Peer)
    #[serde(rename = "server::buddies-list")]
    BuddiesList { buddies: Vec<PeerRecord> },

    /// Ein Peer hat sich angekuendigt (an alle anderen)
    #[serde(rename = "server::new-buddy")]
    NewBuddy { buddy: PeerRecord },

    /// Ein Peer ist gegangen (an alle verbleibenden)
    #[serde(rename = "server::buddy-disconnected")]
    BuddyDisconnected { buddy: PeerRecord },

    /// Eingehender Anruf (an das Ziel)
    #[serde(rename = "server::buddy-calling")]
    BuddyCalling {
        buddy: BuddyRef,
        #[serde(rename = "buddySignal", default, skip_serializing_if = "Option::is_none")]
        buddy_signal: Option<SignalPayload>,
    },

    /// Anruf wurde angenommen (an den urspruenglichen Anrufer)
    #[serde(rename = "server::call-accepted")]
    CallAccepted {
        buddy: BuddyRef,
        #[serde(rename = "buddySignal", default, skip_serializing_if = "Option::is_none")]
        buddy_signal: Option<SignalPayload>,
    },
}

impl ServerEvent {
    /// Event-Name auf dem Draht
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientIdGenerated { .. } => SERVER_CLIENT_ID_GENERATED,
            Self::BuddiesList { .. } => SERVER_BUDDIES_LIST,
            Self::NewBuddy { .. } => SERVER_NEW_BUDDY,
            Self::BuddyDisconnected { .. } => SERVER_BUDDY_DISCONNECTED,
            Self::BuddyCalling { .. } => SERVER_BUDDY_CALLING,
            Self::CallAccepted { .. } => SERVER_CALL_ACCEPTED,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
