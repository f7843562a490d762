//! Presence-Broadcaster – Wer ist online? Bescheid geben.
//!
//! Leitet aus jedem Registry-Uebergang die passenden Benachrichtigungen ab
//! und uebergibt sie dem Transport. Haelt selbst keinen Zustand.
//!
//! | Uebergang   | Empfaenger          | Events                                  |
//! |-------------|---------------------|-----------------------------------------|
//! | Verbinden   | nur der neue Peer   | `client-id-generated`, `buddies-list`   |
//! | Ankuendigen | alle anderen        | `new-buddy`                             |
//! | Trennen     | alle verbleibenden  | `buddy-disconnected`                    |
//!
//! Die Funktionen laufen synchron im selben Schritt wie die Mutation, d.h.
//! unter dem Registry-Lock des Dispatchers.

use barrio_core::types::PeerId;
use barrio_protocol::{PeerRecord, ServerEvent};

use crate::broadcast::PeerTransport;

/// Neuer Peer: erst die Identitaet, dann den Roster-Snapshot
pub fn bei_verbindung<T: PeerTransport>(transport: &T, peer_id: PeerId, roster: Vec<PeerRecord>) {
    let anzahl = roster.len();
    transport.an_peer_senden(&peer_id, ServerEvent::ClientIdGenerated { id: peer_id });
    transport.an_peer_senden(&peer_id, ServerEvent::BuddiesList { buddies: roster });

    tracing::debug!(peer = %peer_id, roster = anzahl, "Identitaet und Buddy-Liste gesendet");
}

/// Angekuendigter Peer: vollstaendigen Datensatz an alle anderen
pub fn bei_ankuendigung<T: PeerTransport>(transport: &T, record: PeerRecord) -> usize {
    let peer_id = record.id;
    let empfaenger =
        transport.an_alle_ausser_senden(&peer_id, ServerEvent::NewBuddy { buddy: record });

    tracing::debug!(peer = %peer_id, empfaenger, "Neuer Buddy verkuendet");
    empfaenger
}

/// Getrennter Peer: letzten bekannten Datensatz an alle verbleibenden
///
/// Muss nach dem Abmelden des Peers beim Transport aufgerufen werden,
/// sonst erhielte der Gehende seine eigene Abmeldung.
pub fn bei_trennung<T: PeerTransport>(transport: &T, letzter_stand: PeerRecord) -> usize {
    let peer_id = letzter_stand.id;
    let empfaenger = transport.an_alle_senden(ServerEvent::BuddyDisconnected {
        buddy: letzter_stand,
    });

    tracing::debug!(peer = %peer_id, empfaenger, "Abmeldung verkuendet");
    empfaenger
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
