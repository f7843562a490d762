//! Peer-Registry – Wer ist gerade online?
//!
//! Die Registry ist die einzige Quelle der Wahrheit ueber verbundene Peers.
//! Sie haelt reinen In-Memory-Zustand ohne I/O und ohne eigene
//! Synchronisation; der `MessageDispatcher` besitzt sie hinter genau einem
//! Lock.
//!
//! ## Lebenszyklus eines Eintrags
//! ```text
//! verbinden        -> { id }                       (anonym)
//! ankuendigen      -> { id, nickname, signal }     (angekuendigt)
//! trennen          -> entfernt                     (terminal)
//! ```
//! Andere Mutationspfade gibt es nicht.

use barrio_core::types::{PeerId, SignalPayload};
use barrio_protocol::PeerRecord;
use std::collections::HashMap;

use crate::error::{SignalingError, SignalingResult};

/// In-Memory-Verzeichnis aller offenen Verbindungen
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, PeerRecord>,
}

impl PeerRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen anonymen Eintrag fuer eine neue Verbindung an
    ///
    /// Schlaegt nur fehl wenn die Identitaet bereits vergeben ist. Der
    /// bestehende Eintrag bleibt in diesem Fall unangetastet.
    pub fn verbinden(&mut self, id: PeerId) -> SignalingResult<PeerRecord> {
        if self.peers.contains_key(&id) {
            return Err(SignalingError::DoppelteIdentitaet(id));
        }
        let record = PeerRecord::neu(id);
        self.peers.insert(id, record.clone());
        Ok(record)
    }

    /// Uebernimmt Nickname und Signal in den bestehenden Eintrag
    ///
    /// Die `id` bleibt erhalten. Fuer einen bereits getrennten Peer ist das
    /// ein No-Op mit `PeerUnbekannt`.
    pub fn ankuendigen(
        &mut self,
        id: &PeerId,
        nickname: Option<String>,
        signal: Option<SignalPayload>,
    ) -> SignalingResult<PeerRecord> {
        let record = self
            .peers
            .get_mut(id)
            .ok_or(SignalingError::PeerUnbekannt(*id))?;
        if record.ist_angekuendigt() {
            tracing::debug!(peer = %id, "Erneute Ankuendigung – Datensatz wird ersetzt");
        }
        record.nickname = nickname;
        record.signal = signal;
        Ok(record.clone())
    }

    /// Entfernt den Eintrag und gibt den letzten Stand zurueck
    ///
    /// Idempotent: ein zweiter Aufruf liefert `None`.
    pub fn trennen(&mut self, id: &PeerId) -> Option<PeerRecord> {
        self.peers.remove(id)
    }

    /// Snapshot aller Eintraege ausser dem ausgeschlossenen
    pub fn andere_auflisten(&self, ausgeschlossen: &PeerId) -> Vec<PeerRecord> {
        self.peers
            .values()
            .filter(|record| &record.id != ausgeschlossen)
            .cloned()
            .collect()
    }

    /// Lesender Zugriff fuer das Routing
    pub fn peer(&self, id: &PeerId) -> Option<PeerRecord> {
        self.peers.get(id).cloned()
    }

    /// Prueft ob ein Peer online ist
    pub fn ist_online(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Anzahl der verbundenen Peers
    pub fn anzahl(&self) -> usize {
        self.peers.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
