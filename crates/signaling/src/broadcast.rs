//! Event-Broadcaster – Zustellung von Events an verbundene Peers
//!
//! Der `EventBroadcaster` verwaltet die Send-Queues aller verbundenen Peers
//! und stellt die Zustell-Primitiven des Transport-Adapters bereit.
//!
//! ## Zustell-Primitiven
//! - An einen Peer: `an_peer_senden`
//! - An alle Peers: `an_alle_senden`
//! - An alle ausser einen: `an_alle_ausser_senden`
//!
//! Zustellung ist fire-and-forget: volle oder geschlossene Queues verwerfen
//! die Nachricht, es gibt weder Retry noch Rueckmeldung an den Absender.

use barrio_core::types::PeerId;
use barrio_protocol::ServerEvent;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Peer
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// PeerTransport
// ---------------------------------------------------------------------------

/// Zustell-Schnittstelle zwischen Relay-Kern und Transport
///
/// Der Kern formuliert nur die Absicht (an einen, an alle, an alle ausser
/// einem); wie die Nachricht auf die Leitung kommt, entscheidet die
/// Implementierung.
pub trait PeerTransport: Send + Sync + 'static {
    /// Meldet die Send-Queue eines neuen Peers an
    fn peer_anmelden(&self, peer_id: PeerId, tx: mpsc::Sender<ServerEvent>);

    /// Entfernt die Send-Queue eines Peers
    fn peer_abmelden(&self, peer_id: &PeerId);

    /// Sendet an genau einen Peer
    ///
    /// Gibt `true` zurueck wenn der Peer bekannt war und die Nachricht
    /// eingereiht wurde.
    fn an_peer_senden(&self, peer_id: &PeerId, event: ServerEvent) -> bool;

    /// Sendet an alle angemeldeten Peers, gibt die Anzahl zurueck
    fn an_alle_senden(&self, event: ServerEvent) -> usize;

    /// Sendet an alle angemeldeten Peers ausser einem
    fn an_alle_ausser_senden(&self, ausgeschlossen: &PeerId, event: ServerEvent) -> usize;
}

// ---------------------------------------------------------------------------
// PeerSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Peers
#[derive(Clone, Debug)]
pub struct PeerSender {
    pub peer_id: PeerId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl PeerSender {
    /// Sendet eine Nachricht nicht-blockierend an den Peer
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    peer = %self.peer_id,
                    event = event.name(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(peer = %self.peer_id, "Send-Queue geschlossen (Peer getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle verbundenen Peers
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    inner: Arc<DashMap<PeerId, PeerSender>>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self::default()
    }
}

impl PeerTransport for EventBroadcaster {
    fn peer_anmelden(&self, peer_id: PeerId, tx: mpsc::Sender<ServerEvent>) {
        self.inner.insert(peer_id, PeerSender { peer_id, tx });
        tracing::debug!(peer = %peer_id, "Peer im Broadcaster angemeldet");
    }

    fn peer_abmelden(&self, peer_id: &PeerId) {
        if self.inner.remove(peer_id).is_some() {
            tracing::debug!(peer = %peer_id, "Peer aus Broadcaster entfernt");
        }
    }

    fn an_peer_senden(&self, peer_id: &PeerId, event: ServerEvent) -> bool {
        match self.inner.get(peer_id) {
            Some(sender) => sender.senden(event),
            None => {
                tracing::debug!(
                    peer = %peer_id,
                    event = event.name(),
                    "Senden an unbekannten Peer",
                );
                false
            }
        }
    }

    fn an_alle_senden(&self, event: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.iter().for_each(|entry| {
            if entry.value().senden(event.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    fn an_alle_ausser_senden(&self, ausgeschlossen: &PeerId, event: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.iter().for_each(|entry| {
            if entry.key() == ausgeschlossen {
                return;
            }
            if entry.value().senden(event.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
