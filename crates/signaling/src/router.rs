//! Call-Router – Weiterleitung von Anruf-Anfrage und Anruf-Annahme
//!
//! Zustandslos: pro Nachricht wird das Ziel einmal in der Registry
//! nachgeschlagen. Payloads werden weder geprueft noch veraendert.
//!
//! Ist das Ziel offline, wird die Nachricht verworfen. Der Absender erfaehrt
//! davon nichts, das Protokoll kennt keinen Rueckkanal fuer Zustellfehler.

use barrio_core::types::{PeerId, SignalPayload};
use barrio_protocol::{BuddyRef, ServerEvent};

use crate::broadcast::PeerTransport;
use crate::registry::PeerRegistry;

/// Ergebnis einer Weiterleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErgebnis {
    /// Nachricht wurde in die Queue des Ziels eingereiht
    Zugestellt,
    /// Ziel ist nicht (mehr) verbunden oder seine Queue nimmt nichts an
    ZielOffline,
}

/// Zustandsloser Anruf-Router
pub struct CallRouter;

impl CallRouter {
    /// Leitet eine Anruf-Anfrage als `buddy-calling` an das Ziel weiter
    pub fn anruf_weiterleiten<T: PeerTransport>(
        registry: &PeerRegistry,
        transport: &T,
        anrufer: BuddyRef,
        anrufer_signal: Option<SignalPayload>,
        ziel: &PeerId,
    ) -> RelayErgebnis {
        let anrufer_id = anrufer.id();
        let ergebnis = Self::zustellen(
            registry,
            transport,
            ziel,
            ServerEvent::BuddyCalling {
                buddy: anrufer,
                buddy_signal: anrufer_signal,
            },
        );
        tracing::debug!(
            anrufer = %anrufer_id,
            ziel = %ziel,
            ?ergebnis,
            "Anruf-Anfrage weitergeleitet",
        );
        ergebnis
    }

    /// Leitet eine Anruf-Annahme als `call-accepted` an den Anrufer zurueck
    pub fn annahme_weiterleiten<T: PeerTransport>(
        registry: &PeerRegistry,
        transport: &T,
        angerufener: BuddyRef,
        angerufener_signal: Option<SignalPayload>,
        urspruenglicher_anrufer: &PeerId,
    ) -> RelayErgebnis {
        let angerufener_id = angerufener.id();
        let ergebnis = Self::zustellen(
            registry,
            transport,
            urspruenglicher_anrufer,
            ServerEvent::CallAccepted {
                buddy: angerufener,
                buddy_signal: angerufener_signal,
            },
        );
        tracing::debug!(
            angerufener = %angerufener_id,
            anrufer = %urspruenglicher_anrufer,
            ?ergebnis,
            "Anruf-Annahme weitergeleitet"
        );
        ergebnis
    }

    fn zustellen<T: PeerTransport>(
        registry: &PeerRegistry,
        transport: &T,
        ziel: &PeerId,
        event: ServerEvent,
    ) -> RelayErgebnis {
        if registry.peer(ziel).is_none() {
            tracing::debug!(
                ziel = %ziel,
                event = event.name(),
                "Ziel offline – Nachricht verworfen",
            );
            return RelayErgebnis::ZielOffline;
        }

        if transport.an_peer_senden(ziel, event) {
            RelayErgebnis::Zugestellt
        } else {
            RelayErgebnis::ZielOffline
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
