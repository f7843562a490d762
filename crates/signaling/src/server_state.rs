//! Gemeinsamer Relay-Zustand
//!
//! Haelt Konfiguration, Peer-Registry und Transport als eine Einheit, die
//! per `Arc` zwischen allen Verbindungs-Tasks geteilt wird.
//!
//! Die Registry liegt hinter genau einem Lock und ist nur fuer den
//! Dispatcher erreichbar; andere Komponenten sehen nie die rohe Map.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use barrio_protocol::wire::DEFAULT_MAX_NACHRICHT_BYTES;

use crate::broadcast::{EventBroadcaster, PeerTransport};
use crate::registry::PeerRegistry;

/// Konfiguration fuer den Signaling-Relay
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale Anzahl gleichzeitig verbundener Peers
    pub max_peers: usize,
    /// Intervall fuer WebSocket-Pings in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse einer einzelnen Nachricht
    pub max_nachricht_bytes: usize,
}

impl SignalingConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_sek)
    }

    pub fn verbindungs_timeout(&self) -> Duration {
        Duration::from_secs(self.verbindungs_timeout_sek)
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_peers: 512,
            keepalive_sek: 25,
            verbindungs_timeout_sek: 60,
            max_nachricht_bytes: DEFAULT_MAX_NACHRICHT_BYTES,
        }
    }
}

/// Gemeinsamer Relay-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState<T: PeerTransport = EventBroadcaster> {
    /// Relay-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Peer-Registry (einziger geteilter, veraenderlicher Zustand)
    pub(crate) registry: Mutex<PeerRegistry>,
    /// Zustellung an verbundene Peers
    pub transport: T,
    /// Startzeitpunkt (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl<T: PeerTransport> SignalingState<T> {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, transport: T) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            registry: Mutex::new(PeerRegistry::neu()),
            transport,
            start_time: Instant::now(),
        })
    }

    /// Anzahl der aktuell verbundenen Peers
    pub fn online_anzahl(&self) -> usize {
        self.registry.lock().anzahl()
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
