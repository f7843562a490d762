//! barrio-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer das Binary bereit.

pub mod config;
pub mod tls;

use anyhow::{Context, Result};
use barrio_signaling::{EventBroadcaster, MessageDispatcher, SignalingServer, SignalingState};
use config::ServerConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Wie lange beim Shutdown auf das Schliessen der Verbindungen gewartet wird
const SHUTDOWN_FRIST: Duration = Duration::from_secs(5);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Relay und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. TLS-Zertifikat laden (falls aktiviert)
    /// 2. WebSocket-Listener binden
    /// 3. Auf Ctrl-C warten
    /// 4. Alle Verbindungen schliessen, Peers sauber abmelden
    pub async fn starten(self) -> Result<()> {
        let bind_adresse = self.config.bind_adresse()?;

        let tls_acceptor = if self.config.tls.aktiviert {
            Some(tls::tls_acceptor_laden(
                Path::new(&self.config.tls.zertifikat),
                Path::new(&self.config.tls.schluessel),
            )?)
        } else {
            tracing::warn!("TLS deaktiviert – Relay spricht unverschluesseltes ws://");
            None
        };

        let state = SignalingState::neu(self.config.signaling_config(), EventBroadcaster::neu());
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));

        let listener = TcpListener::bind(bind_adresse)
            .await
            .with_context(|| format!("Listener auf {bind_adresse} konnte nicht gebunden werden"))?;

        tracing::info!(
            adresse = %bind_adresse,
            tls = tls_acceptor.is_some(),
            max_peers = state.config.max_peers,
            "Relay startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = SignalingServer::neu(dispatcher, tls_acceptor);
        let mut server_task = tokio::spawn(server.mit_listener_starten(listener, shutdown_rx));

        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Ctrl-C-Handler konnte nicht installiert werden")?;
                tracing::info!("Shutdown-Signal empfangen, Relay wird beendet");
            }
            ergebnis = &mut server_task => {
                // Listener endet nur bei Fehlern von selbst
                ergebnis.context("Listener-Task abgebrochen")??;
                return Ok(());
            }
        }

        let _ = shutdown_tx.send(true);
        server_task.await.context("Listener-Task abgebrochen")??;

        if tokio::time::timeout(SHUTDOWN_FRIST, verbindungen_abwarten(&state))
            .await
            .is_err()
        {
            tracing::warn!(
                verbleibend = state.online_anzahl(),
                "Shutdown-Frist abgelaufen, verbleibende Verbindungen werden verworfen"
            );
        }

        tracing::info!(uptime_sek = state.uptime_sek(), "Relay gestoppt");
        Ok(())
    }
}

async fn verbindungen_abwarten(state: &SignalingState) {
    while state.online_anzahl() > 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
