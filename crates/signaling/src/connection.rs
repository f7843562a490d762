//! Peer-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `PeerConnection` in einem eigenen
//! tokio-Task. Sie vergibt die Identitaet, liest Text-Frames, dispatcht sie
//! und schreibt die Events aus der Send-Queue des Peers zurueck.
//!
//! ## Zustaende (aus Sicht des Relays)
//! ```text
//! Verbunden (anonym) -> Angekuendigt (nickname, signal) -> Getrennt
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Kommt innerhalb von `verbindungs_timeout_sek` nichts an, wird getrennt
//! - Ein Timeout ist eine gewoehnliche Trennung

use barrio_core::types::PeerId;
use barrio_protocol::{ServerEvent, TextCodec};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::broadcast::{EventBroadcaster, PeerTransport, SEND_QUEUE_GROESSE};
use crate::dispatcher::{DispatchErgebnis, MessageDispatcher};
use crate::error::SignalingResult;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct PeerConnection<T: PeerTransport = EventBroadcaster> {
    dispatcher: MessageDispatcher<T>,
    remote_addr: SocketAddr,
}

impl<T: PeerTransport> PeerConnection<T> {
    /// Erstellt eine neue PeerConnection
    pub fn neu(dispatcher: MessageDispatcher<T>, remote_addr: SocketAddr) -> Self {
        Self {
            dispatcher,
            remote_addr,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Peer trennt, der Keepalive-Timeout greift oder ein
    /// Shutdown-Signal eingeht. Danach wird der Peer in jedem Fall aus der
    /// Registry entfernt.
    pub async fn verarbeiten<S>(
        self,
        ws: WebSocketStream<S>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let remote = self.remote_addr;
        let config = self.dispatcher.state().config.clone();
        let keepalive_intervall = config.keepalive();
        let timeout_dauer = config.verbindungs_timeout();
        let codec = TextCodec::with_max_size(config.max_nachricht_bytes);

        let (mut schreiber, mut leser) = ws.split();

        // Ausgehende Nachrichten-Queue (Broadcaster -> WebSocket)
        let (sende_tx, mut sende_rx) = mpsc::channel::<ServerEvent>(SEND_QUEUE_GROESSE);

        let peer_id = PeerId::new();
        if let Err(e) = self.dispatcher.verbinden(peer_id, sende_tx) {
            tracing::debug!(remote = %remote, fehler = %e, "Verbindung abgelehnt");
            let _ = schreiber.send(Message::Close(None)).await;
            return;
        }

        tracing::info!(remote = %remote, peer = %peer_id, "Neue Peer-Verbindung");

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_id, "Verbindungs-Timeout");
                break;
            }

            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehender Frame vom Peer
                frame = leser.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            if let Err(e) = self.text_verarbeiten(peer_id, &codec, &text) {
                                tracing::warn!(peer = %peer_id, fehler = %e, "Nachricht verworfen");
                            }
                        }
                        Some(Ok(Message::Binary(daten))) => {
                            letzter_empfang = Instant::now();
                            tracing::warn!(
                                peer = %peer_id,
                                bytes = daten.len(),
                                "Binaer-Frame nicht unterstuetzt – verworfen"
                            );
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(peer = %peer_id, "Verbindung vom Peer getrennt");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong halten die Verbindung am Leben
                            letzter_empfang = Instant::now();
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_id, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehendes Event aus dem Broadcaster
                Some(event) = sende_rx.recv() => {
                    let text = match codec.server_event_kodieren(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(
                                peer = %peer_id,
                                event = event.name(),
                                fehler = %e,
                                "Event nicht kodierbar",
                            );
                            continue;
                        }
                    };
                    if let Err(e) = schreiber.send(Message::Text(text)).await {
                        tracing::warn!(peer = %peer_id, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if Instant::now() >= naechster_ping {
                        if let Err(e) = schreiber.send(Message::Ping(Vec::new())).await {
                            tracing::warn!(
                                peer = %peer_id,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen",
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(
                            peer = %peer_id,
                            "Shutdown-Signal – Verbindung wird getrennt",
                        );
                        let _ = schreiber.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        self.dispatcher.trennen(peer_id);
        let _ = schreiber.close().await;

        tracing::info!(peer = %peer_id, "Verbindungs-Task beendet");
    }

    fn text_verarbeiten(
        &self,
        peer_id: PeerId,
        codec: &TextCodec,
        text: &str,
    ) -> SignalingResult<DispatchErgebnis> {
        let event = codec.client_event_dekodieren(text)?;
        Ok(self.dispatcher.dispatch(peer_id, event))
    }
}
