//! WebSocket-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task: optional TLS-Handshake,
//! dann WebSocket-Upgrade, dann `PeerConnection`.
//!
//! Ohne `TlsAcceptor` spricht der Relay unverschluesseltes `ws://`
//! (Entwicklungsmodus).

use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::WebSocketStream;

use crate::broadcast::{EventBroadcaster, PeerTransport};
use crate::connection::PeerConnection;
use crate::dispatcher::MessageDispatcher;
use crate::error::SignalingResult;

/// WebSocket-Signaling-Server
///
/// Akzeptiert Verbindungen in einer Loop, bis das Shutdown-Signal kommt.
pub struct SignalingServer<T: PeerTransport = EventBroadcaster> {
    dispatcher: MessageDispatcher<T>,
    tls_acceptor: Option<TlsAcceptor>,
}

impl<T: PeerTransport> SignalingServer<T> {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(dispatcher: MessageDispatcher<T>, tls_acceptor: Option<TlsAcceptor>) -> Self {
        Self {
            dispatcher,
            tls_acceptor,
        }
    }

    /// Bindet `bind_addr` und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(
        self,
        bind_addr: SocketAddr,
        shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        self.mit_listener_starten(listener, shutdown_rx).await
    }

    /// Akzeptiert Verbindungen auf einem bereits gebundenen Listener
    pub async fn mit_listener_starten(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = listener.local_addr()?;
        let ws_config = websocket_config(self.dispatcher.state().config.max_nachricht_bytes);

        tracing::info!(
            adresse = %lokale_addr,
            tls = self.tls_acceptor.is_some(),
            "Signaling-Server gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            tracing::debug!(remote = %remote_addr, "Verbindung akzeptiert");

                            let dispatcher = self.dispatcher.clone();
                            let tls_acceptor = self.tls_acceptor.clone();
                            let shutdown_rx = shutdown_rx.clone();

                            tokio::spawn(async move {
                                match tls_acceptor {
                                    Some(acceptor) => match acceptor.accept(stream).await {
                                        Ok(tls_stream) => {
                                            verbindung_bedienen(
                                                tls_stream,
                                                remote_addr,
                                                dispatcher,
                                                ws_config,
                                                shutdown_rx,
                                            ).await;
                                        }
                                        Err(e) => {
                                            tracing::warn!(
                                                remote = %remote_addr,
                                                fehler = %e,
                                                "TLS-Handshake fehlgeschlagen",
                                            );
                                        }
                                    },
                                    None => {
                                        verbindung_bedienen(
                                            stream,
                                            remote_addr,
                                            dispatcher,
                                            ws_config,
                                            shutdown_rx,
                                        ).await;
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Signaling-Server gestoppt");
        Ok(())
    }
}

/// WebSocket-Limits aus der Relay-Konfiguration
fn websocket_config(max_nachricht_bytes: usize) -> WebSocketConfig {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(max_nachricht_bytes);
    ws_config.max_frame_size = Some(max_nachricht_bytes);
    ws_config
}

async fn websocket_handshake<S>(
    stream: S,
    ws_config: WebSocketConfig,
) -> SignalingResult<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Ok(tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await?)
}

async fn verbindung_bedienen<S, T>(
    stream: S,
    remote_addr: SocketAddr,
    dispatcher: MessageDispatcher<T>,
    ws_config: WebSocketConfig,
    shutdown_rx: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    T: PeerTransport,
{
    match websocket_handshake(stream, ws_config).await {
        Ok(ws) => {
            PeerConnection::neu(dispatcher, remote_addr)
                .verarbeiten(ws, shutdown_rx)
                .await;
        }
        Err(e) => {
            tracing::warn!(
                remote = %remote_addr,
                fehler = %e,
                "WebSocket-Handshake fehlgeschlagen",
            );
        }
    }
}
