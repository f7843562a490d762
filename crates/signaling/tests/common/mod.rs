//! Gemeinsame Helfer fuer die Relay-Integration-Tests

#![allow(dead_code)]

use barrio_core::types::PeerId;
use barrio_protocol::{ClientEvent, PeerRecord, ServerEvent, TextCodec};
use barrio_signaling::{
    EventBroadcaster, MessageDispatcher, SignalingConfig, SignalingServer, SignalingState,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub const EMPFANGS_TIMEOUT: Duration = Duration::from_secs(5);
pub const STILLE: Duration = Duration::from_millis(200);

/// Test-Logging (mehrfacher Aufruf ist harmlos)
pub fn logging_initialisieren() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Laufender Relay auf einem freien Port
pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: Arc<SignalingState>,
    shutdown_tx: watch::Sender<bool>,
}

impl TestRelay {
    pub async fn starten(tls: Option<TlsAcceptor>) -> Self {
        Self::mit_config_starten(SignalingConfig::default(), tls).await
    }

    pub async fn mit_config_starten(config: SignalingConfig, tls: Option<TlsAcceptor>) -> Self {
        logging_initialisieren();
        let state = SignalingState::neu(config, EventBroadcaster::neu());
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Test-Listener konnte nicht gebunden werden");
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            let _ = SignalingServer::neu(dispatcher, tls)
                .mit_listener_starten(listener, shutdown_rx)
                .await;
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn stoppen(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wartet bis die Registry `anzahl` Peers haelt
    pub async fn warten_auf_anzahl(&self, anzahl: usize) {
        tokio::time::timeout(EMPFANGS_TIMEOUT, async {
            while self.state.online_anzahl() != anzahl {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Registry hat die erwartete Anzahl nicht erreicht");
    }
}

/// Test-Client ueber einer beliebigen (ggf. TLS-) Verbindung
pub struct TestPeer<S> {
    pub ws: WebSocketStream<S>,
    pub id: PeerId,
    pub roster: Vec<PeerRecord>,
    codec: TextCodec,
}

impl<S> TestPeer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Uebernimmt eine frische Verbindung und liest Identitaet und Roster
    pub async fn begruessen(ws: WebSocketStream<S>) -> Self {
        let mut peer = Self {
            ws,
            id: PeerId::default(),
            roster: Vec::new(),
            codec: TextCodec::new(),
        };

        match peer.empfangen().await {
            ServerEvent::ClientIdGenerated { id } => peer.id = id,
            anderes => panic!("client-id-generated erwartet, bekommen: {anderes:?}"),
        }
        match peer.empfangen().await {
            ServerEvent::BuddiesList { buddies } => peer.roster = buddies,
            anderes => panic!("buddies-list erwartet, bekommen: {anderes:?}"),
        }
        peer
    }

    pub async fn senden(&mut self, event: &ClientEvent) {
        let text = self.codec.client_event_kodieren(event).unwrap();
        self.ws.send(Message::Text(text)).await.unwrap();
    }

    pub async fn roh_senden(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string())).await.unwrap();
    }

    /// Naechstes Server-Event (Ping/Pong werden uebersprungen)
    pub async fn empfangen(&mut self) -> ServerEvent {
        loop {
            let frame = tokio::time::timeout(EMPFANGS_TIMEOUT, self.ws.next())
                .await
                .expect("Timeout beim Warten auf ein Event")
                .expect("Verbindung wurde geschlossen")
                .expect("Frame-Lesefehler");
            if let Message::Text(text) = frame {
                return self.codec.server_event_dekodieren(&text).unwrap();
            }
        }
    }

    /// Stellt sicher, dass in kurzer Zeit kein Text-Frame ankommt
    pub async fn nichts_empfangen(&mut self) {
        let ergebnis = tokio::time::timeout(STILLE, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Text(text))) => return Some(text),
                    Some(Ok(_)) => continue,
                    _ => return None,
                }
            }
        })
        .await;
        if let Ok(Some(text)) = ergebnis {
            panic!("Kein Event erwartet, bekommen: {text}");
        }
    }

    pub async fn schliessen(mut self) {
        let _ = self.ws.close(None).await;
    }
}
