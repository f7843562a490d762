//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Relay ohne Konfigurationsdatei
//! lauffaehig ist. Die Umgebungsvariable `PORT` ueberschreibt den Port.

use anyhow::{bail, Context};
use barrio_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Umgebungsvariable fuer den Listen-Port
pub const ENV_PORT: &str = "PORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// TLS-Einstellungen (wss://)
    pub tls: TlsEinstellungen,
    /// Relay-Einstellungen
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den WebSocket-Listener
    pub bind_adresse: String,
    /// Listen-Port
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// TLS-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsEinstellungen {
    /// `false` = unverschluesseltes ws:// (nur Entwicklung)
    pub aktiviert: bool,
    /// Zertifikatskette im PEM-Format
    pub zertifikat: String,
    /// Privater Schluessel im PEM-Format
    pub schluessel: String,
}

impl Default for TlsEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            zertifikat: "./cert/server-cert.crt".into(),
            schluessel: "./cert/server-key.pem".into(),
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Maximale Anzahl gleichzeitig verbundener Peers
    pub max_peers: usize,
    /// Ping-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Trennung nach so vielen Sekunden ohne Frame
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse einer Nachricht in Bytes
    pub max_nachricht_bytes: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            max_peers: standard.max_peers,
            keepalive_sek: standard.keepalive_sek,
            verbindungs_timeout_sek: standard.verbindungs_timeout_sek,
            max_nachricht_bytes: standard.max_nachricht_bytes,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder Filter-Direktive, z.B. "info" oder "barrio_signaling=debug"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    /// `PORT` aus der Umgebung hat Vorrang vor der Datei.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        config.port_ueberschreiben(std::env::var(ENV_PORT).ok().as_deref())?;
        config.validieren()?;
        Ok(config)
    }

    /// Parst eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(inhalt)?)
    }

    /// Uebernimmt einen Port aus der Umgebung (falls gesetzt)
    pub fn port_ueberschreiben(&mut self, wert: Option<&str>) -> anyhow::Result<()> {
        if let Some(wert) = wert.map(str::trim).filter(|w| !w.is_empty()) {
            self.netzwerk.port = wert
                .parse()
                .with_context(|| format!("Ungueltiger Wert fuer {ENV_PORT}: '{wert}'"))?;
        }
        Ok(())
    }

    /// Prueft Werte, die Serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        let s = &self.signaling;
        if s.max_peers == 0 {
            bail!("signaling.max_peers muss groesser als 0 sein");
        }
        if s.keepalive_sek == 0 {
            bail!("signaling.keepalive_sek muss groesser als 0 sein");
        }
        if s.verbindungs_timeout_sek <= s.keepalive_sek {
            bail!(
                "signaling.verbindungs_timeout_sek ({}) muss groesser als keepalive_sek ({}) sein",
                s.verbindungs_timeout_sek,
                s.keepalive_sek
            );
        }
        if s.max_nachricht_bytes == 0 {
            bail!("signaling.max_nachricht_bytes muss groesser als 0 sein");
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse des Listeners zurueck
    pub fn bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{adresse}'"))
    }

    /// Relay-Konfiguration fuer barrio-signaling
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_peers: self.signaling.max_peers,
            keepalive_sek: self.signaling.keepalive_sek,
            verbindungs_timeout_sek: self.signaling.verbindungs_timeout_sek,
            max_nachricht_bytes: self.signaling.max_nachricht_bytes,
        }
    }
}
