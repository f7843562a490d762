//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `BARRIO_LOG_LEVEL`: Log-Level oder Filter-Direktive, Standard: info
//! - `BARRIO_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Die Umgebung hat Vorrang vor den Werten aus der Config-Datei.

use anyhow::{anyhow, Result};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Level
pub const ENV_LOG_LEVEL: &str = "BARRIO_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "BARRIO_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Menschenlesbar (Entwicklung)
    #[default]
    Text,
    /// Eine JSON-Zeile pro Event (Produktion)
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(anyhow!("Unbekanntes Log-Format: '{anderes}'")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `level` und `format` kommen aus der Config; `BARRIO_LOG_LEVEL` und
/// `BARRIO_LOG_FORMAT` ueberschreiben sie. Ein ungueltiger Filter faellt
/// auf `info` zurueck, ein ungueltiges Format auf `text`.
///
/// Schlaegt fehl, wenn bereits ein globaler Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<()> {
    let level = mit_override(std::env::var(ENV_LOG_LEVEL).ok(), level);
    let format = mit_override(std::env::var(ENV_LOG_FORMAT).ok(), format);

    let filter = filter_erstellen(&level);
    let format = format.parse::<LogFormat>().unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

/// Baut den Filter aus einer Direktive, Fallback: `info`
pub fn filter_erstellen(direktive: &str) -> EnvFilter {
    EnvFilter::try_new(direktive).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn mit_override(umgebung: Option<String>, konfiguriert: &str) -> String {
    match umgebung {
        Some(wert) if !wert.trim().is_empty() => wert,
        _ => konfiguriert.to_string(),
    }
}
