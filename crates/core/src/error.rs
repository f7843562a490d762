//! Fehlertypen fuer Barrio
//!
//! Gemeinsame Fehler der Basistypen. Die Fach-Crates definieren eigene
//! Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Fehler der Basistypen
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Ungueltige Peer-ID: {0}")]
    UngueltigePeerId(String),
}
