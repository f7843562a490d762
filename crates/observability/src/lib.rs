//! # barrio-observability
//!
//! Observability-Crate fuer Barrio:
//! - Structured Logging (Text oder JSON) via tracing-subscriber
//! - Log-Level und -Format per Config, ueberschreibbar per Umgebung

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat};
