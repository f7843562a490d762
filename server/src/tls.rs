//! TLS-Setup fuer wss://
//!
//! Laedt Zertifikatskette und privaten Schluessel (PEM) und baut daraus
//! einen `TlsAcceptor`. Als Crypto-Provider wird fest `ring` verwendet.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;

/// Liest Zertifikat und Schluessel von der Platte
pub fn tls_acceptor_laden(zertifikat: &Path, schluessel: &Path) -> Result<TlsAcceptor> {
    let cert_pem = std::fs::read_to_string(zertifikat)
        .with_context(|| format!("TLS-Zertifikat '{}' nicht lesbar", zertifikat.display()))?;
    let key_pem = std::fs::read_to_string(schluessel)
        .with_context(|| format!("TLS-Schluessel '{}' nicht lesbar", schluessel.display()))?;

    let acceptor = tls_acceptor_aus_pem(&cert_pem, &key_pem)?;
    tracing::info!(zertifikat = %zertifikat.display(), "TLS-Zertifikat geladen");
    Ok(acceptor)
}

/// Baut einen `TlsAcceptor` aus PEM-Strings
pub fn tls_acceptor_aus_pem(cert_pem: &str, key_pem: &str) -> Result<TlsAcceptor> {
    let cert_chain = parse_certificates(cert_pem)?;
    let private_key = parse_private_key(key_pem)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("TLS-Protokollversionen nicht verfuegbar")?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .context("Zertifikat und Schluessel passen nicht zusammen")?;

    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}

fn parse_certificates(pem: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    let chain = certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .context("Zertifikat-Parsing fehlgeschlagen")?;
    if chain.is_empty() {
        return Err(anyhow!("Kein Zertifikat im PEM gefunden"));
    }
    Ok(chain)
}

fn parse_private_key(pem: &str) -> Result<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    private_key(&mut cursor)
        .context("Schluessel-Parsing fehlgeschlagen")?
        .ok_or_else(|| anyhow!("Kein privater Schluessel gefunden"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
