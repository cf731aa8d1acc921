//! TLS acceptor construction.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use anyhow::Context;
use rustls::pki_types::CertificateDer;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;

use crate::config::TlsConfig;

/// Builds a TLS acceptor from PEM-encoded certificate chain and
/// private key files.
///
/// # Errors
///
/// Returns an error if the files cannot be read, contain no usable
/// material, or the certificate/key pair is rejected.
pub fn acceptor(config: &TlsConfig) -> anyhow::Result<TlsAcceptor> {
    let mut cert_reader = BufReader::new(
        File::open(&config.cert)
            .with_context(|| format!("opening certificate file {}", config.cert.display()))?,
    );
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<_, _>>()
        .with_context(|| format!("parsing certificate file {}", config.cert.display()))?;
    anyhow::ensure!(
        !certs.is_empty(),
        "no certificates found in {}",
        config.cert.display()
    );

    let mut key_reader = BufReader::new(
        File::open(&config.key)
            .with_context(|| format!("opening key file {}", config.key.display()))?,
    );
    let key = rustls_pemfile::private_key(&mut key_reader)
        .with_context(|| format!("parsing key file {}", config.key.display()))?
        .ok_or_else(|| anyhow::anyhow!("no private key found in {}", config.key.display()))?;

    let server_config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("building TLS server configuration")?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}
