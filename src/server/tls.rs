//! Server-side mTLS setup (§6, §10.6): requires and verifies a client
//! certificate signed by the configured CA, minimum TLS 1.2, forced to 1.3
//! in production.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig as RustlsServerConfig};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::TlsConfig;
use crate::error::{CoreError, ErrorCode, InfraResultExt};

pub fn build_server_tls_config(tls: &TlsConfig) -> Result<Arc<RustlsServerConfig>, CoreError> {
    let cert_chain = load_certs(&tls.server_cert_path)?;
    let key = load_key(&tls.server_key_path)?;

    let mut roots = RootCertStore::empty();
    for cert in load_certs(&tls.ca_bundle_path)? {
        roots
            .add(cert)
            .map_err(anyhow::Error::from)
            .into_core(ErrorCode::Unknown, "failed to add CA certificate to trust store")?;
    }

    let client_verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to build client certificate verifier")?;

    let versions: &[&rustls::SupportedProtocolVersion] =
        if tls.production { &[&rustls::version::TLS13] } else { &[&rustls::version::TLS12, &rustls::version::TLS13] };

    let config = RustlsServerConfig::builder_with_protocol_versions(versions)
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(cert_chain, key)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, "failed to build server TLS config")?;

    Ok(Arc::new(config))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, CoreError> {
    let file = File::open(path).map_err(anyhow::Error::from).into_core(ErrorCode::Unknown, format!("failed to open {path}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, format!("failed to parse certificates in {path}"))
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>, CoreError> {
    let file = File::open(path).map_err(anyhow::Error::from).into_core(ErrorCode::Unknown, format!("failed to open {path}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(anyhow::Error::from)
        .into_core(ErrorCode::Unknown, format!("failed to parse private key in {path}"))?
        .ok_or_else(|| crate::error::ErrorBuilder::new(ErrorCode::Unknown, format!("no private key found in {path}")).build())
}
