//! Client identity extraction from the mTLS handshake (§6): SAN (URI/DNS)
//! first, falling back to CN, attached to the request as `clientIdentity`.

use rustls_pki_types::CertificateDer;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;

#[derive(Debug, Clone)]
pub struct ClientIdentity(pub String);

pub fn extract_client_identity(cert: &CertificateDer<'_>) -> Option<ClientIdentity> {
    let (_, parsed) = x509_parser::certificate::X509Certificate::from_der(cert.as_ref()).ok()?;

    if let Ok(Some(san)) = parsed.subject_alternative_name() {
        for name in &san.value.general_names {
            match name {
                GeneralName::URI(uri) => return Some(ClientIdentity(uri.to_string())),
                GeneralName::DNSName(dns) => return Some(ClientIdentity(dns.to_string())),
                _ => continue,
            }
        }
    }

    parsed.subject().iter_common_name().next().and_then(|cn| cn.as_str().ok()).map(|cn| ClientIdentity(cn.to_string()))
}
