//! TLS client configuration.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};

/// TLS behaviour shared by implicit TLS and STARTTLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlsOptions {
    /// Accept self-signed, expired or mismatched server certificates.
    ///
    /// Off by default. Only for servers that cannot present a valid chain.
    pub accept_invalid_certs: bool,
}

impl TlsOptions {
    /// Options that skip certificate verification.
    #[must_use]
    pub const fn insecure() -> Self {
        Self {
            accept_invalid_certs: true,
        }
    }
}

/// Creates a TLS connector trusting the webpki root certificates.
///
/// # Errors
///
/// Returns an error if no crypto provider is available.
pub fn create_tls_connector(options: TlsOptions) -> Result<TlsConnector> {
    let config = if options.accept_invalid_certs {
        let provider = CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
        ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert { provider }))
            .with_no_client_auth()
    } else {
        let root_store = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Converts a hostname into the name presented for SNI and verification.
///
/// # Errors
///
/// Returns an error if the hostname is neither a DNS name nor an IP address.
pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|_| Error::Tls(format!("Invalid hostname: {host}")))
}

/// Skips chain and hostname checks but still verifies handshake signatures.
#[derive(Debug)]
struct AcceptAnyCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_on_by_default() {
        assert!(!TlsOptions::default().accept_invalid_certs);
        assert!(TlsOptions::insecure().accept_invalid_certs);
    }

    #[test]
    fn test_create_tls_connector() {
        assert!(create_tls_connector(TlsOptions::default()).is_ok());
        assert!(create_tls_connector(TlsOptions::insecure()).is_ok());
    }

    #[test]
    fn test_server_name() {
        assert!(server_name("smtp.example.com").is_ok());
        assert!(server_name("192.0.2.1").is_ok());
        assert!(server_name("not a host").is_err());
    }
}
