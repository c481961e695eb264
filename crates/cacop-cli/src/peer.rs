//! Retrieval of the chain a subject presents during the TLS handshake.
//!
//! Certificate verification is disabled on purpose: revoked and expired
//! chains are exactly the ones that must still be retrievable.

use async_trait::async_trait;
use cacop::Certificate;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig};
use tokio_rustls::TlsConnector;
use tracing::debug;
use url::Url;

/// Why a subject's chain could not be retrieved
#[derive(Error, Debug)]
pub enum PeerError {
    /// The subject is not a usable https URL
    #[error("invalid subject URL {url}: {reason}")]
    InvalidSubject {
        /// Subject as supplied
        url: String,
        /// What is wrong with it
        reason: String,
    },

    /// TCP connect or TLS handshake failed
    #[error("could not retrieve certificate chain from {url}: {reason}")]
    Handshake {
        /// Subject as supplied
        url: String,
        /// Underlying error
        reason: String,
    },

    /// The subject completed the handshake without presenting certificates
    #[error("{0} presented no certificates")]
    NoCertificates(String),

    /// A presented certificate did not parse
    #[error("{url} presented an unparsable certificate: {source}")]
    Certificate {
        /// Subject as supplied
        url: String,
        /// Parser error
        #[source]
        source: cacop::CacopError,
    },
}

/// Source of the certificate chain a subject presents, leaf first.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Retrieve the chain presented by `subject`
    async fn fetch(&self, subject: &str) -> Result<Vec<Certificate>, PeerError>;
}

/// [`ChainSource`] that performs a real TLS handshake.
#[derive(Clone)]
pub struct TlsChainSource {
    connector: TlsConnector,
    timeout: Duration,
}

impl TlsChainSource {
    /// Create a source whose connect plus handshake is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, rustls::Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::NoCertificateVerification))
            .with_no_client_auth();
        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
        })
    }
}

#[async_trait]
impl ChainSource for TlsChainSource {
    async fn fetch(&self, subject: &str) -> Result<Vec<Certificate>, PeerError> {
        let target = Target::parse(subject)?;
        let handshake_error = |reason: String| PeerError::Handshake {
            url: subject.to_string(),
            reason,
        };
        debug!(host = %target.host, port = target.port, "connecting to subject");

        let handshake = async {
            let stream = TcpStream::connect((target.host.as_str(), target.port)).await?;
            let tls = self.connector.connect(target.server_name.clone(), stream).await?;
            Ok::<_, std::io::Error>(tls)
        };
        let stream = timeout(self.timeout, handshake)
            .await
            .map_err(|_| handshake_error(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| handshake_error(e.to_string()))?;

        let (_, connection) = stream.get_ref();
        let presented = connection
            .peer_certificates()
            .filter(|certs| !certs.is_empty())
            .ok_or_else(|| PeerError::NoCertificates(subject.to_string()))?;

        let chain = presented
            .iter()
            .map(|der| Certificate::from_der(der.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| PeerError::Certificate {
                url: subject.to_string(),
                source,
            })?;
        debug!(subject, length = chain.len(), "retrieved presented chain");
        Ok(chain)
    }
}

/// Host, port and SNI name of a subject URL
#[derive(Debug)]
struct Target {
    host: String,
    port: u16,
    server_name: ServerName<'static>,
}

impl Target {
    /// Accepts `https://host[:port]/...` and bare `host[:port]`
    fn parse(subject: &str) -> Result<Self, PeerError> {
        let invalid = |reason: String| PeerError::InvalidSubject {
            url: subject.to_string(),
            reason,
        };

        let url = if subject.contains("://") {
            Url::parse(subject)
        } else {
            Url::parse(&format!("https://{subject}"))
        }
        .map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "https" {
            return Err(invalid(format!("scheme {} does not use TLS", url.scheme())));
        }

        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".into()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port_or_known_default().unwrap_or(443);
        let server_name = ServerName::try_from(host.clone()).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            host,
            port,
            server_name,
        })
    }
}

mod danger {
    use tokio_rustls::rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use tokio_rustls::rustls::{pki_types, DigitallySignedStruct, Error, SignatureScheme};

    /// Accepts any server certificate
    #[derive(Debug)]
    pub struct NoCertificateVerification;

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _: &pki_types::CertificateDer<'_>,
            _: &[pki_types::CertificateDer<'_>],
            _: &pki_types::ServerName<'_>,
            _: &[u8],
            _: pki_types::UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _: &[u8],
            _: &pki_types::CertificateDer<'_>,
            _: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _: &[u8],
            _: &pki_types::CertificateDer<'_>,
            _: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            vec![
                SignatureScheme::RSA_PKCS1_SHA1,
                SignatureScheme::ECDSA_SHA1_Legacy,
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::ECDSA_NISTP384_SHA384,
                SignatureScheme::RSA_PKCS1_SHA512,
                SignatureScheme::ECDSA_NISTP521_SHA512,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::RSA_PSS_SHA384,
                SignatureScheme::RSA_PSS_SHA512,
                SignatureScheme::ED25519,
                SignatureScheme::ED448,
            ]
        }
    }
}
