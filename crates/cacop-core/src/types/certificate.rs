use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension};
use x509_parser::time::ASN1Time;

use crate::error::{CacopError, Result};
use crate::fingerprint::{sha256_fingerprint, Fingerprint};

/// id-ad-ocsp access method
const ACCESS_METHOD_OCSP: &str = "1.3.6.1.5.5.7.48.1";

/// A parsed X.509 certificate.
///
/// Owns its DER encoding and the fields the revocation and expiration checks
/// need. Immutable once parsed; checkers share it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    fingerprint: Fingerprint,
    is_ca: bool,
    common_name: String,
    subject: String,
    issuer: String,
    raw_subject: Vec<u8>,
    raw_issuer: Vec<u8>,
    public_key: Vec<u8>,
    spki: Vec<u8>,
    serial: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    ocsp_servers: Vec<String>,
    crl_distribution_points: Vec<String>,
}

impl Certificate {
    /// Parse a DER-encoded certificate, rejecting trailing bytes.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (cert, trailing) = Self::from_der_prefix(der)?;
        if trailing > 0 {
            return Err(CacopError::malformed_certificate(format!(
                "{trailing} trailing bytes after certificate"
            )));
        }
        Ok(cert)
    }

    /// Parse the first certificate in `der`, returning how many bytes follow it.
    pub fn from_der_prefix(der: &[u8]) -> Result<(Self, usize)> {
        let (rest, x509) =
            x509_parser::parse_x509_certificate(der).map_err(CacopError::malformed_certificate)?;
        let consumed = &der[..der.len() - rest.len()];
        Ok((Self::from_parsed(consumed, &x509)?, rest.len()))
    }

    fn from_parsed(der: &[u8], x509: &X509Certificate<'_>) -> Result<Self> {
        let is_ca = x509
            .basic_constraints()
            .map_err(CacopError::malformed_certificate)?
            .is_some_and(|bc| bc.value.ca);

        let common_name = x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string();

        let validity = x509.validity();
        let not_before = asn1_to_utc(validity.not_before)?;
        let not_after = asn1_to_utc(validity.not_after)?;

        let mut ocsp_servers = Vec::new();
        let mut crl_distribution_points = Vec::new();
        for ext in x509.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::AuthorityInfoAccess(aia) => {
                    for desc in &aia.accessdescs {
                        if desc.access_method.to_id_string() != ACCESS_METHOD_OCSP {
                            continue;
                        }
                        if let GeneralName::URI(uri) = &desc.access_location {
                            ocsp_servers.push(uri.to_string());
                        }
                    }
                }
                ParsedExtension::CRLDistributionPoints(cdp) => {
                    for point in &cdp.points {
                        if let Some(DistributionPointName::FullName(names)) =
                            &point.distribution_point
                        {
                            for name in names {
                                if let GeneralName::URI(uri) = name {
                                    crl_distribution_points.push(uri.to_string());
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let spki = x509.public_key();

        Ok(Self {
            der: der.to_vec(),
            fingerprint: sha256_fingerprint(der),
            is_ca,
            common_name,
            subject: x509.subject().to_string(),
            issuer: x509.issuer().to_string(),
            raw_subject: x509.subject().as_raw().to_vec(),
            raw_issuer: x509.issuer().as_raw().to_vec(),
            public_key: spki.subject_public_key.data.to_vec(),
            spki: spki.raw.to_vec(),
            serial: x509.raw_serial().to_vec(),
            not_before,
            not_after,
            ocsp_servers,
            crl_distribution_points,
        })
    }

    /// Raw DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// SHA-256 of the DER encoding, lowercase hex
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether basicConstraints marks this certificate as a CA
    #[must_use]
    pub const fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// First subject common name, empty when absent
    #[must_use]
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Subject distinguished name (human-readable)
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name (human-readable)
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// DER encoding of the subject name
    #[must_use]
    pub fn raw_subject(&self) -> &[u8] {
        &self.raw_subject
    }

    /// DER encoding of the issuer name
    #[must_use]
    pub fn raw_issuer(&self) -> &[u8] {
        &self.raw_issuer
    }

    /// Contents of the subjectPublicKey BIT STRING
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// DER encoding of the SubjectPublicKeyInfo
    #[must_use]
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }

    /// Serial number as the raw INTEGER content bytes
    #[must_use]
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// Serial number as colon-free lowercase hex with leading zero bytes removed
    #[must_use]
    pub fn serial_hex(&self) -> String {
        let start = self
            .serial
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(self.serial.len().saturating_sub(1));
        hex::encode(&self.serial[start..])
    }

    /// Start of the validity window
    #[must_use]
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity window
    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// OCSP responder URIs from the Authority Information Access extension
    #[must_use]
    pub fn ocsp_servers(&self) -> &[String] {
        &self.ocsp_servers
    }

    /// Full-name URIs from the CRL Distribution Points extension
    #[must_use]
    pub fn crl_distribution_points(&self) -> &[String] {
        &self.crl_distribution_points
    }

    /// Returns true if subject and issuer names are identical
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.raw_subject == self.raw_issuer
    }
}

impl Serialize for Certificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        CertificateSummary::from(self).serialize(serializer)
    }
}

/// Serializable view of a [`Certificate`].
#[derive(Debug, Clone, Serialize)]
pub struct CertificateSummary<'a> {
    /// SHA-256 fingerprint (hex)
    pub fingerprint: &'a str,
    /// Subject common name
    pub common_name: &'a str,
    /// Subject distinguished name
    pub subject: &'a str,
    /// Issuer distinguished name
    pub issuer: &'a str,
    /// Serial number (hex)
    pub serial: String,
    /// CA flag from basicConstraints
    pub is_ca: bool,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// OCSP responders
    pub ocsp_servers: &'a [String],
    /// CRL distribution points
    pub crl_distribution_points: &'a [String],
}

impl<'a> From<&'a Certificate> for CertificateSummary<'a> {
    fn from(cert: &'a Certificate) -> Self {
        Self {
            fingerprint: cert.fingerprint(),
            common_name: cert.common_name(),
            subject: cert.subject(),
            issuer: cert.issuer(),
            serial: cert.serial_hex(),
            is_ca: cert.is_ca(),
            not_before: cert.not_before(),
            not_after: cert.not_after(),
            ocsp_servers: cert.ocsp_servers(),
            crl_distribution_points: cert.crl_distribution_points(),
        }
    }
}

/// Convert an ASN.1 `GeneralizedTime` / `UTCTime` to `DateTime<Utc>`.
fn asn1_to_utc(t: ASN1Time) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .ok_or_else(|| CacopError::malformed_certificate(format!("validity time {t} out of range")))
}
