//! Test PKI built with `rcgen`.
//!
//! Shared with sibling crates through the `test-support` feature. Everything
//! here panics on failure; it only ever runs inside tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CrlDistributionPoint,
    CustomExtension, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyIdMethod,
    KeyPair, KeyUsagePurpose, RevokedCertParams, SerialNumber,
};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};

use crate::types::{Certificate, RevocationReason};

/// `ecdsa-with-SHA256`, the algorithm every generated key signs with
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";

const AUTHORITY_INFO_ACCESS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0x1000);

/// What to put into a generated certificate.
#[derive(Debug, Clone)]
pub struct CertSpec {
    common_name: String,
    is_ca: bool,
    ocsp: Vec<String>,
    crl: Vec<String>,
    serial: Option<u64>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    ocsp_signing: bool,
}

impl CertSpec {
    /// End-entity certificate valid from yesterday for a year
    pub fn leaf(common_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            common_name: common_name.into(),
            is_ca: false,
            ocsp: Vec::new(),
            crl: Vec::new(),
            serial: None,
            not_before: now - Duration::days(1),
            not_after: now + Duration::days(365),
            ocsp_signing: false,
        }
    }

    /// CA certificate valid from yesterday for a year
    pub fn ca(common_name: impl Into<String>) -> Self {
        Self {
            is_ca: true,
            ..Self::leaf(common_name)
        }
    }

    /// Add an OCSP responder to the AIA extension
    #[must_use]
    pub fn ocsp(mut self, url: impl Into<String>) -> Self {
        self.ocsp.push(url.into());
        self
    }

    /// Add a CRL distribution point
    #[must_use]
    pub fn crl(mut self, url: impl Into<String>) -> Self {
        self.crl.push(url.into());
        self
    }

    /// Fix the serial number
    #[must_use]
    pub const fn serial(mut self, serial: u64) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Set the validity window (second precision)
    #[must_use]
    pub const fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    /// Mark as a delegated OCSP responder
    #[must_use]
    pub const fn ocsp_signing(mut self) -> Self {
        self.ocsp_signing = true;
        self
    }

    fn params(&self) -> CertificateParams {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.common_name.as_str());
        params.distinguished_name = dn;

        if self.is_ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            params.key_usages = vec![
                KeyUsagePurpose::KeyCertSign,
                KeyUsagePurpose::CrlSign,
                KeyUsagePurpose::DigitalSignature,
            ];
        } else {
            params.is_ca = IsCa::ExplicitNoCa;
            params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
            params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        }
        if self.ocsp_signing {
            params.extended_key_usages = vec![ExtendedKeyUsagePurpose::OcspSigning];
        }

        params.not_before = to_offset(self.not_before);
        params.not_after = to_offset(self.not_after);

        let serial = self
            .serial
            .unwrap_or_else(|| NEXT_SERIAL.fetch_add(1, Ordering::Relaxed));
        params.serial_number = Some(serial.into());

        if !self.ocsp.is_empty() {
            params.custom_extensions.push(CustomExtension::from_oid_content(
                AUTHORITY_INFO_ACCESS,
                aia_der(&self.ocsp),
            ));
        }
        if !self.crl.is_empty() {
            params.crl_distribution_points = vec![CrlDistributionPoint {
                uris: self.crl.clone(),
            }];
        }

        params
    }
}

/// A generated certificate together with its private key.
pub struct Issued {
    certificate: rcgen::Certificate,
    key: KeyPair,
}

impl Issued {
    /// Self-signed certificate
    pub fn self_signed(spec: &CertSpec) -> Self {
        let key = KeyPair::generate().expect("generate key");
        let certificate = spec.params().self_signed(&key).expect("self-sign");
        Self { certificate, key }
    }

    /// Certificate signed by `self`
    pub fn issue(&self, spec: CertSpec) -> Self {
        let key = KeyPair::generate().expect("generate key");
        let certificate = spec
            .params()
            .signed_by(&key, &self.certificate, &self.key)
            .expect("sign certificate");
        Self { certificate, key }
    }

    /// DER encoding
    pub fn der(&self) -> Vec<u8> {
        self.certificate.der().to_vec()
    }

    /// Canonical PEM encoding
    pub fn pem(&self) -> String {
        self.certificate.pem()
    }

    /// Parsed model
    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(self.certificate.der()).expect("parse generated certificate")
    }

    /// PKCS#8 DER of the private key
    pub fn key_pkcs8(&self) -> Vec<u8> {
        self.key.serialize_der()
    }

    /// ECDSA P-256/SHA-256 signature over `message` with this key
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let rng = SystemRandom::new();
        let pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.key.serialize_der(), &rng)
                .expect("load signing key");
        pair.sign(&rng, message)
            .expect("sign message")
            .as_ref()
            .to_vec()
    }

    /// DER CRL signed by this certificate listing `revoked` serials
    pub fn crl_der(&self, revoked: &[(u64, Option<RevocationReason>)]) -> Vec<u8> {
        self.crl(revoked).der().to_vec()
    }

    /// PEM CRL signed by this certificate listing `revoked` serials
    pub fn crl_pem(&self, revoked: &[(u64, Option<RevocationReason>)]) -> String {
        self.crl(revoked).pem().expect("encode CRL")
    }

    fn crl(&self, revoked: &[(u64, Option<RevocationReason>)]) -> rcgen::CertificateRevocationList {
        let now = time::OffsetDateTime::now_utc();
        let revoked_certs = revoked
            .iter()
            .map(|(serial, reason)| RevokedCertParams {
                serial_number: SerialNumber::from(*serial),
                revocation_time: now - time::Duration::hours(1),
                reason_code: reason.map(to_rcgen_reason),
                invalidity_date: None,
            })
            .collect();

        CertificateRevocationListParams {
            this_update: now - time::Duration::hours(1),
            next_update: now + time::Duration::days(1),
            crl_number: SerialNumber::from(1u64),
            issuing_distribution_point: None,
            revoked_certs,
            key_identifier_method: KeyIdMethod::Sha256,
        }
        .signed_by(&self.certificate, &self.key)
        .expect("sign CRL")
    }
}

/// Root, intermediate and leaf.
pub struct TestPki {
    /// Self-signed root CA
    pub root: Issued,
    /// CA signed by the root
    pub intermediate: Issued,
    /// End-entity certificate signed by the intermediate
    pub leaf: Issued,
}

impl TestPki {
    /// Chain without revocation endpoints
    pub fn new() -> Self {
        Self::with_endpoints(Vec::new(), Vec::new())
    }

    /// Chain whose leaf advertises the given OCSP responders and CRLs
    pub fn with_endpoints(ocsp: Vec<String>, crl: Vec<String>) -> Self {
        let mut spec = CertSpec::leaf("leaf.example.test");
        spec.ocsp = ocsp;
        spec.crl = crl;
        Self::with_leaf(spec)
    }

    /// Chain with a custom leaf
    pub fn with_leaf(leaf: CertSpec) -> Self {
        let root = Issued::self_signed(&CertSpec::ca("Test Root CA"));
        let intermediate = root.issue(CertSpec::ca("Test Intermediate CA"));
        let leaf = intermediate.issue(leaf);
        Self {
            root,
            intermediate,
            leaf,
        }
    }

    /// Parsed `[leaf, intermediate, root]`
    pub fn chain(&self) -> Vec<Certificate> {
        vec![
            self.leaf.certificate(),
            self.intermediate.certificate(),
            self.root.certificate(),
        ]
    }
}

impl Default for TestPki {
    fn default() -> Self {
        Self::new()
    }
}

fn to_offset(t: DateTime<Utc>) -> time::OffsetDateTime {
    time::OffsetDateTime::from_unix_timestamp(t.timestamp()).expect("timestamp in range")
}

const fn to_rcgen_reason(reason: RevocationReason) -> rcgen::RevocationReason {
    match reason {
        RevocationReason::Unspecified => rcgen::RevocationReason::Unspecified,
        RevocationReason::KeyCompromise => rcgen::RevocationReason::KeyCompromise,
        RevocationReason::CaCompromise => rcgen::RevocationReason::CaCompromise,
        RevocationReason::AffiliationChanged => rcgen::RevocationReason::AffiliationChanged,
        RevocationReason::Superseded => rcgen::RevocationReason::Superseded,
        RevocationReason::CessationOfOperation => rcgen::RevocationReason::CessationOfOperation,
        RevocationReason::CertificateHold => rcgen::RevocationReason::CertificateHold,
        RevocationReason::RemoveFromCrl => rcgen::RevocationReason::RemoveFromCrl,
        RevocationReason::PrivilegeWithdrawn => rcgen::RevocationReason::PrivilegeWithdrawn,
        RevocationReason::AaCompromise => rcgen::RevocationReason::AaCompromise,
    }
}

/// `AuthorityInfoAccessSyntax` with one id-ad-ocsp URI per responder.
fn aia_der(responders: &[String]) -> Vec<u8> {
    const ID_AD_OCSP: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01];

    let mut descriptions = Vec::new();
    for url in responders {
        let mut description = tlv(0x06, ID_AD_OCSP);
        description.extend(tlv(0x86, url.as_bytes()));
        descriptions.extend(tlv(0x30, &description));
    }
    tlv(0x30, &descriptions)
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(content);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use x509_parser::prelude::{CertificateRevocationList, FromDer};

    #[test]
    fn tlv_long_form_length() {
        let content = vec![0u8; 300];
        let encoded = tlv(0x04, &content);
        assert_eq!(&encoded[..4], &[0x04, 0x82, 0x01, 0x2c]);
        assert_eq!(encoded.len(), 304);
    }

    #[test]
    fn generated_crl_parses() {
        let pki = TestPki::new();
        let der = pki.intermediate.crl_der(&[(7, Some(RevocationReason::KeyCompromise))]);
        let (_, crl) = CertificateRevocationList::from_der(&der).unwrap();
        assert_eq!(crl.iter_revoked_certificates().count(), 1);
    }
}
