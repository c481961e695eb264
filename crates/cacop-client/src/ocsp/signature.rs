//! OCSP response signature checks.
//!
//! A response is trusted when it is signed by the issuer itself, or by a
//! certificate embedded in the response that the issuer signed and that
//! carries the id-kp-OCSPSigning extended key usage (RFC 6960 §4.2.2.2).

use cacop_core::{CacopError, Certificate, Result};
use der::Encode;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use super::asn1::BasicOcspResponse;

/// Verify that `basic` was signed by `issuer` or an authorized responder.
pub fn verify_response(basic: &BasicOcspResponse, tbs: &[u8], issuer: &Certificate) -> Result<()> {
    let signature = basic
        .signature
        .as_bytes()
        .ok_or_else(|| CacopError::OcspSignature("signature has unused bits".into()))?;
    let algorithm = basic.signature_algorithm.algorithm.to_string();

    if verify_with_key(&algorithm, issuer.public_key(), tbs, signature)? {
        return Ok(());
    }

    for embedded in basic.certs.iter().flatten() {
        let der = embedded.to_der().map_err(|e| CacopError::OcspDecode(e.to_string()))?;
        let Ok((_, responder)) = X509Certificate::from_der(&der) else {
            debug!("skipping unparseable responder certificate");
            continue;
        };
        if !is_authorized_responder(&responder, issuer) {
            debug!(responder = %responder.subject(), "responder certificate not authorized by issuer");
            continue;
        }
        let key = &responder.public_key().subject_public_key.data;
        if verify_with_key(&algorithm, key, tbs, signature)? {
            return Ok(());
        }
    }

    Err(CacopError::OcspSignature(
        "response is not signed by the issuer or an authorized responder".into(),
    ))
}

/// Signed by the issuer and allowed to sign OCSP responses.
fn is_authorized_responder(responder: &X509Certificate<'_>, issuer: &Certificate) -> bool {
    let Ok((_, issuer_x509)) = X509Certificate::from_der(issuer.der()) else {
        return false;
    };
    if responder.verify_signature(Some(issuer_x509.public_key())).is_err() {
        return false;
    }
    matches!(
        responder.extended_key_usage(),
        Ok(Some(eku)) if eku.value.ocsp_signing
    )
}

/// Returns `Ok(false)` when the signature does not verify under `public_key`.
fn verify_with_key(algorithm: &str, public_key: &[u8], message: &[u8], sig: &[u8]) -> Result<bool> {
    let candidates = algorithms_for(algorithm).ok_or_else(|| {
        CacopError::OcspSignature(format!("unsupported signature algorithm {algorithm}"))
    })?;
    Ok(candidates
        .iter()
        .any(|alg| UnparsedPublicKey::new(*alg, public_key).verify(message, sig).is_ok()))
}

/// Map a signature algorithm OID to the ring verifiers that may apply.
///
/// ECDSA OIDs name only the digest, so both curves are tried.
fn algorithms_for(oid: &str) -> Option<&'static [&'static dyn VerificationAlgorithm]> {
    static RSA_SHA1: [&dyn VerificationAlgorithm; 1] =
        [&signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY];
    static RSA_SHA256: [&dyn VerificationAlgorithm; 1] = [&signature::RSA_PKCS1_2048_8192_SHA256];
    static RSA_SHA384: [&dyn VerificationAlgorithm; 1] = [&signature::RSA_PKCS1_2048_8192_SHA384];
    static RSA_SHA512: [&dyn VerificationAlgorithm; 1] = [&signature::RSA_PKCS1_2048_8192_SHA512];
    static ECDSA_SHA256: [&dyn VerificationAlgorithm; 2] = [
        &signature::ECDSA_P256_SHA256_ASN1,
        &signature::ECDSA_P384_SHA256_ASN1,
    ];
    static ECDSA_SHA384: [&dyn VerificationAlgorithm; 2] = [
        &signature::ECDSA_P384_SHA384_ASN1,
        &signature::ECDSA_P256_SHA384_ASN1,
    ];
    static ED25519: [&dyn VerificationAlgorithm; 1] = [&signature::ED25519];

    let algorithms: &'static [&'static dyn VerificationAlgorithm] = match oid {
        "1.2.840.113549.1.1.5" => &RSA_SHA1,
        "1.2.840.113549.1.1.11" => &RSA_SHA256,
        "1.2.840.113549.1.1.12" => &RSA_SHA384,
        "1.2.840.113549.1.1.13" => &RSA_SHA512,
        "1.2.840.10045.4.3.2" => &ECDSA_SHA256,
        "1.2.840.10045.4.3.3" => &ECDSA_SHA384,
        "1.3.101.112" => &ED25519,
        _ => return None,
    };
    Some(algorithms)
}
