use cacop_core::{CacopError, Certificate, Result};
use der::asn1::{Null, OctetString, Uint};
use der::{Any, Encode};
use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use tracing::debug;

use super::asn1::{AlgorithmIdentifier, CertId, OcspRequest, Request, TbsRequest, ID_SHA1};

/// Build the `CertID` identifying `cert` as issued by `issuer`.
///
/// Hashes are SHA-1 over the issuer's DER subject name and over the contents
/// of its subjectPublicKey BIT STRING, which is what responders index on.
pub fn cert_id(cert: &Certificate, issuer: &Certificate) -> Result<CertId> {
    if cert.raw_issuer() != issuer.raw_subject() {
        debug!(
            subject = %cert.subject(),
            issuer = %issuer.subject(),
            "issuer context does not match the certificate's issuer name"
        );
    }

    let name_hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, issuer.raw_subject());
    let key_hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, issuer.public_key());

    Ok(CertId {
        hash_algorithm: AlgorithmIdentifier {
            algorithm: ID_SHA1,
            parameters: Some(Any::encode_from(&Null).map_err(encode_error)?),
        },
        issuer_name_hash: OctetString::new(name_hash.as_ref()).map_err(encode_error)?,
        issuer_key_hash: OctetString::new(key_hash.as_ref()).map_err(encode_error)?,
        serial_number: Uint::new(cert.serial()).map_err(encode_error)?,
    })
}

/// DER-encode an unsigned, nonce-less request for a single certificate.
pub fn encode_request(cert: &Certificate, issuer: &Certificate) -> Result<Vec<u8>> {
    let request = OcspRequest {
        tbs_request: TbsRequest {
            requestor_name: None,
            request_list: vec![Request {
                req_cert: cert_id(cert, issuer)?,
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };
    request.to_der().map_err(encode_error)
}

fn encode_error(e: der::Error) -> CacopError {
    CacopError::OcspEncode(e.to_string())
}
