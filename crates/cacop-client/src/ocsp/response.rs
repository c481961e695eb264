use cacop_core::{CacopError, Certificate, OcspOutcome, OcspStatus, Result, RevocationReason};
use chrono::{DateTime, Utc};
use der::asn1::GeneralizedTime;
use der::{Decode, Encode};
use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};

use super::asn1::{
    BasicOcspResponse, CertStatus, OcspResponse, OcspResponseStatus, ResponseData,
    SingleResponse, ID_PKIX_OCSP_BASIC, ID_SHA1,
};
use super::signature::verify_response;

/// Decode a DER `OCSPResponse`, check who signed it, and extract the status
/// of `cert`.
pub fn parse_response(body: &[u8], cert: &Certificate, issuer: &Certificate) -> Result<OcspOutcome> {
    let response = OcspResponse::from_der(body).map_err(decode_error)?;
    if response.response_status != OcspResponseStatus::Successful {
        return Err(CacopError::OcspResponder {
            status: response.response_status.name().to_string(),
        });
    }

    let bytes = response
        .response_bytes
        .ok_or_else(|| CacopError::OcspDecode("successful response without responseBytes".into()))?;
    if bytes.response_type != ID_PKIX_OCSP_BASIC {
        return Err(CacopError::OcspDecode(format!(
            "unsupported response type {}",
            bytes.response_type
        )));
    }

    let basic = BasicOcspResponse::from_der(bytes.response.as_bytes()).map_err(decode_error)?;
    let tbs = basic.tbs_response_data.to_der().map_err(decode_error)?;
    verify_response(&basic, &tbs, issuer)?;

    let data = ResponseData::from_der(&tbs).map_err(decode_error)?;
    let single = data
        .responses
        .iter()
        .find(|single| covers(single, cert, issuer))
        .ok_or_else(|| CacopError::OcspNoMatchingResponse {
            serial: cert.serial_hex(),
        })?;

    outcome(single)
}

/// Serial must match. Issuer hashes are compared when the responder used
/// SHA-1, the algorithm requests are issued with.
fn covers(single: &SingleResponse, cert: &Certificate, issuer: &Certificate) -> bool {
    let id = &single.cert_id;
    if strip_zeros(id.serial_number.as_bytes()) != strip_zeros(cert.serial()) {
        return false;
    }
    if id.hash_algorithm.algorithm != ID_SHA1 {
        return true;
    }
    let name_hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, issuer.raw_subject());
    let key_hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, issuer.public_key());
    id.issuer_name_hash.as_bytes() == name_hash.as_ref()
        && id.issuer_key_hash.as_bytes() == key_hash.as_ref()
}

fn outcome(single: &SingleResponse) -> Result<OcspOutcome> {
    let this_update = to_utc(single.this_update)?;
    let next_update = single.next_update.map(to_utc).transpose()?;

    let (status, revoked_at, reason) = match &single.cert_status {
        CertStatus::Good(_) => (OcspStatus::Good, None, None),
        CertStatus::Unknown(_) => (OcspStatus::Unknown, None, None),
        CertStatus::Revoked(info) => {
            let reason = info
                .revocation_reason
                .and_then(|r| u8::try_from(r as u32).ok())
                .and_then(RevocationReason::from_code);
            (
                OcspStatus::Revoked,
                Some(to_utc(info.revocation_time)?),
                reason,
            )
        }
    };

    Ok(OcspOutcome {
        status,
        revoked_at,
        reason,
        this_update,
        next_update,
    })
}

fn to_utc(time: GeneralizedTime) -> Result<DateTime<Utc>> {
    let secs = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|e| CacopError::OcspDecode(e.to_string()))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| CacopError::OcspDecode(format!("time {secs} out of range")))
}

fn strip_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn decode_error(e: der::Error) -> CacopError {
    CacopError::OcspDecode(e.to_string())
}
