//! OCSP responder queries.

use crate::ocsp::{encode_request, parse_response, OCSP_REQUEST_CONTENT_TYPE, OCSP_RESPONSE_CONTENT_TYPE};
use crate::RevocationClient;
use cacop_core::{CacopError, Certificate, OcspOutcome, Result, RevocationStatus};
use futures_util::future::join_all;
use tracing::{debug, warn};

/// OCSP checks
pub struct OcspApi<'a> {
    client: &'a RevocationClient,
}

impl<'a> OcspApi<'a> {
    pub(crate) const fn new(client: &'a RevocationClient) -> Self {
        Self { client }
    }

    /// Query every responder advertised by `cert`, one entry per responder
    /// in advertisement order.
    ///
    /// CA certificates are not OCSP-checked and yield no entries. A failed
    /// responder is recorded on its own entry and does not affect the others.
    pub async fn query(&self, cert: &Certificate, issuer: Option<&Certificate>) -> Vec<RevocationStatus> {
        if cert.is_ca() {
            return Vec::new();
        }
        join_all(
            cert.ocsp_servers()
                .iter()
                .map(|url| self.status(url, cert, issuer)),
        )
        .await
    }

    /// Query one responder, folding failures into the entry
    pub async fn status(&self, url: &str, cert: &Certificate, issuer: Option<&Certificate>) -> RevocationStatus {
        match self.check(url, cert, issuer).await {
            Ok(outcome) => RevocationStatus::checked(url, outcome),
            Err(e) => {
                warn!(url, serial = %cert.serial_hex(), error = %e, "OCSP query failed");
                RevocationStatus::failed(url, e)
            }
        }
    }

    /// Query one responder about `cert`, using `issuer` for the request's
    /// `CertID` and to validate the response signature.
    pub async fn check(&self, url: &str, cert: &Certificate, issuer: Option<&Certificate>) -> Result<OcspOutcome> {
        let issuer = issuer.ok_or_else(|| CacopError::MissingIssuer {
            subject: cert.subject().to_string(),
        })?;

        let request = encode_request(cert, issuer)?;
        debug!(url, serial = %cert.serial_hex(), "querying OCSP responder");

        let body = self
            .client
            .post(url, OCSP_REQUEST_CONTENT_TYPE, OCSP_RESPONSE_CONTENT_TYPE, &request)
            .await?;
        let outcome = parse_response(&body, cert, issuer)?;

        debug!(url, status = %outcome.status, "OCSP response");
        Ok(outcome)
    }
}
