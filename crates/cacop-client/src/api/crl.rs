//! CRL distribution point checks.

use crate::{crl, RevocationClient};
use cacop_core::{Certificate, CrlOutcome, CrlStatus, Result};
use futures_util::future::join_all;
use tracing::{debug, warn};

/// CRL checks
pub struct CrlApi<'a> {
    client: &'a RevocationClient,
}

impl<'a> CrlApi<'a> {
    pub(crate) const fn new(client: &'a RevocationClient) -> Self {
        Self { client }
    }

    /// Check every distribution point advertised by `cert`, one entry per
    /// point in advertisement order.
    pub async fn query(&self, cert: &Certificate) -> Vec<CrlStatus> {
        join_all(
            cert.crl_distribution_points()
                .iter()
                .map(|url| self.status(url, cert)),
        )
        .await
    }

    /// Check one distribution point, folding failures into the entry
    pub async fn status(&self, url: &str, cert: &Certificate) -> CrlStatus {
        match self.check(url, cert).await {
            Ok(outcome) => CrlStatus::checked(url, outcome),
            Err(e) => {
                warn!(url, serial = %cert.serial_hex(), error = %e, "CRL check failed");
                CrlStatus::failed(url, e)
            }
        }
    }

    /// Fetch the CRL at `url` and search it for `cert`'s serial number
    pub async fn check(&self, url: &str, cert: &Certificate) -> Result<CrlOutcome> {
        debug!(url, serial = %cert.serial_hex(), "fetching CRL");
        let body = self.client.get(url).await?;
        let outcome = crl::lookup(url, &body, cert)?;
        debug!(url, revoked = outcome.revoked, bytes = body.len(), "CRL searched");
        Ok(outcome)
    }
}
