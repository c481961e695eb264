//! Validity window evaluation.

use cacop_core::{Certificate, ExpirationStatus};
use chrono::{DateTime, Utc};

/// Evaluate `cert`'s validity window at `now`.
///
/// A certificate is expired when `now` is before `notBefore` or at or after
/// `notAfter`. A window that ends before it starts is reported as expired
/// with an error.
#[must_use]
pub fn evaluate(cert: &Certificate, now: DateTime<Utc>) -> ExpirationStatus {
    let (not_before, not_after) = (cert.not_before(), cert.not_after());
    let expired = now < not_before || now >= not_after;

    let error = (not_after < not_before)
        .then(|| format!("validity window ends ({not_after}) before it starts ({not_before})"));

    ExpirationStatus {
        expired,
        now,
        error,
    }
}
