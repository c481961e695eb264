//! SHA-256 fingerprints via `ring::digest`.

use ring::digest::{digest, SHA256};

/// SHA-256 fingerprint of a certificate's DER encoding, lowercase hex.
pub type Fingerprint = String;

/// Compute the SHA-256 fingerprint of raw DER bytes.
///
/// Every fingerprint in a report uses this encoding.
#[must_use]
pub fn sha256_fingerprint(der: &[u8]) -> Fingerprint {
    hex::encode(digest(&SHA256, der).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_fingerprint() {
        assert_eq!(
            sha256_fingerprint(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_fingerprint_empty() {
        let fp = sha256_fingerprint(&[]);
        assert_eq!(
            fp,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fp.len(), 64);
    }
}
