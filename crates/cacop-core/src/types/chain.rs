use std::ops::Deref;

use crate::error::{CacopError, Result};
use crate::types::Certificate;

/// An ordered, non-empty certificate chain.
///
/// Index 0 is the leaf, the last index is the trust anchor, everything in
/// between is an intermediate. A chain of one certificate is the anchor-only
/// case. Linkage between entries is not verified here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain(Vec<Certificate>);

impl Chain {
    /// Build a chain from leaf-first certificates.
    pub fn new(certificates: Vec<Certificate>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(CacopError::EmptyChain);
        }
        Ok(Self(certificates))
    }

    /// Parse a leaf-first sequence of DER certificates.
    pub fn from_der<I, B>(ders: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let certificates = ders
            .into_iter()
            .map(|der| Certificate::from_der(der.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(certificates)
    }

    /// Position 0
    #[must_use]
    pub fn leaf(&self) -> &Certificate {
        &self.0[0]
    }

    /// Last position
    #[must_use]
    pub fn root(&self) -> &Certificate {
        &self.0[self.0.len() - 1]
    }

    /// Everything strictly between leaf and root
    #[must_use]
    pub fn intermediates(&self) -> &[Certificate] {
        if self.0.len() < 2 {
            return &[];
        }
        &self.0[1..self.0.len() - 1]
    }

    /// Issuer context for position `index`: the next certificate up the chain
    #[must_use]
    pub fn issuer_of(&self, index: usize) -> Option<&Certificate> {
        self.0.get(index + 1)
    }

    /// Consume the chain
    #[must_use]
    pub fn into_inner(self) -> Vec<Certificate> {
        self.0
    }
}

impl Deref for Chain {
    type Target = [Certificate];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Vec<Certificate>> for Chain {
    type Error = CacopError;

    fn try_from(certificates: Vec<Certificate>) -> Result<Self> {
        Self::new(certificates)
    }
}

impl IntoIterator for Chain {
    type Item = Certificate;
    type IntoIter = std::vec::IntoIter<Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestPki;

    #[test]
    fn empty_chain_is_rejected() {
        assert!(matches!(Chain::new(Vec::new()), Err(CacopError::EmptyChain)));
        let empty: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(Chain::from_der(empty), Err(CacopError::EmptyChain)));
    }

    #[test]
    fn positions() {
        let pki = TestPki::new();
        let chain = Chain::from_der([pki.leaf.der(), pki.intermediate.der(), pki.root.der()]).unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.leaf().common_name(), "leaf.example.test");
        assert_eq!(chain.root().common_name(), "Test Root CA");
        assert_eq!(chain.intermediates().len(), 1);
        assert_eq!(
            chain.issuer_of(0).map(Certificate::common_name),
            Some("Test Intermediate CA")
        );
        assert!(chain.issuer_of(2).is_none());
    }

    #[test]
    fn single_certificate_chain() {
        let pki = TestPki::new();
        let chain = Chain::new(vec![pki.root.certificate()]).unwrap();
        assert_eq!(chain.leaf(), chain.root());
        assert!(chain.intermediates().is_empty());
    }
}
