//! Document signatures and detached signature sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Digest256, DigestAlgorithm, Flavor, IdentityDigest, Timestamp};

/// Verification state of one signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    /// Not yet checked (no key known, or not attempted).
    #[default]
    Unchecked,
    Good,
    Bad,
}

/// One authority's signature over a document digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignature {
    pub alg: DigestAlgorithm,
    pub identity: IdentityDigest,
    pub signing_key_digest: IdentityDigest,
    pub signature: Vec<u8>,
    pub status: SignatureStatus,
}

impl DocumentSignature {
    pub fn is_good(&self) -> bool {
        self.status == SignatureStatus::Good
    }

    pub fn is_bad(&self) -> bool {
        self.status == SignatureStatus::Bad
    }
}

/// Digests of one consensus flavor's signed portion, by algorithm.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDigests {
    digests: BTreeMap<DigestAlgorithm, Digest256>,
}

impl DocumentDigests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alg: DigestAlgorithm, digest: Digest256) {
        self.digests.insert(alg, digest);
    }

    pub fn get(&self, alg: DigestAlgorithm) -> Option<&Digest256> {
        self.digests.get(&alg)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DigestAlgorithm, &Digest256)> {
        self.digests.iter().map(|(alg, d)| (*alg, d))
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Signatures on one or more flavors' consensus digests, distributed
/// separately from the consensus bodies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSignatureSet {
    pub valid_after: Timestamp,
    pub fresh_until: Timestamp,
    pub valid_until: Timestamp,
    pub digests: BTreeMap<Flavor, DocumentDigests>,
    pub signatures: BTreeMap<Flavor, Vec<DocumentSignature>>,
}

impl DetachedSignatureSet {
    pub fn signatures_for(&self, flavor: Flavor) -> Option<&[DocumentSignature]> {
        self.signatures.get(&flavor).map(Vec::as_slice)
    }

    pub fn total_signatures(&self) -> usize {
        self.signatures.values().map(Vec::len).sum()
    }
}
