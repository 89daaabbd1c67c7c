//! The fixed set of authorities this node recognises.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::IdentityDigest;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityEntry {
    pub nickname: String,
    pub identity: IdentityDigest,
    pub address: String,
    pub ipv4: Ipv4Addr,
    pub dir_port: u16,
    pub or_port: u16,
    pub contact: String,
    /// Current medium-term signing key.
    pub signing_key: PublicKey,
    pub legacy_identity: Option<IdentityDigest>,
    pub legacy_signing_key: Option<PublicKey>,
}

/// Known authorities; `len()` is the total authority count used by quorum rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRoster {
    entries: Vec<AuthorityEntry>,
}

impl AuthorityRoster {
    pub fn new(entries: Vec<AuthorityEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthorityEntry> {
        self.entries.iter()
    }

    pub fn get(&self, identity: &IdentityDigest) -> Option<&AuthorityEntry> {
        self.entries.iter().find(|e| &e.identity == identity)
    }

    pub fn contains(&self, identity: &IdentityDigest) -> bool {
        self.get(identity).is_some()
    }

    /// The public key that should have produced a signature claiming
    /// `identity`, whether it is a primary or a legacy identity.
    pub fn key_for_signer(&self, identity: &IdentityDigest) -> Option<PublicKey> {
        self.entries.iter().find_map(|e| {
            if &e.identity == identity {
                Some(e.signing_key)
            } else if e.legacy_identity.as_ref() == Some(identity) {
                e.legacy_signing_key
            } else {
                None
            }
        })
    }

    /// Hex fingerprints of every known authority, for log messages.
    pub fn fingerprints(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.identity.to_hex()).collect()
    }
}
