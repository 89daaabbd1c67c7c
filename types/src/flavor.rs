//! Consensus flavors and the digest algorithms that sign them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A named consensus variant computed independently from the same votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Flavor {
    /// The full networkstatus consensus.
    Ns,
    /// The microdescriptor-based consensus.
    Microdesc,
}

impl Flavor {
    pub const ALL: [Flavor; 2] = [Flavor::Ns, Flavor::Microdesc];

    pub fn name(&self) -> &'static str {
        match self {
            Flavor::Ns => "ns",
            Flavor::Microdesc => "microdesc",
        }
    }

    /// The algorithm used for this flavor's signatures.
    pub fn signing_digest(&self) -> DigestAlgorithm {
        match self {
            Flavor::Ns => DigestAlgorithm::Sha256,
            Flavor::Microdesc => DigestAlgorithm::Blake2b256,
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Flavor {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" => Ok(Flavor::Ns),
            "microdesc" => Ok(Flavor::Microdesc),
            other => Err(TypesError::UnknownFlavor(other.to_string())),
        }
    }
}

/// Digest algorithms a document signature can cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Sha256,
    Blake2b256,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 2] = [DigestAlgorithm::Sha256, DigestAlgorithm::Blake2b256];

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Blake2b256 => "blake2b",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "blake2b" => Ok(DigestAlgorithm::Blake2b256),
            other => Err(TypesError::UnknownDigestAlgorithm(other.to_string())),
        }
    }
}
