//! The parsed form of a consensus document.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::{
    DescriptorDigest, Digest256, DocumentDigests, DocumentSignature, Flavor, IdentityDigest,
    NetParams, ProtocolLines, Timestamp,
};

/// A `dir-source` entry with the signatures attributed to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusVoter {
    pub nickname: String,
    pub identity: IdentityDigest,
    pub address: String,
    pub ipv4: Ipv4Addr,
    pub dir_port: u16,
    pub or_port: u16,
    /// `None` for legacy-key entries.
    pub contact: Option<String>,
    pub vote_digest: Option<Digest256>,
    pub is_legacy: bool,
    pub signatures: Vec<DocumentSignature>,
}

impl ConsensusVoter {
    pub fn signature_by_alg(&self, alg: crate::DigestAlgorithm) -> Option<&DocumentSignature> {
        self.signatures.iter().find(|s| s.alg == alg)
    }

    pub fn has_good_signature(&self) -> bool {
        self.signatures.iter().any(DocumentSignature::is_good)
    }
}

/// A reconciled router entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusRouterStatus {
    pub nickname: String,
    pub identity: IdentityDigest,
    /// Absent in the microdesc flavor.
    pub descriptor_digest: Option<DescriptorDigest>,
    pub published: Timestamp,
    pub ipv4: Ipv4Addr,
    pub or_port: u16,
    pub dir_port: u16,
    pub ipv6: Option<(Ipv6Addr, u16)>,
    pub microdesc_digest: Option<Digest256>,
    pub flags: Vec<String>,
    pub version: Option<String>,
    pub protocols: Option<String>,
    pub bandwidth: Option<u32>,
    pub unmeasured: bool,
    pub guardfraction: Option<u32>,
    pub exit_summary: Option<String>,
}

impl ConsensusRouterStatus {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub flavor: Flavor,
    pub consensus_method: u32,
    pub valid_after: Timestamp,
    pub fresh_until: Timestamp,
    pub valid_until: Timestamp,
    pub vote_seconds: u32,
    pub dist_seconds: u32,
    pub client_versions: String,
    pub server_versions: String,
    pub package_lines: Vec<String>,
    pub known_flags: Vec<String>,
    pub protocols: ProtocolLines,
    pub params: NetParams,
    pub voters: Vec<ConsensusVoter>,
    pub routers: Vec<ConsensusRouterStatus>,
    pub bandwidth_weights: Option<Vec<(String, i64)>>,
    /// Digests of the signed portion, one per supported algorithm.
    pub digests: DocumentDigests,
}

impl Consensus {
    pub fn voter(&self, identity: &IdentityDigest) -> Option<&ConsensusVoter> {
        self.voters.iter().find(|v| &v.identity == identity)
    }

    pub fn voter_mut(&mut self, identity: &IdentityDigest) -> Option<&mut ConsensusVoter> {
        self.voters.iter_mut().find(|v| &v.identity == identity)
    }

    pub fn router(&self, identity: &IdentityDigest) -> Option<&ConsensusRouterStatus> {
        self.routers.iter().find(|r| &r.identity == identity)
    }

    pub fn bandwidth_weight(&self, key: &str) -> Option<i64> {
        self.bandwidth_weights
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn signature_count(&self) -> usize {
        self.voters.iter().map(|v| v.signatures.len()).sum()
    }
}
