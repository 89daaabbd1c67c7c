//! A single authority's vote and its per-router status entries.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::{
    DescriptorDigest, Digest256, DocumentSignature, IdentityDigest, NetParams, Timestamp,
    TypesError,
};

/// Upper bound on `known-flags` entries: router flags are a 64-bit set.
pub const MAX_KNOWN_FLAGS_IN_VOTE: usize = 64;

/// Who produced a vote, and how to reach them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterInfo {
    pub nickname: String,
    pub identity: IdentityDigest,
    pub legacy_identity: Option<IdentityDigest>,
    pub address: String,
    pub ipv4: Ipv4Addr,
    pub dir_port: u16,
    pub or_port: u16,
    pub contact: String,
    /// Digest of the vote's signed portion.
    pub vote_digest: Digest256,
    pub signatures: Vec<DocumentSignature>,
}

/// The four recommended/required protocol lines, each optional in a vote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLines {
    pub recommended_client: Option<String>,
    pub recommended_relay: Option<String>,
    pub required_client: Option<String>,
    pub required_relay: Option<String>,
}

impl ProtocolLines {
    /// Keywords in the fixed order the lines appear in documents.
    pub const KEYWORDS: [&'static str; 4] = [
        "recommended-client-protocols",
        "recommended-relay-protocols",
        "required-client-protocols",
        "required-relay-protocols",
    ];

    pub fn nth(&self, n: usize) -> Option<&str> {
        match n {
            0 => self.recommended_client.as_deref(),
            1 => self.recommended_relay.as_deref(),
            2 => self.required_client.as_deref(),
            3 => self.required_relay.as_deref(),
            _ => None,
        }
    }

    pub fn set_nth(&mut self, n: usize, value: String) {
        match n {
            0 => self.recommended_client = Some(value),
            1 => self.recommended_relay = Some(value),
            2 => self.required_client = Some(value),
            3 => self.required_relay = Some(value),
            _ => {}
        }
    }
}

/// A microdescriptor digest together with the consensus methods it applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrodescHash {
    pub methods: Vec<u32>,
    pub sha256: Digest256,
}

/// One router's status as asserted by one vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRouterStatus {
    pub nickname: String,
    pub identity: IdentityDigest,
    pub descriptor_digest: DescriptorDigest,
    pub published: Timestamp,
    pub ipv4: Ipv4Addr,
    pub or_port: u16,
    pub dir_port: u16,
    pub ipv6: Option<(Ipv6Addr, u16)>,
    /// Bit `i` set means `known_flags[i]` of the owning vote.
    pub flags: u64,
    pub version: Option<String>,
    pub protocols: Option<String>,
    /// Advertised bandwidth in kilobytes.
    pub bandwidth: Option<u32>,
    pub measured_bandwidth: Option<u32>,
    pub guardfraction: Option<u32>,
    pub exit_policy: Option<String>,
    pub ed25519_id: Option<[u8; 32]>,
    pub microdesc: Vec<MicrodescHash>,
}

impl VoteRouterStatus {
    /// Canonical variant ordering: identity and descriptor ascending, then
    /// newer publication first, nickname descending, address ascending,
    /// ports descending. Equal entries describe the same variant.
    pub fn variant_cmp(&self, other: &Self) -> Ordering {
        self.identity
            .cmp(&other.identity)
            .then_with(|| self.descriptor_digest.cmp(&other.descriptor_digest))
            .then_with(|| other.published.cmp(&self.published))
            .then_with(|| other.nickname.as_bytes().cmp(self.nickname.as_bytes()))
            .then_with(|| self.ipv4.cmp(&other.ipv4))
            .then_with(|| other.or_port.cmp(&self.or_port))
            .then_with(|| other.dir_port.cmp(&self.dir_port))
    }

    pub fn same_variant(&self, other: &Self) -> bool {
        self.variant_cmp(other) == Ordering::Equal
    }

    /// The microdescriptor digest listed for `method`, if any.
    pub fn microdesc_for_method(&self, method: u32) -> Option<&Digest256> {
        self.microdesc
            .iter()
            .find(|m| m.methods.contains(&method))
            .map(|m| &m.sha256)
    }
}

/// One authority's signed opinion for one voting period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: VoterInfo,
    pub consensus_methods: Vec<u32>,
    pub published: Timestamp,
    pub valid_after: Timestamp,
    pub fresh_until: Timestamp,
    pub valid_until: Timestamp,
    pub vote_seconds: u32,
    pub dist_seconds: u32,
    pub client_versions: Option<String>,
    pub server_versions: Option<String>,
    pub package_lines: Vec<String>,
    pub known_flags: Vec<String>,
    pub protocols: ProtocolLines,
    pub params: NetParams,
    pub bandwidth_file_headers: Option<String>,
    pub bandwidth_file_digest: Option<String>,
    pub shared_rand_commits: Vec<String>,
    pub routers: Vec<VoteRouterStatus>,
}

impl Vote {
    pub fn identity(&self) -> &IdentityDigest {
        &self.voter.identity
    }

    pub fn digest(&self) -> &Digest256 {
        &self.voter.vote_digest
    }

    /// Reject flag tables that cannot be represented as a 64-bit set.
    pub fn validate_flags(&self) -> Result<(), TypesError> {
        if self.known_flags.len() > MAX_KNOWN_FLAGS_IN_VOTE {
            return Err(TypesError::TooManyFlags {
                count: self.known_flags.len(),
            });
        }
        Ok(())
    }

    pub fn flag_index(&self, flag: &str) -> Option<usize> {
        self.known_flags.iter().position(|f| f == flag)
    }

    pub fn knows_flag(&self, flag: &str) -> bool {
        self.flag_index(flag).is_some()
    }

    pub fn router_has_flag(&self, rs: &VoteRouterStatus, flag: &str) -> bool {
        self.flag_index(flag)
            .map(|idx| rs.flags & (1u64 << idx) != 0)
            .unwrap_or(false)
    }

    /// Flag names set on `rs`, in `known_flags` order.
    pub fn router_flags<'a>(&'a self, rs: &VoteRouterStatus) -> Vec<&'a str> {
        self.known_flags
            .iter()
            .enumerate()
            .filter(|(idx, _)| rs.flags & (1u64 << idx) != 0)
            .map(|(_, f)| f.as_str())
            .collect()
    }

    /// Whether this authority measures bandwidth at all.
    pub fn has_measured_bws(&self) -> bool {
        self.routers.iter().any(|r| r.measured_bandwidth.is_some())
    }
}
