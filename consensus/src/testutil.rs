//! Builders shared by this crate's unit tests.

use std::net::Ipv4Addr;

use dirauth_crypto::{AuthorityKeys, KeySeed};
use dirauth_types::{
    DescriptorDigest, Digest256, IdentityDigest, NetParams, ProtocolLines, Timestamp, Vote,
    VoteRouterStatus, VoterInfo,
};

/// Known flags of every test vote, sorted.
pub const FLAGS: [&str; 11] = [
    "BadExit",
    "Exit",
    "Fast",
    "Guard",
    "HSDir",
    "MiddleOnly",
    "Named",
    "Running",
    "Unnamed",
    "V2Dir",
    "Valid",
];

pub const VALID_AFTER: u64 = 1_700_000_000 - 1_700_000_000 % 3600;

pub fn make_keys(n: u8) -> AuthorityKeys {
    AuthorityKeys::from_seeds(&KeySeed([n; 32]), &KeySeed([n.wrapping_add(100); 32]), None)
}

/// Bit set over [`FLAGS`].
pub fn flag_bits(flags: &[&str]) -> u64 {
    flags
        .iter()
        .filter_map(|f| FLAGS.iter().position(|k| k == f))
        .fold(0, |acc, idx| acc | (1u64 << idx))
}

pub fn make_router(id: u8, nickname: &str, flags: &[&str]) -> VoteRouterStatus {
    VoteRouterStatus {
        nickname: nickname.to_string(),
        identity: IdentityDigest::new([id; 20]),
        descriptor_digest: DescriptorDigest::new([id; 20]),
        published: Timestamp::new(VALID_AFTER - 600),
        ipv4: Ipv4Addr::new(10, 0, 0, id),
        or_port: 9001,
        dir_port: 0,
        ipv6: None,
        flags: flag_bits(flags),
        version: Some("Tor 0.4.8.9".into()),
        protocols: Some("Link=1-5 Relay=1-4".into()),
        bandwidth: Some(100),
        measured_bandwidth: None,
        guardfraction: None,
        exit_policy: None,
        ed25519_id: None,
        microdesc: Vec::new(),
    }
}

/// A vote from authority `n` listing `routers`, sorted by identity.
pub fn make_vote(n: u8, routers: &[VoteRouterStatus]) -> Vote {
    let keys = make_keys(n);
    let va = Timestamp::new(VALID_AFTER);
    let mut routers = routers.to_vec();
    routers.sort_by(|a, b| a.identity.cmp(&b.identity));
    Vote {
        voter: VoterInfo {
            nickname: format!("auth{n}"),
            identity: keys.identity_digest(),
            legacy_identity: None,
            address: format!("auth{n}.example"),
            ipv4: Ipv4Addr::new(192, 0, 2, n),
            dir_port: 80,
            or_port: 443,
            contact: format!("ops{n}@example"),
            vote_digest: Digest256::new([n; 32]),
            signatures: Vec::new(),
        },
        consensus_methods: vec![28, 29, 30, 31, 32],
        published: va.minus(300),
        valid_after: va,
        fresh_until: va.plus(3600),
        valid_until: va.plus(3 * 3600),
        vote_seconds: 300,
        dist_seconds: 300,
        client_versions: Some("0.4.8.9,0.4.8.10".into()),
        server_versions: Some("0.4.8.10".into()),
        package_lines: Vec::new(),
        known_flags: FLAGS.iter().map(|s| s.to_string()).collect(),
        protocols: ProtocolLines::default(),
        params: NetParams::new(),
        bandwidth_file_headers: None,
        bandwidth_file_digest: None,
        shared_rand_commits: Vec::new(),
        routers,
    }
}
