//! Builders shared by this crate's unit tests.

use std::net::Ipv4Addr;

use dirauth_crypto::{AuthorityKeys, KeySeed};
use dirauth_types::{
    DescriptorDigest, Digest256, IdentityDigest, NetParams, ProtocolLines, Timestamp, Vote,
    VoteRouterStatus, VoterInfo,
};

pub fn make_keys(n: u8) -> AuthorityKeys {
    AuthorityKeys::from_seeds(&KeySeed([n; 32]), &KeySeed([n.wrapping_add(100); 32]), None)
}

pub fn make_router(id: u8, nickname: &str) -> VoteRouterStatus {
    VoteRouterStatus {
        nickname: nickname.to_string(),
        identity: IdentityDigest::new([id; 20]),
        descriptor_digest: DescriptorDigest::new([id; 20]),
        published: Timestamp::new(1_699_990_000),
        ipv4: Ipv4Addr::new(10, 0, 0, id),
        or_port: 9001,
        dir_port: 0,
        ipv6: None,
        flags: 0,
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

pub fn make_vote(keys: &AuthorityKeys, valid_after: u64) -> Vote {
    let va = Timestamp::new(valid_after);
    Vote {
        voter: VoterInfo {
            nickname: "auth".into(),
            identity: keys.identity_digest(),
            legacy_identity: None,
            address: "auth.example".into(),
            ipv4: Ipv4Addr::new(192, 0, 2, 1),
            dir_port: 80,
            or_port: 443,
            contact: "ops@example".into(),
            vote_digest: Digest256::ZERO,
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
        known_flags: ["Exit", "Fast", "Guard", "Running", "Valid"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        protocols: ProtocolLines::default(),
        params: NetParams::new(),
        bandwidth_file_headers: None,
        bandwidth_file_digest: None,
        shared_rand_commits: Vec::new(),
        routers: Vec::new(),
    }
}
