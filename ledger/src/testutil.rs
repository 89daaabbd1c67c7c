//! Builders shared by this crate's unit tests.

use std::net::Ipv4Addr;

use dirauth_consensus::ConsensusReducer;
use dirauth_crypto::{AuthorityKeys, KeySeed};
use dirauth_netdoc::{format_vote, make_signature, TimingRules};
use dirauth_types::{
    AuthorityEntry, AuthorityRoster, Consensus, DescriptorDigest, Digest256, Flavor,
    IdentityDigest, MicrodescHash, NetParams, ProtocolLines, SignatureStatus, Timestamp, Vote,
    VoteRouterStatus, VoterInfo,
};

use crate::verify::check_consensus_signatures;
use crate::VotingWindow;

pub const FLAGS: [&str; 5] = ["Exit", "Fast", "Guard", "Running", "Valid"];

pub const VALID_AFTER: u64 = 1_700_000_000 - 1_700_000_000 % 3600;

pub fn make_keys(n: u8) -> AuthorityKeys {
    AuthorityKeys::from_seeds(&KeySeed([n; 32]), &KeySeed([n.wrapping_add(100); 32]), None)
}

/// A roster of authorities 1..=n.
pub fn make_roster(n: u8) -> AuthorityRoster {
    AuthorityRoster::new(
        (1..=n)
            .map(|i| {
                let keys = make_keys(i);
                AuthorityEntry {
                    nickname: format!("auth{i}"),
                    identity: keys.identity_digest(),
                    address: format!("auth{i}.example"),
                    ipv4: Ipv4Addr::new(192, 0, 2, i),
                    dir_port: 80,
                    or_port: 443,
                    contact: format!("ops{i}@example"),
                    signing_key: keys.signing_public(),
                    legacy_identity: None,
                    legacy_signing_key: None,
                }
            })
            .collect(),
    )
}

pub fn make_window() -> VotingWindow {
    VotingWindow {
        valid_after: Timestamp::new(VALID_AFTER),
        fetch_missing_votes: Timestamp::new(VALID_AFTER - 450),
    }
}

fn make_router(id: u8) -> VoteRouterStatus {
    VoteRouterStatus {
        nickname: format!("relay{id}"),
        identity: IdentityDigest::new([id; 20]),
        descriptor_digest: DescriptorDigest::new([id; 20]),
        published: Timestamp::new(VALID_AFTER - 600),
        ipv4: Ipv4Addr::new(10, 0, 0, id),
        or_port: 9001,
        dir_port: 0,
        ipv6: None,
        flags: 0b11010,
        version: Some("Tor 0.4.8.9".into()),
        protocols: Some("Link=1-5 Relay=1-4".into()),
        bandwidth: Some(100),
        measured_bandwidth: None,
        guardfraction: None,
        exit_policy: None,
        ed25519_id: None,
        microdesc: vec![MicrodescHash {
            methods: vec![28, 29, 30, 31, 32],
            sha256: Digest256::new([id; 32]),
        }],
    }
}

/// Authority `n`'s vote listing relays 1..=3 as Fast, Running and Valid.
pub fn make_vote(n: u8) -> Vote {
    let keys = make_keys(n);
    let va = Timestamp::new(VALID_AFTER);
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
        known_flags: FLAGS.iter().map(|s| s.to_string()).collect(),
        protocols: ProtocolLines::default(),
        params: NetParams::new(),
        bandwidth_file_headers: None,
        bandwidth_file_digest: None,
        shared_rand_commits: Vec::new(),
        routers: (1..=3).map(make_router).collect(),
    }
}

/// `vote` rendered and signed by authority `n`.
pub fn signed_vote_text(n: u8, vote: &Vote) -> String {
    let keys = make_keys(n);
    format_vote(vote, &keys.primary_signer())
}

/// A consensus of `flavor` over the votes of authorities 1..=n, signed
/// only by authority 1, with its signatures checked.
pub fn pending_consensus(n: u8, flavor: Flavor) -> Consensus {
    let keys = make_keys(1);
    let votes: Vec<Vote> = (1..=n).map(make_vote).collect();
    let reducer = ConsensusReducer::new(n as usize, TimingRules::STANDARD, &keys);
    let mut consensus = reducer
        .reduce(&votes, flavor)
        .expect("test votes reduce")
        .consensus;
    check_consensus_signatures(&mut consensus, &make_roster(n));
    consensus
}

/// Authority `n`'s signature over `consensus`, not yet checked.
pub fn signature_from(n: u8, consensus: &Consensus) -> dirauth_types::DocumentSignature {
    let keys = make_keys(n);
    let alg = consensus.flavor.signing_digest();
    let digest = consensus.digests.get(alg).expect("consensus digest");
    let mut sig = make_signature(alg, digest.as_bytes(), &keys.primary_signer());
    sig.status = SignatureStatus::Unchecked;
    sig
}
