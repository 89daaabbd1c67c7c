use std::net::Ipv4Addr;

use proptest::prelude::*;

use dirauth_consensus::{
    check_weights, solve, BandwidthTotals, ConsensusReducer, WeightCase, BW_WEIGHT_MARGIN,
};
use dirauth_crypto::{AuthorityKeys, KeySeed};
use dirauth_netdoc::TimingRules;
use dirauth_types::{
    DescriptorDigest, Digest256, Flavor, IdentityDigest, NetParams, ProtocolLines, Timestamp,
    Vote, VoteRouterStatus, VoterInfo,
};
use dirauth_utils::median;

const FLAGS: [&str; 5] = ["Exit", "Fast", "Guard", "Running", "Valid"];
const VALID_AFTER: u64 = 1_700_002_800;

fn make_keys(n: u8) -> AuthorityKeys {
    AuthorityKeys::from_seeds(&KeySeed([n; 32]), &KeySeed([n.wrapping_add(100); 32]), None)
}

fn make_router(id: u8, flags: u64, bandwidth: u32) -> VoteRouterStatus {
    VoteRouterStatus {
        nickname: format!("relay{id}"),
        identity: IdentityDigest::new([id; 20]),
        descriptor_digest: DescriptorDigest::new([id; 20]),
        published: Timestamp::new(VALID_AFTER - 600),
        ipv4: Ipv4Addr::new(10, 0, 0, id),
        or_port: 9001,
        dir_port: 0,
        ipv6: None,
        flags,
        version: Some("Tor 0.4.8.9".into()),
        protocols: Some("Link=1-5".into()),
        bandwidth: Some(bandwidth),
        measured_bandwidth: None,
        guardfraction: None,
        exit_policy: Some("accept 1-65535".into()),
        ed25519_id: None,
        microdesc: Vec::new(),
    }
}

fn make_vote(n: u8, mut routers: Vec<VoteRouterStatus>) -> Vote {
    let va = Timestamp::new(VALID_AFTER);
    routers.sort_by(|a, b| a.identity.cmp(&b.identity));
    Vote {
        voter: VoterInfo {
            nickname: format!("auth{n}"),
            identity: make_keys(n).identity_digest(),
            legacy_identity: None,
            address: "auth.example".into(),
            ipv4: Ipv4Addr::new(192, 0, 2, n),
            dir_port: 80,
            or_port: 443,
            contact: "ops@example".into(),
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
        client_versions: None,
        server_versions: None,
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

/// Votes from authorities 1..=n over routers 1..=8; each vote keeps the
/// routers whose bit is set in its mask.
fn votes_strategy() -> impl Strategy<Value = Vec<Vote>> {
    prop::collection::vec((any::<u8>(), prop::collection::vec((0u64..32, 1u32..10_000), 8)), 3..7)
        .prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (mask, routers))| {
                    let routers = routers
                        .into_iter()
                        .enumerate()
                        .filter(|(id, _)| mask & (1 << id) != 0)
                        .map(|(id, (flags, bw))| make_router(id as u8 + 1, flags | 0b11000, bw))
                        .collect();
                    make_vote(i as u8 + 1, routers)
                })
                .collect()
        })
}

proptest! {
    /// The lower median is always one of the inputs and splits them evenly.
    #[test]
    fn median_is_bounded(mut values in prop::collection::vec(any::<i32>(), 1..50)) {
        let m = median(&mut values).unwrap();
        let below = values.iter().filter(|v| **v < m).count();
        let above = values.iter().filter(|v| **v > m).count();
        prop_assert!(values.contains(&m));
        prop_assert!(below <= (values.len() - 1) / 2);
        prop_assert!(above <= values.len() / 2);
    }

    /// Reordering the votes never changes the consensus bytes.
    #[test]
    fn reduction_ignores_vote_order(votes in votes_strategy(), rotate in 0usize..7) {
        let keys = make_keys(1);
        let reducer = ConsensusReducer::new(votes.len(), TimingRules::STANDARD, &keys);
        let mut shuffled = votes.clone();
        let len = shuffled.len();
        shuffled.rotate_left(rotate % len);
        shuffled.swap(0, len - 1);

        let a = reducer.reduce(&votes, Flavor::Ns).unwrap();
        let b = reducer.reduce(&shuffled, Flavor::Ns).unwrap();
        prop_assert_eq!(a.text, b.text);
    }

    /// With neither guards nor exits scarce, the closed-form weights sum
    /// exactly and the dual weights are within the margin.
    #[test]
    fn case1_weights_sum_to_scale(
        (g, ratio, m, d) in (100i64..1_000_000)
            .prop_flat_map(|g| (Just(g), 60i64..=160, 1..=g / 20, 1..=g / 20)),
    ) {
        let e = g * ratio / 100;
        let totals = BandwidthTotals { guard: g, middle: m, exit: e, both: d, total: g + m + e + d };
        prop_assert!(3 * e >= totals.total && 3 * g >= totals.total);
        let scale = 10_000;
        let (case, w) = solve(&totals, scale).unwrap();
        prop_assert_eq!(case, WeightCase::Case1);
        prop_assert_eq!(w.wmg + w.wgg, scale);
        prop_assert_eq!(w.wme + w.wee, scale);
        prop_assert!((w.wed + w.wmd + w.wgd - scale).abs() <= BW_WEIGHT_MARGIN);
    }

    /// Any solution the solver returns passes the non-balance checks.
    #[test]
    fn solutions_are_in_range(
        g in 1i64..1_000_000,
        e in 1i64..1_000_000,
        m in 1i64..1_000_000,
        d in 1i64..1_000_000,
    ) {
        let totals = BandwidthTotals { guard: g, middle: m, exit: e, both: d, total: g + m + e + d };
        if let Ok((_, w)) = solve(&totals, 10_000) {
            prop_assert!(check_weights(&w, &totals, 10_000, BW_WEIGHT_MARGIN, false).is_ok());
        }
    }
}
