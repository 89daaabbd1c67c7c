//! Authorities driven through whole voting periods by `tick`, with
//! nullable collaborators standing in for the network and serving layer.

use std::net::Ipv4Addr;

use dirauth_crypto::{AuthorityKeys, KeySeed};
use dirauth_ledger::VoteSource;
use dirauth_netdoc::{format_vote, TimingRules};
use dirauth_node::{
    AuthorityMetrics, AuthorityVotingState, Clock, Phase, ScheduleTiming, VotingScheduler,
};
use dirauth_nullables::{NullClock, NullPublisher, NullTransport, NullVoteProvider, TransportCall};
use dirauth_types::{
    AuthorityEntry, AuthorityRoster, DescriptorDigest, Digest256, Flavor, IdentityDigest,
    MicrodescHash, NetParams, ProtocolLines, Timestamp, Vote, VoteRouterStatus, VoterInfo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Midnight UTC.
const DAY: u64 = 1_699_920_000;
const PERIOD: u64 = DAY + 3600;

type Scheduler = VotingScheduler<NullVoteProvider, NullTransport, NullPublisher>;

fn make_keys(n: u8) -> AuthorityKeys {
    AuthorityKeys::from_seeds(&KeySeed([n; 32]), &KeySeed([n.wrapping_add(100); 32]), None)
}

fn make_roster(total: u8) -> AuthorityRoster {
    AuthorityRoster::new(
        (1..=total)
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

fn hourly() -> ScheduleTiming {
    ScheduleTiming {
        interval_secs: 3600,
        vote_delay_secs: 300,
        dist_delay_secs: 300,
        offset_secs: 0,
    }
}

fn make_router(id: u8) -> VoteRouterStatus {
    VoteRouterStatus {
        nickname: format!("relay{id}"),
        identity: IdentityDigest::new([id; 20]),
        descriptor_digest: DescriptorDigest::new([id; 20]),
        published: Timestamp::new(PERIOD - 900),
        ipv4: Ipv4Addr::new(10, 0, 0, id),
        or_port: 9001,
        dir_port: 0,
        ipv6: None,
        // Fast, Running, Valid
        flags: 0b111,
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

fn vote_text(n: u8, valid_after: u64) -> String {
    let keys = make_keys(n);
    let va = Timestamp::new(valid_after);
    let vote = Vote {
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
        published: va.minus(600),
        valid_after: va,
        fresh_until: va.plus(3600),
        valid_until: va.plus(3 * 3600),
        vote_seconds: 300,
        dist_seconds: 300,
        client_versions: Some("0.4.8.9".into()),
        server_versions: Some("0.4.8.9".into()),
        package_lines: Vec::new(),
        known_flags: vec!["Fast".into(), "Running".into(), "Valid".into()],
        protocols: ProtocolLines::default(),
        params: NetParams::new(),
        bandwidth_file_headers: None,
        bandwidth_file_digest: None,
        shared_rand_commits: Vec::new(),
        routers: (1..=3).map(make_router).collect(),
    };
    format_vote(&vote, &keys.primary_signer())
}

fn make_scheduler(n: u8, total: u8, now: Timestamp) -> Scheduler {
    let state = AuthorityVotingState::new(
        make_roster(total),
        make_keys(n),
        TimingRules::STANDARD,
        hourly(),
        now,
    );
    let votes = NullVoteProvider::new();
    votes.script(Timestamp::new(PERIOD), vote_text(n, PERIOD));
    VotingScheduler::new(
        state,
        votes,
        NullTransport::new(),
        NullPublisher::new(),
        AuthorityMetrics::new().expect("metrics"),
    )
}

// ---------------------------------------------------------------------------
// 1. A full period across three authorities
// ---------------------------------------------------------------------------

#[test]
fn three_authorities_vote_sign_and_publish() {
    let clock = NullClock::new(DAY + 10);
    let mut auths: Vec<Scheduler> = (1..=3).map(|n| make_scheduler(n, 3, clock.now())).collect();

    for a in auths.iter_mut() {
        assert_eq!(a.tick(clock.now()), Timestamp::new(PERIOD - 600));
        assert!(a.transport().calls().is_empty());
    }

    // Vote, then trade votes.
    clock.set(Timestamp::new(PERIOD - 600));
    for a in auths.iter_mut() {
        assert_eq!(a.tick(clock.now()), Timestamp::new(PERIOD - 450));
        assert_eq!(a.state().schedule.phase(), Phase::Voted);
    }
    let votes: Vec<String> = auths.iter().map(|a| a.transport().sent_votes()[0].clone()).collect();
    for (i, a) in auths.iter_mut().enumerate() {
        for (j, vote) in votes.iter().enumerate() {
            if i != j {
                let posted = VoteSource::Posted { received_at: clock.now() };
                assert!(a.receive_votes(vote, posted)[0].is_ok());
            }
        }
        assert_eq!(a.state().ledger.pending_vote_count(), 3);
    }

    // Nothing is missing, so nothing is fetched.
    clock.set(Timestamp::new(PERIOD - 450));
    for a in auths.iter_mut() {
        a.tick(clock.now());
        assert!(!a
            .transport()
            .calls()
            .iter()
            .any(|c| matches!(c, TransportCall::FetchMissingVotes(_))));
    }

    // Compute and broadcast signatures.
    clock.set(Timestamp::new(PERIOD - 300));
    for a in auths.iter_mut() {
        assert_eq!(a.tick(clock.now()), Timestamp::new(PERIOD - 150));
        assert_eq!(a.state().ledger.pending_flavors(), vec![Flavor::Ns, Flavor::Microdesc]);
    }
    let sigs: Vec<String> = auths
        .iter()
        .map(|a| a.transport().sent_signatures()[0].clone())
        .collect();

    // Still short of signatures: ask for them, then receive them.
    clock.set(Timestamp::new(PERIOD - 150));
    for (i, a) in auths.iter_mut().enumerate() {
        a.tick(clock.now());
        assert_eq!(
            a.transport().calls().last(),
            Some(&TransportCall::FetchMissingSignatures)
        );
        for (j, sig) in sigs.iter().enumerate() {
            if i != j {
                assert_eq!(a.receive_signatures(sig, &format!("auth{}", j + 1)).unwrap(), 2);
            }
        }
        assert!(!a.state().ledger.needs_signatures());
    }

    // Publish; the next period's vote time comes back.
    clock.set(Timestamp::new(PERIOD));
    for a in auths.iter_mut() {
        assert_eq!(a.tick(clock.now()), Timestamp::new(PERIOD + 3600 - 600));
        assert_eq!(a.publisher().publish_count(), 2);
        assert_eq!(a.state().schedule.phase(), Phase::Idle);
        assert_eq!(a.state().schedule.interval_starts, Timestamp::new(PERIOD + 3600));
        assert_eq!(a.state().ledger.pending_vote_count(), 0);
        assert!(a.state().ledger.pending_flavors().is_empty());
    }
    let served: Vec<String> = auths
        .iter()
        .map(|a| a.publisher().served(Flavor::Ns).expect("ns served"))
        .collect();
    assert!(served.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(served[0].matches("directory-signature").count(), 3);

    let metrics = auths[0].metrics().gather_text().unwrap();
    assert!(metrics.contains("dirauth_consensuses_published_total 2"));
    assert!(metrics.contains("dirauth_signatures_added_total 4"));
}

// ---------------------------------------------------------------------------
// 2. Phases advance on time even when actions fail
// ---------------------------------------------------------------------------

#[test]
fn lone_authority_asks_for_votes_and_moves_on() {
    let mut auth = make_scheduler(1, 3, Timestamp::new(DAY + 10));
    auth.tick(Timestamp::new(DAY + 10));

    // Sleeping through the whole period runs every phase in one tick.
    let next = auth.tick(Timestamp::new(PERIOD));
    assert_eq!(next, Timestamp::new(PERIOD + 3600 - 600));

    let calls = auth.transport().calls();
    assert!(matches!(calls[0], TransportCall::BroadcastVote(_)));
    match &calls[1] {
        TransportCall::FetchMissingVotes(missing) => {
            assert_eq!(missing, &vec![make_keys(2).identity_digest(), make_keys(3).identity_digest()]);
        }
        other => panic!("expected a missing-vote fetch, got {other:?}"),
    }
    // One vote of three: no consensus, so no signatures to send or fetch.
    assert_eq!(calls.len(), 2);
    assert_eq!(auth.publisher().publish_count(), 0);
}

#[test]
fn votes_posted_after_the_deadline_are_refused() {
    let mut auth = make_scheduler(1, 3, Timestamp::new(DAY + 10));
    auth.tick(Timestamp::new(DAY + 10));

    let late = VoteSource::Posted {
        received_at: Timestamp::new(PERIOD - 449),
    };
    assert!(auth.receive_votes(&vote_text(2, PERIOD), late)[0].is_err());
    let fetched = auth.receive_votes(&vote_text(2, PERIOD), VoteSource::Fetched);
    assert!(fetched[0].is_ok());

    let metrics = auth.metrics().gather_text().unwrap();
    assert!(metrics.contains("dirauth_votes_rejected_total 1"));
    assert!(metrics.contains("dirauth_votes_accepted_total 1"));
    assert!(metrics.contains("dirauth_pending_votes 1"));
}

#[test]
fn missing_own_vote_is_logged_not_fatal() {
    let state = AuthorityVotingState::new(
        make_roster(3),
        make_keys(1),
        TimingRules::STANDARD,
        hourly(),
        Timestamp::new(DAY + 10),
    );
    let mut auth = VotingScheduler::new(
        state,
        NullVoteProvider::new(),
        NullTransport::new(),
        NullPublisher::new(),
        AuthorityMetrics::new().unwrap(),
    );
    auth.tick(Timestamp::new(DAY + 10));
    assert_eq!(auth.tick(Timestamp::new(PERIOD - 600)), Timestamp::new(PERIOD - 450));
    assert!(auth.transport().sent_votes().is_empty());
    assert_eq!(auth.state().schedule.phase(), Phase::Voted);
}
