//! Reconciliation of one collated router into a consensus entry.

use std::net::Ipv6Addr;

use dirauth_types::{ConsensusRouterStatus, Digest256, Flavor, Timestamp, Vote, VoteRouterStatus};
use dirauth_utils::{median_of, most_frequent};

use crate::collator::CollatedRouter;
use crate::flags::{FlagTable, NO_ED_CONSENSUS_FLAG};
use crate::method::{MIN_METHOD_FOR_MIDDLEONLY, MIN_METHOD_TO_SUPPRESS_MD_PUBLISHED};
use crate::naming::{NameMap, NAMED_FLAG, UNNAMED_FLAG};

/// Published time written into every microdesc entry from method 31 on:
/// 2038-01-01 00:00:00.
pub const SUPPRESSED_MD_PUBLISHED: u64 = 2_145_916_800;

/// Guard fractions are only trusted when more than this many votes supply one.
const MIN_GUARDFRACTION_INPUTS: usize = 2;
/// Measured bandwidth is only used when more than this many votes supply one.
const MIN_MEASURED_BW_INPUTS: usize = 2;
/// Unmeasured bandwidth is capped once more than this many authorities measure.
const MIN_MEASURING_AUTHORITIES_FOR_CAP: usize = 2;

/// State shared by every router of one reduction pass.
pub struct RouterContext<'a> {
    pub votes: &'a [Vote],
    pub flags: &'a FlagTable,
    pub names: &'a NameMap,
    pub flavor: Flavor,
    pub method: u32,
    pub total_authorities: usize,
    pub max_unmeasured_bw_kb: u32,
    pub n_authorities_measuring: usize,
}

/// A router that made it into the consensus.
#[derive(Clone, Debug)]
pub struct ReconciledRouter {
    pub status: ConsensusRouterStatus,
    /// Exit and not BadExit, for bandwidth accounting.
    pub is_exit: bool,
    pub is_guard: bool,
}

/// Reconcile `router`, or `None` when it is not listed by a majority of the
/// authorities or the reconciled flags exclude it.
pub fn reconcile(ctx: &RouterContext<'_>, router: &CollatedRouter<'_>) -> Option<ReconciledRouter> {
    let listing: Vec<(usize, &VoteRouterStatus)> = router.listing().collect();
    if listing.len() <= ctx.total_authorities / 2 {
        return None;
    }

    let mut flag_counts = vec![0usize; ctx.flags.len()];
    let mut chosen_name: Option<&str> = None;
    let mut naming_conflict = false;
    let mut guardfractions = Vec::new();
    let mut measured = Vec::new();
    let mut advertised = Vec::new();

    for (vote_idx, rs) in &listing {
        for idx in ctx.flags.canonical_flags(*vote_idx, rs) {
            flag_counts[idx] += 1;
        }
        if ctx.flags.has_flag(*vote_idx, rs, NAMED_FLAG) {
            match chosen_name {
                Some(name) if name != rs.nickname => {
                    tracing::debug!(
                        router = %router.identity,
                        first = name,
                        second = %rs.nickname,
                        "conflict on naming"
                    );
                    naming_conflict = true;
                }
                Some(_) => {}
                None => chosen_name = Some(rs.nickname.as_str()),
            }
        }
        guardfractions.extend(rs.guardfraction);
        measured.extend(rs.measured_bandwidth);
        advertised.extend(rs.bandwidth);
    }
    let n_ed_consensus = if router.ed25519_canonical { listing.len() } else { 0 };

    let winners = winning_variant(&listing);
    let winner = winners[0];

    let nickname = match chosen_name {
        Some(name) if !naming_conflict => name.to_string(),
        _ => winner.nickname.clone(),
    };
    let name_status = if naming_conflict {
        Default::default()
    } else {
        ctx.names.status(&nickname, &router.identity)
    };

    // ── Flags ───────────────────────────────────────────────────────────
    let mut flags: Vec<String> = Vec::new();
    let (mut is_exit, mut is_guard, mut is_running, mut is_valid) = (false, false, false, false);
    let (mut is_badexit, mut is_middleonly) = (false, false);
    for (idx, flag) in ctx.flags.flags().iter().enumerate() {
        let set = match flag.as_str() {
            NAMED_FLAG => name_status.is_named,
            UNNAMED_FLAG => name_status.is_unnamed,
            NO_ED_CONSENSUS_FLAG => n_ed_consensus <= ctx.total_authorities / 2,
            _ => flag_counts[idx] > ctx.flags.voters_knowing(idx) / 2,
        };
        if !set {
            continue;
        }
        match flag.as_str() {
            "Exit" => is_exit = true,
            "Guard" => is_guard = true,
            "Running" => is_running = true,
            "Valid" => is_valid = true,
            "BadExit" => is_badexit = true,
            "MiddleOnly" => is_middleonly = true,
            _ => {}
        }
        flags.push(flag.clone());
    }

    if !is_running || !is_valid {
        return None;
    }

    if ctx.method >= MIN_METHOD_FOR_MIDDLEONLY && is_middleonly {
        flags.retain(|f| !matches!(f.as_str(), "Exit" | "V2Dir" | "Guard" | "HSDir"));
        is_exit = false;
        is_guard = false;
        if !is_badexit && ctx.flags.contains("BadExit") {
            is_badexit = true;
            flags.push("BadExit".to_string());
            flags.sort();
        }
    }

    // ── Bandwidth ───────────────────────────────────────────────────────
    let guardfraction = if is_guard && guardfractions.len() > MIN_GUARDFRACTION_INPUTS {
        let fraction = median_of(guardfractions.iter().copied());
        if let Some(f) = fraction {
            assert!(f <= 100, "median guard fraction above 100");
        }
        fraction
    } else {
        None
    };

    let (bandwidth, unmeasured) = if measured.len() > MIN_MEASURED_BW_INPUTS {
        (median_of(measured.iter().copied()), false)
    } else if !advertised.is_empty() {
        let mut bw = median_of(advertised.iter().copied());
        if ctx.n_authorities_measuring > MIN_MEASURING_AUTHORITIES_FOR_CAP {
            bw = bw.map(|b| b.min(ctx.max_unmeasured_bw_kb));
        }
        (bw, true)
    } else {
        (None, false)
    };

    // ── Variant details ─────────────────────────────────────────────────
    let ipv6 = most_common_ipv6(&winners);
    let microdesc_digest = match ctx.flavor {
        Flavor::Microdesc => most_common_microdesc(&winners, ctx.method),
        Flavor::Ns => None,
    };
    let version = most_common_string(winners.iter().filter_map(|rs| rs.version.as_deref()));
    let protocols = most_common_string(winners.iter().filter_map(|rs| rs.protocols.as_deref()));

    let exit_summary = match ctx.flavor {
        Flavor::Ns => exit_summary(&listing, winner),
        Flavor::Microdesc => None,
    };

    let (descriptor_digest, published) = match ctx.flavor {
        Flavor::Ns => (Some(winner.descriptor_digest), winner.published),
        Flavor::Microdesc if ctx.method >= MIN_METHOD_TO_SUPPRESS_MD_PUBLISHED => {
            (None, Timestamp::new(SUPPRESSED_MD_PUBLISHED))
        }
        Flavor::Microdesc => (None, winner.published),
    };

    Some(ReconciledRouter {
        status: ConsensusRouterStatus {
            nickname,
            identity: router.identity,
            descriptor_digest,
            published,
            ipv4: winner.ipv4,
            or_port: winner.or_port,
            dir_port: winner.dir_port,
            ipv6,
            microdesc_digest,
            flags,
            version,
            protocols,
            bandwidth,
            unmeasured: bandwidth.is_some() && unmeasured,
            guardfraction,
            exit_summary,
        },
        is_exit: is_exit && !is_badexit,
        is_guard,
    })
}

/// Entries equal to the most common variant. Larger groups win; equal
/// groups prefer a strictly newer publication, then canonical order.
fn winning_variant<'a>(listing: &[(usize, &'a VoteRouterStatus)]) -> Vec<&'a VoteRouterStatus> {
    let mut sorted: Vec<&VoteRouterStatus> = listing.iter().map(|(_, rs)| *rs).collect();
    sorted.sort_by(|a, b| a.variant_cmp(b));

    let mut best: &[&VoteRouterStatus] = &[];
    for run in sorted.chunk_by(|a, b| a.same_variant(b)) {
        let better = match best.first() {
            None => true,
            Some(current) => {
                run.len() > best.len()
                    || (run.len() == best.len() && run[0].published > current.published)
            }
        };
        if better {
            best = run;
        }
    }
    best.to_vec()
}

fn most_common_ipv6(winners: &[&VoteRouterStatus]) -> Option<(Ipv6Addr, u16)> {
    let mut addrs: Vec<(Ipv6Addr, u16)> = winners
        .iter()
        .filter_map(|rs| rs.ipv6)
        .filter(|(addr, port)| !addr.is_unspecified() && *port != 0)
        .collect();
    // Address ascending, port descending.
    addrs.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    most_frequent(&addrs).copied()
}

fn most_common_microdesc(winners: &[&VoteRouterStatus], method: u32) -> Option<Digest256> {
    let mut digests: Vec<Digest256> = winners
        .iter()
        .filter_map(|rs| rs.microdesc_for_method(method).copied())
        .collect();
    digests.sort();
    most_frequent(&digests).copied()
}

/// Most frequent string, ties going to the lexicographically larger one.
fn most_common_string<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut values: Vec<&str> = values.collect();
    values.sort_unstable();
    most_frequent(&values).map(|s| s.to_string())
}

/// Exit policy summary from the votes that listed the chosen descriptor,
/// falling back to every listing vote.
fn exit_summary(listing: &[(usize, &VoteRouterStatus)], winner: &VoteRouterStatus) -> Option<String> {
    let matching: Vec<&str> = listing
        .iter()
        .filter(|(_, rs)| {
            rs.identity == winner.identity && rs.descriptor_digest == winner.descriptor_digest
        })
        .filter_map(|(_, rs)| rs.exit_policy.as_deref())
        .collect();

    if let Some(first) = matching.first() {
        if matching.iter().any(|s| s != first) {
            tracing::warn!(
                router = %winner.identity,
                descriptor = %winner.descriptor_digest,
                "voters disagree on exit policy summary"
            );
            return most_common_string(matching.into_iter());
        }
        return Some(first.to_string());
    }

    tracing::warn!(
        router = %winner.identity,
        descriptor = %winner.descriptor_digest,
        "not one of the voters that selected this descriptor listed an exit policy summary"
    );
    most_common_string(listing.iter().filter_map(|(_, rs)| rs.exit_policy.as_deref()))
}
