//! Consensus method negotiation.
//!
//! Each vote lists the consensus methods its authority can produce. The
//! chosen method is the highest one listed by more than two thirds of the
//! votes; behaviour changes between methods are gated on the constants here.

use std::collections::BTreeMap;

use dirauth_types::Vote;

pub const MIN_SUPPORTED_CONSENSUS_METHOD: u32 = 28;
pub const MAX_SUPPORTED_CONSENSUS_METHOD: u32 = 32;

/// From this method on, `bwweightscale` and `maxunmeasuredbw` are read from
/// the computed parameter list instead of the substring lookup.
pub const MIN_METHOD_FOR_CORRECT_BWWEIGHTSCALE: u32 = 31;
/// From this method on, microdesc consensuses carry a fixed published time.
pub const MIN_METHOD_TO_SUPPRESS_MD_PUBLISHED: u32 = 31;
/// From this method on, the MiddleOnly flag strips exit and guard flags.
pub const MIN_METHOD_FOR_MIDDLEONLY: u32 = 32;

/// Fallback when no method reaches the threshold.
pub const FALLBACK_CONSENSUS_METHOD: u32 = 1;

pub fn is_supported(method: u32) -> bool {
    (MIN_SUPPORTED_CONSENSUS_METHOD..=MAX_SUPPORTED_CONSENSUS_METHOD).contains(&method)
}

/// Every method this implementation can produce, ascending.
pub fn supported_methods() -> Vec<u32> {
    (MIN_SUPPORTED_CONSENSUS_METHOD..=MAX_SUPPORTED_CONSENSUS_METHOD).collect()
}

/// The highest method listed by more than `⌊2n/3⌋` of `votes`, or
/// [`FALLBACK_CONSENSUS_METHOD`].
pub fn compute_consensus_method(votes: &[Vote]) -> u32 {
    let threshold = votes.len() * 2 / 3;
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for vote in votes {
        let mut methods = vote.consensus_methods.clone();
        methods.sort_unstable();
        methods.dedup();
        for method in methods {
            *counts.entry(method).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .rev()
        .find(|(_, n)| *n > threshold)
        .map(|(method, _)| method)
        .unwrap_or(FALLBACK_CONSENSUS_METHOD)
}

/// Resolve the method to generate with, downgrading when the network agrees
/// on a method this implementation cannot produce.
pub fn negotiate_consensus_method(votes: &[Vote]) -> u32 {
    let method = compute_consensus_method(votes);
    if is_supported(method) {
        tracing::info!(method, "generating consensus");
        method
    } else {
        tracing::warn!(
            method,
            fallback = MAX_SUPPORTED_CONSENSUS_METHOD,
            "the other authorities will use a consensus method I don't support; maybe I should upgrade"
        );
        MAX_SUPPORTED_CONSENSUS_METHOD
    }
}
