//! The vote-to-consensus reduction for one flavor.

use rayon::prelude::*;

use dirauth_crypto::AuthorityKeys;
use dirauth_netdoc::{
    format_consensus_unsigned, parse_consensus, sign_document, TimingRules,
    LEGACY_NICKNAME_SUFFIX,
};
use dirauth_types::{
    Consensus, ConsensusVoter, DocumentDigests, Flavor, ProtocolLines, Timestamp, Vote,
};
use dirauth_utils::median_of;

use crate::bw_weights::{compute_bandwidth_weights, BandwidthTotals, BW_WEIGHT_SCALE};
use crate::collator::collate;
use crate::flags::FlagTable;
use crate::method::{negotiate_consensus_method, MIN_METHOD_FOR_CORRECT_BWWEIGHTSCALE};
use crate::naming::NameMap;
use crate::packages::compute_package_lines;
use crate::params::{compute_params, extract_param_buggy, intermediate_param_value};
use crate::protover::compute_protocol_vote;
use crate::router::{reconcile, RouterContext};
use crate::versions::compute_versions_list;
use crate::ConsensusError;

/// Cap on unmeasured bandwidth when `maxunmeasuredbw` is not voted.
pub const DEFAULT_MAX_UNMEASURED_BW_KB: i32 = 20;

const RUNNING_FLAG: &str = "Running";

/// A signed consensus and its parsed form.
#[derive(Clone, Debug)]
pub struct ReducedConsensus {
    pub text: String,
    pub consensus: Consensus,
}

/// Computes signed consensus documents from a set of votes.
pub struct ConsensusReducer<'k> {
    total_authorities: usize,
    timing: TimingRules,
    keys: &'k AuthorityKeys,
}

impl<'k> ConsensusReducer<'k> {
    pub fn new(total_authorities: usize, timing: TimingRules, keys: &'k AuthorityKeys) -> Self {
        Self {
            total_authorities,
            timing,
            keys,
        }
    }

    /// Reduce, sign and re-parse the `flavor` consensus of `votes`.
    pub fn reduce(&self, votes: &[Vote], flavor: Flavor) -> Result<ReducedConsensus, ConsensusError> {
        let consensus = self.build(votes, flavor)?;

        let signers: Vec<_> = self
            .keys
            .signers()
            .into_iter()
            .filter(|s| consensus.voter(&s.identity).is_some())
            .collect();
        let own = self.keys.identity_digest();
        if !signers.iter().any(|s| s.identity == own) {
            return Err(ConsensusError::Signing(format!(
                "our identity {own} is not among the voters"
            )));
        }

        let unsigned = format_consensus_unsigned(&consensus);
        let text = sign_document(&unsigned, flavor.signing_digest(), &signers);

        let parsed = parse_consensus(&text, &self.timing).map_err(|e| {
            tracing::error!(flavor = %flavor, error = %e, "generated a consensus we couldn't parse");
            ConsensusError::InternalInconsistency(e.to_string())
        })?;
        if parsed.routers.len() != consensus.routers.len() {
            return Err(ConsensusError::InternalInconsistency(format!(
                "router count changed from {} to {} on re-parse",
                consensus.routers.len(),
                parsed.routers.len()
            )));
        }

        Ok(ReducedConsensus {
            text,
            consensus: parsed,
        })
    }

    /// Compute the unsigned `flavor` consensus of `votes`.
    pub fn build(&self, votes: &[Vote], flavor: Flavor) -> Result<Consensus, ConsensusError> {
        if votes.is_empty() {
            return Err(ConsensusError::NoVotes);
        }
        if !votes.iter().any(|v| v.knows_flag(RUNNING_FLAG)) {
            return Err(ConsensusError::NoRunningConsensus);
        }

        let method = negotiate_consensus_method(votes);

        // ── Period ──────────────────────────────────────────────────────
        let valid_after = median_ts(votes.iter().map(|v| v.valid_after))?;
        let fresh_until = median_ts(votes.iter().map(|v| v.fresh_until))?;
        let valid_until = median_ts(votes.iter().map(|v| v.valid_until))?;
        let vote_seconds = median_of(votes.iter().map(|v| v.vote_seconds)).unwrap_or_default();
        let dist_seconds = median_of(votes.iter().map(|v| v.dist_seconds)).unwrap_or_default();
        if let Err(e) = self.timing.check(
            valid_after,
            fresh_until,
            valid_until,
            vote_seconds,
            dist_seconds,
        ) {
            panic!("median voting period violates timing rules: {e}");
        }

        // ── Header ──────────────────────────────────────────────────────
        let client_lists: Vec<&str> = votes.iter().filter_map(|v| v.client_versions.as_deref()).collect();
        let server_lists: Vec<&str> = votes.iter().filter_map(|v| v.server_versions.as_deref()).collect();
        let client_versions = compute_versions_list(&client_lists, client_lists.len());
        let server_versions = compute_versions_list(&server_lists, server_lists.len());

        let protocols = compute_protocols(votes);
        let params = compute_params(votes, self.total_authorities);
        let package_lines = compute_package_lines(votes);

        let flags = FlagTable::new(votes)?;
        let names = NameMap::build(votes, &flags);

        let (weight_scale, max_unmeasured) = if method < MIN_METHOD_FOR_CORRECT_BWWEIGHTSCALE {
            let rendered = params.to_string();
            (
                extract_param_buggy(&rendered, "bwweightscale", BW_WEIGHT_SCALE as i32),
                extract_param_buggy(&rendered, "maxunmeasuredbw", DEFAULT_MAX_UNMEASURED_BW_KB),
            )
        } else {
            (
                intermediate_param_value(&params, "bwweightscale", BW_WEIGHT_SCALE as i32).max(1),
                intermediate_param_value(&params, "maxunmeasuredbw", DEFAULT_MAX_UNMEASURED_BW_KB)
                    .max(1),
            )
        };

        // ── Routers ─────────────────────────────────────────────────────
        let ctx = RouterContext {
            votes,
            flags: &flags,
            names: &names,
            flavor,
            method,
            total_authorities: self.total_authorities,
            max_unmeasured_bw_kb: max_unmeasured.unsigned_abs(),
            n_authorities_measuring: votes.iter().filter(|v| v.has_measured_bws()).count(),
        };
        let collated = collate(votes, self.total_authorities);
        let reconciled: Vec<_> = collated.par_iter().map(|r| reconcile(&ctx, r)).collect();

        let mut totals = BandwidthTotals::default();
        let mut routers = Vec::with_capacity(reconciled.len());
        for r in reconciled.into_iter().flatten() {
            if let Some(bw) = r.status.bandwidth {
                totals.add_router(bw, r.status.guardfraction, r.is_exit, r.is_guard);
            }
            if flavor == Flavor::Microdesc && r.status.microdesc_digest.is_none() {
                continue;
            }
            routers.push(r.status);
        }
        tracing::debug!(
            flavor = %flavor,
            listed = collated.len(),
            kept = routers.len(),
            "reconciled router statuses"
        );

        let bandwidth_weights = compute_bandwidth_weights(&totals, i64::from(weight_scale));

        Ok(Consensus {
            flavor,
            consensus_method: method,
            valid_after,
            fresh_until,
            valid_until,
            vote_seconds,
            dist_seconds,
            client_versions,
            server_versions,
            package_lines,
            known_flags: flags.flags().to_vec(),
            protocols,
            params,
            voters: dir_sources(votes),
            routers,
            bandwidth_weights,
            digests: DocumentDigests::new(),
        })
    }
}

fn median_ts(values: impl Iterator<Item = Timestamp>) -> Result<Timestamp, ConsensusError> {
    median_of(values).ok_or(ConsensusError::NoVotes)
}

/// Recommended sets need half of the votes, required sets two thirds.
fn compute_protocols(votes: &[Vote]) -> ProtocolLines {
    let n = votes.len();
    let mut out = ProtocolLines::default();
    for idx in 0..ProtocolLines::KEYWORDS.len() {
        let lists: Vec<&str> = votes.iter().filter_map(|v| v.protocols.nth(idx)).collect();
        let threshold = if idx < 2 { n.div_ceil(2) } else { (2 * n).div_ceil(3) };
        out.set_nth(idx, compute_protocol_vote(&lists, threshold));
    }
    out
}

/// One `dir-source` per vote plus one per legacy identity, by identity.
fn dir_sources(votes: &[Vote]) -> Vec<ConsensusVoter> {
    let mut voters = Vec::with_capacity(votes.len());
    for vote in votes {
        let v = &vote.voter;
        voters.push(ConsensusVoter {
            nickname: v.nickname.clone(),
            identity: v.identity,
            address: v.address.clone(),
            ipv4: v.ipv4,
            dir_port: v.dir_port,
            or_port: v.or_port,
            contact: Some(v.contact.clone()),
            vote_digest: Some(v.vote_digest),
            is_legacy: false,
            signatures: Vec::new(),
        });
        if let Some(legacy) = v.legacy_identity {
            voters.push(ConsensusVoter {
                nickname: format!("{}{LEGACY_NICKNAME_SUFFIX}", v.nickname),
                identity: legacy,
                address: v.address.clone(),
                ipv4: v.ipv4,
                dir_port: v.dir_port,
                or_port: v.or_port,
                contact: None,
                vote_digest: None,
                is_legacy: true,
                signatures: Vec::new(),
            });
        }
    }
    voters.sort_by(|a, b| a.identity.cmp(&b.identity));
    voters
}
