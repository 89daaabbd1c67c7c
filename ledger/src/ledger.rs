//! The per-period vote ledger.
//!
//! Holds the votes received for the period being voted on, the consensus
//! computed from them (one per flavor) while it collects signatures, and
//! the votes of the previous period for lookups.

use std::collections::BTreeMap;

use dirauth_consensus::{ConsensusError, ConsensusReducer};
use dirauth_crypto::AuthorityKeys;
use dirauth_netdoc::{
    format_detached_signatures, format_signatures, parse_consensus, parse_detached_signatures,
    parse_vote, signature_section_start, split_documents, TimingRules,
};
use dirauth_types::{
    AuthorityRoster, Consensus, Digest256, Flavor, IdentityDigest, SignatureStatus, Vote,
};

use crate::merge::add_detached_signatures;
use crate::verify::{check_consensus_signatures, check_vote_signatures, count_good_authorities};
use crate::{LedgerError, VoteSource, VotingWindow};

const RUNNING_FLAG: &str = "Running";

/// A vote together with the text it was parsed from.
#[derive(Clone, Debug)]
pub struct StoredVote {
    pub vote: Vote,
    pub text: String,
}

/// A computed consensus waiting for signatures.
#[derive(Clone, Debug)]
pub struct PendingConsensus {
    pub text: String,
    pub consensus: Consensus,
}

/// What happened to an accepted vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    Added,
    /// An older vote from the same authority was replaced.
    Replaced,
    /// The identical vote was already pending.
    Duplicate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptedVote {
    pub outcome: AcceptOutcome,
    pub identity: IdentityDigest,
    pub digest: Digest256,
}

/// How to find a stored vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteLookup {
    /// By authority identity (primary or legacy).
    ById(IdentityDigest),
    /// By digest of the vote's signed portion.
    ByDigest(Digest256),
    /// Our own vote.
    Own,
}

/// A consensus that reached signature quorum.
#[derive(Clone, Debug)]
pub struct PublishedConsensus {
    pub flavor: Flavor,
    pub text: String,
    pub signers: usize,
}

pub struct VoteLedger {
    roster: AuthorityRoster,
    own_identity: IdentityDigest,
    timing: TimingRules,
    pending_votes: BTreeMap<IdentityDigest, StoredVote>,
    previous_votes: BTreeMap<IdentityDigest, StoredVote>,
    pending_consensus: BTreeMap<Flavor, PendingConsensus>,
    pending_signatures: Option<String>,
    queued_signatures: Vec<String>,
    published: BTreeMap<Flavor, PendingConsensus>,
}

impl VoteLedger {
    pub fn new(roster: AuthorityRoster, own_identity: IdentityDigest, timing: TimingRules) -> Self {
        Self {
            roster,
            own_identity,
            timing,
            pending_votes: BTreeMap::new(),
            previous_votes: BTreeMap::new(),
            pending_consensus: BTreeMap::new(),
            pending_signatures: None,
            queued_signatures: Vec::new(),
            published: BTreeMap::new(),
        }
    }

    pub fn roster(&self) -> &AuthorityRoster {
        &self.roster
    }

    pub fn pending_vote_count(&self) -> usize {
        self.pending_votes.len()
    }

    pub fn pending_flavors(&self) -> Vec<Flavor> {
        self.pending_consensus.keys().copied().collect()
    }

    pub fn pending_consensus(&self, flavor: Flavor) -> Option<&PendingConsensus> {
        self.pending_consensus.get(&flavor)
    }

    /// The detached signature document for the pending consensuses.
    pub fn pending_signatures(&self) -> Option<&str> {
        self.pending_signatures.as_deref()
    }

    pub fn queued_signature_count(&self) -> usize {
        self.queued_signatures.len()
    }

    /// The last consensus published for `flavor`.
    pub fn published(&self, flavor: Flavor) -> Option<&PendingConsensus> {
        self.published.get(&flavor)
    }

    // ── Votes ───────────────────────────────────────────────────────────

    /// Accept every vote document in `body`. Each document is handled
    /// independently; one failure does not affect the others.
    pub fn accept_votes(
        &mut self,
        body: &str,
        source: VoteSource,
        window: &VotingWindow,
    ) -> Vec<Result<AcceptedVote, LedgerError>> {
        split_documents(body)
            .map(|doc| {
                let result = self.accept_vote(doc, source, window);
                if let Err(e) = &result {
                    tracing::warn!(source = source.label(), error = %e, "rejected vote");
                }
                result
            })
            .collect()
    }

    /// Accept one vote document.
    pub fn accept_vote(
        &mut self,
        text: &str,
        source: VoteSource,
        window: &VotingWindow,
    ) -> Result<AcceptedVote, LedgerError> {
        let mut vote = parse_vote(text, &self.timing)?;
        let identity = *vote.identity();
        let digest = *vote.digest();

        if !self.roster.contains(&identity) {
            tracing::info!(voter = %identity, "vote from unrecognized authority");
            return Err(LedgerError::UnknownAuthority);
        }
        if !check_vote_signatures(&mut vote, &self.roster) {
            return Err(LedgerError::NoValidSignature);
        }
        if vote.valid_after != window.valid_after {
            tracing::warn!(
                voter = %identity,
                got = %vote.valid_after,
                expected = %window.valid_after,
                "vote for the wrong period"
            );
            return Err(LedgerError::BadValidAfter);
        }
        if let VoteSource::Posted { received_at } = source {
            if received_at > window.fetch_missing_votes {
                return Err(LedgerError::PostedTooLate);
            }
        }

        let outcome = match self.pending_votes.get(&identity) {
            Some(existing) if existing.vote.digest() == vote.digest() => {
                tracing::info!(voter = %identity, "discarding a vote we already have");
                return Ok(AcceptedVote {
                    outcome: AcceptOutcome::Duplicate,
                    identity,
                    digest,
                });
            }
            Some(existing) if existing.vote.published < vote.published => {
                tracing::info!(voter = %identity, "replacing an older pending vote from this directory");
                AcceptOutcome::Replaced
            }
            Some(_) => return Err(LedgerError::NewerVotePending),
            None => AcceptOutcome::Added,
        };

        tracing::info!(
            voter = %identity,
            digest = %digest,
            source = source.label(),
            routers = vote.routers.len(),
            "accepted vote"
        );
        self.pending_votes.insert(
            identity,
            StoredVote {
                vote,
                text: text.to_string(),
            },
        );
        Ok(AcceptedVote {
            outcome,
            identity,
            digest,
        })
    }

    /// Find a vote by identity, digest, or our own.
    pub fn get_vote(
        &self,
        lookup: VoteLookup,
        include_pending: bool,
        include_previous: bool,
    ) -> Option<&StoredVote> {
        let mut pools = Vec::with_capacity(2);
        if include_pending {
            pools.push(&self.pending_votes);
        }
        if include_previous {
            pools.push(&self.previous_votes);
        }
        let own = self.own_identity;
        pools.into_iter().find_map(|pool| {
            pool.values().find(|stored| {
                let voter = &stored.vote.voter;
                match lookup {
                    VoteLookup::ById(id) => voter.identity == id || voter.legacy_identity == Some(id),
                    VoteLookup::ByDigest(d) => voter.vote_digest == d,
                    VoteLookup::Own => voter.identity == own,
                }
            })
        })
    }

    /// Roster authorities we have no pending vote from.
    pub fn missing_voters(&self) -> Vec<IdentityDigest> {
        self.roster
            .iter()
            .map(|e| e.identity)
            .filter(|id| !self.pending_votes.contains_key(id))
            .collect()
    }

    // ── Consensus ───────────────────────────────────────────────────────

    /// Compute every flavor's consensus from the pending votes, sign it,
    /// and return the detached signature document to broadcast.
    pub fn compute_all(&mut self, keys: &AuthorityKeys) -> Result<String, LedgerError> {
        let total = self.roster.len();
        let have = self.pending_votes.len();
        if have <= total / 2 {
            tracing::warn!(have, total, "we don't have enough votes to generate a consensus");
            return Err(LedgerError::InsufficientVotes {
                have,
                need: total / 2 + 1,
            });
        }
        let votes: Vec<Vote> = self.pending_votes.values().map(|s| s.vote.clone()).collect();
        if !votes.iter().any(|v| v.knows_flag(RUNNING_FLAG)) {
            tracing::warn!(
                "nobody has voted on the Running flag; a consensus without Running relays would make clients stop working"
            );
            return Err(LedgerError::NoRunningConsensus);
        }

        let reducer = ConsensusReducer::new(total, self.timing, keys);
        let own = keys.identity_digest();
        let mut computed: BTreeMap<Flavor, PendingConsensus> = BTreeMap::new();
        for flavor in Flavor::ALL {
            let reduced = match reducer.reduce(&votes, flavor) {
                Ok(r) => r,
                Err(ConsensusError::NoRunningConsensus) => return Err(LedgerError::NoRunningConsensus),
                Err(e) => {
                    tracing::warn!(flavor = %flavor, error = %e, "couldn't generate consensus flavor");
                    continue;
                }
            };
            let mut consensus = reduced.consensus;
            check_consensus_signatures(&mut consensus, &self.roster);
            let own_good = consensus
                .voter(&own)
                .and_then(|v| v.signature_by_alg(flavor.signing_digest()))
                .is_some_and(|s| s.is_good());
            if !own_good {
                tracing::error!(flavor = %flavor, "couldn't verify our own signature on the consensus we generated");
                continue;
            }
            tracing::info!(
                flavor = %flavor,
                method = consensus.consensus_method,
                routers = consensus.routers.len(),
                "generated consensus"
            );
            computed.insert(
                flavor,
                PendingConsensus {
                    text: reduced.text,
                    consensus,
                },
            );
        }
        if computed.is_empty() {
            return Err(LedgerError::NoFlavorComputed);
        }

        let detached = detached_document(&computed)?;

        self.pending_consensus = computed;
        self.pending_signatures = Some(detached);

        let queued = std::mem::take(&mut self.queued_signatures);
        for text in queued {
            if let Err(e) = self.merge_signatures(&text, "pending queue") {
                tracing::warn!(error = %e, "could not add queued signature to new consensus");
            }
        }

        self.pending_signatures
            .clone()
            .ok_or(LedgerError::NoPendingConsensus)
    }

    /// Merge a detached signature document into the pending consensuses,
    /// returning how many signatures were added. Signatures arriving before
    /// any consensus is computed are queued.
    pub fn merge_signatures(&mut self, text: &str, source: &str) -> Result<usize, LedgerError> {
        if !self.pending_consensus.contains_key(&Flavor::Ns) {
            tracing::debug!(source, "no pending consensus; queuing detached signatures");
            self.queued_signatures.push(text.to_string());
            return Ok(0);
        }
        let sigs = parse_detached_signatures(text)?;

        let mut added = 0;
        let mut last_error = None;
        for (flavor, pending) in self.pending_consensus.iter_mut() {
            match add_detached_signatures(&mut pending.consensus, &sigs, &self.roster, source) {
                Ok(0) => {}
                Ok(n) => {
                    rewrite_signatures(pending, &self.roster, &self.timing)?;
                    tracing::debug!(flavor = %flavor, added = n, "added signatures to consensus");
                    added += n;
                }
                Err(e) => {
                    tracing::warn!(flavor = %flavor, source, error = %e, "unable to add signatures to consensus");
                    last_error = Some(e);
                }
            }
        }
        if added == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        if added > 0 {
            let consensuses = self
                .pending_consensus
                .iter()
                .map(|(f, p)| (*f, p.consensus.clone()))
                .collect();
            self.pending_signatures = Some(format_detached_signatures(&consensuses)?);
        }
        Ok(added)
    }

    /// Whether some pending flavor still lacks a good signature from a
    /// roster authority.
    pub fn needs_signatures(&self) -> bool {
        self.pending_consensus
            .values()
            .any(|p| count_good_authorities(&p.consensus, &self.roster) < self.roster.len())
    }

    /// Move every pending flavor signed by more than half of the roster to
    /// the published set and return it. Others stay pending.
    pub fn publish(&mut self) -> Vec<PublishedConsensus> {
        let quorum = self.roster.len() / 2;
        let mut out = Vec::new();
        for (flavor, pending) in &self.pending_consensus {
            let signers = count_good_authorities(&pending.consensus, &self.roster);
            if signers <= quorum {
                tracing::warn!(flavor = %flavor, signers, "not enough info to publish pending consensus");
                continue;
            }
            tracing::info!(flavor = %flavor, signers, "published consensus");
            self.published.insert(*flavor, pending.clone());
            out.push(PublishedConsensus {
                flavor: *flavor,
                text: pending.text.clone(),
                signers,
            });
        }
        out
    }

    /// End the period. Pending votes become the previous period's votes,
    /// or with `all_votes` every stored vote is dropped. Pending consensus
    /// and signature state is always cleared.
    pub fn rotate_period(&mut self, all_votes: bool) {
        if all_votes {
            self.pending_votes.clear();
            self.previous_votes.clear();
        } else {
            self.previous_votes = std::mem::take(&mut self.pending_votes);
        }
        self.pending_consensus.clear();
        self.pending_signatures = None;
        self.queued_signatures.clear();
    }
}

fn detached_document(computed: &BTreeMap<Flavor, PendingConsensus>) -> Result<String, LedgerError> {
    let consensuses: BTreeMap<Flavor, Consensus> = computed
        .iter()
        .map(|(f, p)| (*f, p.consensus.clone()))
        .collect();
    let detached = format_detached_signatures(&consensuses).map_err(|e| {
        tracing::warn!(error = %e, "couldn't generate detached signatures");
        LedgerError::NoFlavorComputed
    })?;
    parse_detached_signatures(&detached).map_err(|e| {
        tracing::error!(error = %e, "couldn't parse detached signatures we generated");
        LedgerError::Other(format!("generated detached signatures didn't parse: {e}"))
    })?;
    Ok(detached)
}

/// Replace the signature section of `pending.text` with the signatures now
/// held, re-parse it, and re-check the signatures.
fn rewrite_signatures(
    pending: &mut PendingConsensus,
    roster: &AuthorityRoster,
    timing: &TimingRules,
) -> Result<(), LedgerError> {
    let start = signature_section_start(&pending.text)
        .ok_or_else(|| LedgerError::Other("pending consensus has no signature section".into()))?;
    let mut text = pending.text[..start].to_string();
    text.push_str(&format_signatures(&pending.consensus, false));

    let mut consensus = parse_consensus(&text, timing)
        .map_err(|e| LedgerError::Other(format!("generated consensus didn't parse: {e}")))?;
    // Carry over what we already know so bad signatures stay bad.
    for voter in consensus.voters.iter_mut() {
        for sig in voter.signatures.iter_mut() {
            let known = pending
                .consensus
                .voter(&sig.identity)
                .and_then(|v| v.signature_by_alg(sig.alg))
                .filter(|held| held.signature == sig.signature)
                .map(|held| held.status);
            sig.status = known.unwrap_or(SignatureStatus::Unchecked);
        }
    }
    check_consensus_signatures(&mut consensus, roster);

    pending.text = text;
    pending.consensus = consensus;
    Ok(())
}
