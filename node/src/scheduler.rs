//! The per-period phase machine.
//!
//! [`VotingScheduler::tick`] is called with the current time and runs
//! every phase whose time has come, in order, once per period. Phases
//! advance on time alone: a failed action is logged and not retried
//! until the next period. After publishing, the next period's schedule is
//! computed and its vote time returned as the next wakeup.

use dirauth_ledger::{AcceptedVote, LedgerError, VoteSource};
use dirauth_types::Timestamp;

use crate::{
    AuthorityMetrics, AuthorityTransport, AuthorityVotingState, ConsensusPublisher, NodeError,
    OwnVoteProvider, ScheduledAction,
};

pub struct VotingScheduler<V, T, P> {
    state: AuthorityVotingState,
    votes: V,
    transport: T,
    publisher: P,
    metrics: AuthorityMetrics,
}

impl<V, T, P> VotingScheduler<V, T, P>
where
    V: OwnVoteProvider,
    T: AuthorityTransport,
    P: ConsensusPublisher,
{
    pub fn new(
        state: AuthorityVotingState,
        votes: V,
        transport: T,
        publisher: P,
        metrics: AuthorityMetrics,
    ) -> Self {
        Self {
            state,
            votes,
            transport,
            publisher,
            metrics,
        }
    }

    pub fn state(&self) -> &AuthorityVotingState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AuthorityVotingState {
        &mut self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn metrics(&self) -> &AuthorityMetrics {
        &self.metrics
    }

    /// Run whatever is due at `now` and return when to call again.
    pub fn tick(&mut self, now: Timestamp) -> Timestamp {
        if self.state.schedule.created_on_demand {
            tracing::info!(
                authorities = ?self.state.ledger.roster().fingerprints(),
                mine = %self.state.keys().identity_digest(),
                "scheduling voting"
            );
            self.state.recalculate_schedule(now);
        }

        while let Some((action, at)) = self.state.schedule.next_action() {
            if at > now {
                return at;
            }
            match action {
                ScheduledAction::Vote => {
                    tracing::info!("Time to vote.");
                    self.perform_vote();
                }
                ScheduledAction::FetchMissingVotes => {
                    tracing::info!("Time to fetch any votes that we're missing.");
                    self.fetch_missing_votes();
                }
                ScheduledAction::ComputeConsensus => {
                    tracing::info!("Time to compute a consensus.");
                    self.compute_consensuses();
                }
                ScheduledAction::FetchMissingSignatures => {
                    tracing::info!("Time to fetch any signatures that we're missing.");
                    self.fetch_missing_signatures();
                }
                ScheduledAction::Publish => {
                    tracing::info!("Time to publish the consensus and discard old votes");
                    self.publish_consensus();
                    self.state.ledger.rotate_period(false);
                    self.state.schedule.mark_done(action);
                    self.state.recalculate_schedule(now);
                    self.update_gauges();
                    return self.state.schedule.voting_starts;
                }
            }
            self.state.schedule.mark_done(action);
            self.update_gauges();
        }
        now.plus(1)
    }

    /// Vote documents received from another authority, or fetched by us.
    pub fn receive_votes(
        &mut self,
        body: &str,
        source: VoteSource,
    ) -> Vec<Result<AcceptedVote, LedgerError>> {
        let window = self.state.window();
        let results = self.state.ledger.accept_votes(body, source, &window);
        for result in &results {
            match result {
                Ok(_) => self.metrics.votes_accepted.inc(),
                Err(_) => self.metrics.votes_rejected.inc(),
            }
        }
        self.update_gauges();
        results
    }

    /// A detached signature document from `source`.
    pub fn receive_signatures(&mut self, text: &str, source: &str) -> Result<usize, NodeError> {
        let added = self.state.ledger.merge_signatures(text, source)?;
        self.metrics.signatures_added.inc_by(added as u64);
        Ok(added)
    }

    // ── Phase actions ───────────────────────────────────────────────────

    fn perform_vote(&mut self) {
        let valid_after = self.state.schedule.interval_starts;
        let text = match self.votes.own_vote(valid_after) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "couldn't generate our vote");
                return;
            }
        };
        let window = self.state.window();
        let stored = self
            .state
            .ledger
            .accept_votes(&text, VoteSource::Local, &window)
            .into_iter()
            .next();
        match stored {
            Some(Ok(_)) => {
                self.metrics.votes_accepted.inc();
                match self.transport.broadcast_vote(&text) {
                    Ok(()) => tracing::info!("Vote posted."),
                    Err(e) => tracing::warn!(error = %e, "couldn't post our vote"),
                }
            }
            Some(Err(e)) => {
                self.metrics.votes_rejected.inc();
                tracing::warn!(error = %e, "Couldn't store my own vote!");
            }
            None => tracing::warn!("our vote provider returned an empty document"),
        }
    }

    fn fetch_missing_votes(&mut self) {
        let missing = self.state.ledger.missing_voters();
        if missing.is_empty() {
            return;
        }
        let fingerprints: Vec<String> = missing.iter().map(|id| id.to_hex()).collect();
        tracing::info!(
            count = missing.len(),
            missing = %fingerprints.join(" "),
            "We're missing votes; asking every other authority for a copy"
        );
        if let Err(e) = self.transport.fetch_missing_votes(&missing) {
            tracing::warn!(error = %e, "couldn't request missing votes");
        }
    }

    fn compute_consensuses(&mut self) {
        let AuthorityVotingState { ledger, keys, .. } = &mut self.state;
        match ledger.compute_all(keys) {
            Ok(detached) => {
                self.metrics
                    .consensuses_computed
                    .inc_by(self.state.ledger.pending_flavors().len() as u64);
                if let Err(e) = self.transport.broadcast_signatures(&detached) {
                    tracing::warn!(error = %e, "couldn't post our signatures");
                }
            }
            Err(e) => tracing::warn!(error = %e, "couldn't compute a consensus"),
        }
    }

    fn fetch_missing_signatures(&mut self) {
        if !self.state.ledger.needs_signatures() {
            return;
        }
        if let Err(e) = self.transport.fetch_missing_signatures() {
            tracing::warn!(error = %e, "couldn't request missing signatures");
        }
    }

    fn publish_consensus(&mut self) {
        for published in self.state.ledger.publish() {
            match self.publisher.publish(published.flavor, &published.text) {
                Ok(()) => {
                    self.metrics.consensuses_published.inc();
                    tracing::info!(flavor = %published.flavor, signers = published.signers, "Published consensus");
                }
                Err(e) => {
                    tracing::warn!(flavor = %published.flavor, error = %e, "Error publishing consensus")
                }
            }
        }
    }

    fn update_gauges(&self) {
        self.metrics
            .pending_votes
            .set(self.state.ledger.pending_vote_count() as i64);
        self.metrics
            .pending_flavors
            .set(self.state.ledger.pending_flavors().len() as i64);
    }
}
