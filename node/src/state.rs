//! Everything an authority holds for the voting protocol.

use dirauth_crypto::AuthorityKeys;
use dirauth_ledger::{VoteLedger, VotingWindow};
use dirauth_netdoc::TimingRules;
use dirauth_types::{AuthorityRoster, Flavor, Timestamp};

use crate::{ScheduleTiming, VotingSchedule};

/// The schedule, the ledger and our keys. One per running authority,
/// created at startup and dropped (with every pending document) at
/// shutdown.
pub struct AuthorityVotingState {
    pub schedule: VotingSchedule,
    pub ledger: VoteLedger,
    pub(crate) keys: AuthorityKeys,
    configured: ScheduleTiming,
}

impl AuthorityVotingState {
    pub fn new(
        roster: AuthorityRoster,
        keys: AuthorityKeys,
        rules: TimingRules,
        configured: ScheduleTiming,
        now: Timestamp,
    ) -> Self {
        let ledger = VoteLedger::new(roster, keys.identity_digest(), rules);
        Self {
            schedule: VotingSchedule::on_demand(now, &configured),
            ledger,
            keys,
            configured,
        }
    }

    pub fn keys(&self) -> &AuthorityKeys {
        &self.keys
    }

    /// Timing of the ns consensus being served at `now`, or the configured
    /// timing when none is live.
    pub fn current_timing(&self, now: Timestamp) -> ScheduleTiming {
        self.ledger
            .published(Flavor::Ns)
            .map(|p| &p.consensus)
            .filter(|c| c.valid_after <= now && now <= c.valid_until)
            .map(|c| ScheduleTiming::from_consensus(c, self.configured.offset_secs))
            .unwrap_or(self.configured)
    }

    pub fn recalculate_schedule(&mut self, now: Timestamp) {
        let timing = self.current_timing(now);
        self.schedule.recalculate(now, &timing);
    }

    /// What incoming votes are checked against.
    pub fn window(&self) -> VotingWindow {
        VotingWindow {
            valid_after: self.schedule.interval_starts,
            fetch_missing_votes: self.schedule.fetch_missing_votes,
        }
    }
}
