//! When each phase of a voting period happens.
//!
//! Periods are aligned to midnight UTC. For a period starting at `start`
//! with vote delay `V` and distribution delay `D`:
//!
//! ```text
//! start - D - V      vote
//! start - D - V/2    fetch missing votes
//! start - D          compute consensus
//! start - D/2        fetch missing signatures
//! start              publish
//! ```

use dirauth_types::{Consensus, Timestamp};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// The interval and delays a schedule is computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleTiming {
    pub interval_secs: u64,
    pub vote_delay_secs: u64,
    pub dist_delay_secs: u64,
    pub offset_secs: u64,
}

impl ScheduleTiming {
    /// Timing taken from the consensus being served; the offset stays ours.
    pub fn from_consensus(consensus: &Consensus, offset_secs: u64) -> Self {
        Self {
            interval_secs: consensus
                .fresh_until
                .as_secs()
                .saturating_sub(consensus.valid_after.as_secs()),
            vote_delay_secs: u64::from(consensus.vote_seconds),
            dist_delay_secs: u64::from(consensus.dist_seconds),
            offset_secs,
        }
    }
}

/// Start of the first interval after `now`.
///
/// Intervals are counted from midnight UTC and never cross it: an interval
/// that would end after midnight, or last less than half its length before
/// it, is pushed to midnight.
pub fn start_of_interval_after(now: Timestamp, interval: u64, offset: u64) -> Timestamp {
    let interval = interval.clamp(1, SECONDS_PER_DAY);
    let midnight_today = now.start_of_day().as_secs();
    let midnight_tomorrow = midnight_today + SECONDS_PER_DAY;
    let now = now.as_secs();

    let mut next = midnight_today + ((now - midnight_today) / interval + 1) * interval;
    if next > midnight_tomorrow {
        next = midnight_tomorrow;
    }
    if next + interval / 2 > midnight_tomorrow {
        next = midnight_tomorrow;
    }
    next += offset;
    if next - interval > now {
        next -= interval;
    }
    Timestamp::new(next)
}

/// Where a period stands, by the last phase that has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Voted,
    FetchedVotes,
    ComputedConsensus,
    FetchedSignatures,
    Published,
}

/// A phase action the scheduler runs once per period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduledAction {
    Vote,
    FetchMissingVotes,
    ComputeConsensus,
    FetchMissingSignatures,
    Publish,
}

/// Scheduled phase times for one period, and which phases have run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VotingSchedule {
    pub interval: u64,
    pub voting_starts: Timestamp,
    pub fetch_missing_votes: Timestamp,
    pub voting_ends: Timestamp,
    pub fetch_missing_signatures: Timestamp,
    pub interval_starts: Timestamp,

    pub have_voted: bool,
    pub have_fetched_missing_votes: bool,
    pub have_built_consensus: bool,
    pub have_fetched_missing_signatures: bool,
    pub have_published_consensus: bool,

    /// Built on demand rather than by the scheduler; recomputed before the
    /// first transition is evaluated.
    pub created_on_demand: bool,
}

impl VotingSchedule {
    /// A schedule for the next period after `now`, with no phase run yet.
    pub fn compute(now: Timestamp, timing: &ScheduleTiming) -> Self {
        let interval = timing.interval_secs;
        let start = start_of_interval_after(now, interval, timing.offset_secs);
        let vote = timing.vote_delay_secs;
        let dist = timing.dist_delay_secs;

        let schedule = Self {
            interval,
            voting_starts: start.minus(dist + vote),
            fetch_missing_votes: start.minus(dist + vote / 2),
            voting_ends: start.minus(dist),
            fetch_missing_signatures: start.minus(dist / 2),
            interval_starts: start,
            ..Self::default()
        };
        tracing::debug!(
            interval_starts = %schedule.interval_starts,
            voting_starts = %schedule.voting_starts,
            "computed voting schedule"
        );
        schedule
    }

    /// A placeholder built outside the scheduler, e.g. to answer a vote
    /// before the first tick.
    pub fn on_demand(now: Timestamp, timing: &ScheduleTiming) -> Self {
        Self {
            created_on_demand: true,
            ..Self::compute(now, timing)
        }
    }

    /// Replace this schedule with the one for the next period after `now`.
    pub fn recalculate(&mut self, now: Timestamp, timing: &ScheduleTiming) {
        *self = Self::compute(now, timing);
    }

    /// The first action that hasn't run, and when it is due.
    pub fn next_action(&self) -> Option<(ScheduledAction, Timestamp)> {
        [
            (self.have_voted, ScheduledAction::Vote, self.voting_starts),
            (
                self.have_fetched_missing_votes,
                ScheduledAction::FetchMissingVotes,
                self.fetch_missing_votes,
            ),
            (self.have_built_consensus, ScheduledAction::ComputeConsensus, self.voting_ends),
            (
                self.have_fetched_missing_signatures,
                ScheduledAction::FetchMissingSignatures,
                self.fetch_missing_signatures,
            ),
            (self.have_published_consensus, ScheduledAction::Publish, self.interval_starts),
        ]
        .into_iter()
        .find(|(done, _, _)| !done)
        .map(|(_, action, at)| (action, at))
    }

    pub fn mark_done(&mut self, action: ScheduledAction) {
        match action {
            ScheduledAction::Vote => self.have_voted = true,
            ScheduledAction::FetchMissingVotes => self.have_fetched_missing_votes = true,
            ScheduledAction::ComputeConsensus => self.have_built_consensus = true,
            ScheduledAction::FetchMissingSignatures => self.have_fetched_missing_signatures = true,
            ScheduledAction::Publish => self.have_published_consensus = true,
        }
    }

    /// The time of the next phase that hasn't run.
    pub fn next_wakeup(&self) -> Timestamp {
        self.next_action()
            .map(|(_, at)| at)
            .unwrap_or(self.interval_starts)
    }

    pub fn phase(&self) -> Phase {
        if self.have_published_consensus {
            Phase::Published
        } else if self.have_fetched_missing_signatures {
            Phase::FetchedSignatures
        } else if self.have_built_consensus {
            Phase::ComputedConsensus
        } else if self.have_fetched_missing_votes {
            Phase::FetchedVotes
        } else if self.have_voted {
            Phase::Voted
        } else {
            Phase::Idle
        }
    }
}
