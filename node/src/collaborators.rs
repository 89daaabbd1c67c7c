//! The outside world as the scheduler sees it.
//!
//! Every method is synchronous and fire-and-forget: answers to fetches come
//! back later through [`VotingScheduler::receive_votes`] and
//! [`VotingScheduler::receive_signatures`].
//!
//! [`VotingScheduler::receive_votes`]: crate::VotingScheduler::receive_votes
//! [`VotingScheduler::receive_signatures`]: crate::VotingScheduler::receive_signatures

use dirauth_types::{Flavor, IdentityDigest, Timestamp};

use crate::NodeError;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Produces this authority's signed vote for the period starting at
/// `valid_after`.
pub trait OwnVoteProvider {
    fn own_vote(&self, valid_after: Timestamp) -> Result<String, NodeError>;
}

/// Document exchange with the other authorities.
pub trait AuthorityTransport {
    fn broadcast_vote(&self, text: &str) -> Result<(), NodeError>;

    fn broadcast_signatures(&self, text: &str) -> Result<(), NodeError>;

    /// Ask every authority for the votes of `missing`.
    fn fetch_missing_votes(&self, missing: &[IdentityDigest]) -> Result<(), NodeError>;

    /// Ask every authority for its detached signatures.
    fn fetch_missing_signatures(&self) -> Result<(), NodeError>;
}

/// The serving layer: a published consensus replaces whatever was served
/// for its flavor.
pub trait ConsensusPublisher {
    fn publish(&self, flavor: Flavor, text: &str) -> Result<(), NodeError>;
}
