//! Vote and signature state for one voting period.
//!
//! Votes arrive in any order, from ourselves and from every other
//! authority. Once a majority is in, a consensus is computed per flavor
//! and held pending while detached signatures from other authorities are
//! folded in. A flavor is published when more than half of the roster
//! has signed it.

pub mod error;
pub mod ledger;
pub mod merge;
pub mod verify;
pub mod window;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::LedgerError;
pub use ledger::{
    AcceptOutcome, AcceptedVote, PendingConsensus, PublishedConsensus, StoredVote, VoteLedger,
    VoteLookup,
};
pub use merge::add_detached_signatures;
pub use verify::{check_consensus_signatures, check_vote_signatures, count_good_authorities};
pub use window::{VoteSource, VotingWindow};
