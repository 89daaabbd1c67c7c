//! The slice of the voting schedule that vote acceptance depends on.

use dirauth_types::Timestamp;

/// Timing of the period votes are currently being collected for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VotingWindow {
    /// Start of the period being voted on; every accepted vote must carry
    /// exactly this valid-after time.
    pub valid_after: Timestamp,
    /// Votes posted to us after this time are refused.
    pub fetch_missing_votes: Timestamp,
}

/// How a vote reached us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteSource {
    /// Our own vote.
    Local,
    /// Downloaded by us from another authority.
    Fetched,
    /// Uploaded to us by another authority.
    Posted { received_at: Timestamp },
}

impl VoteSource {
    pub fn label(&self) -> &'static str {
        match self {
            VoteSource::Local => "local",
            VoteSource::Fetched => "fetched",
            VoteSource::Posted { .. } => "posted",
        }
    }
}
