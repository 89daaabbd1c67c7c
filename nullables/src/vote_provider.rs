//! Nullable own-vote source: answers with scripted vote text.

use std::cell::RefCell;
use std::collections::BTreeMap;

use dirauth_node::{NodeError, OwnVoteProvider};
use dirauth_types::Timestamp;

/// Hands out the vote scripted for each period; periods without one fail.
#[derive(Default)]
pub struct NullVoteProvider {
    votes: RefCell<BTreeMap<Timestamp, String>>,
    requests: RefCell<Vec<Timestamp>>,
}

impl NullVoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, valid_after: Timestamp, text: String) {
        self.votes.borrow_mut().insert(valid_after, text);
    }

    /// Periods our vote was asked for.
    pub fn requests(&self) -> Vec<Timestamp> {
        self.requests.borrow().clone()
    }
}

impl OwnVoteProvider for NullVoteProvider {
    fn own_vote(&self, valid_after: Timestamp) -> Result<String, NodeError> {
        self.requests.borrow_mut().push(valid_after);
        self.votes
            .borrow()
            .get(&valid_after)
            .cloned()
            .ok_or_else(|| NodeError::NoOwnVote(format!("nothing scripted for {valid_after}")))
    }
}
