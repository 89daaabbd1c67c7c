//! Nullable transport: records outbound documents and requests.

use std::cell::RefCell;

use dirauth_node::{AuthorityTransport, NodeError};
use dirauth_types::IdentityDigest;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCall {
    BroadcastVote(String),
    BroadcastSignatures(String),
    FetchMissingVotes(Vec<IdentityDigest>),
    FetchMissingSignatures,
}

#[derive(Default)]
pub struct NullTransport {
    calls: RefCell<Vec<TransportCall>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.borrow().clone()
    }

    pub fn sent_votes(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                TransportCall::BroadcastVote(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sent_signatures(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                TransportCall::BroadcastSignatures(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reset(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl AuthorityTransport for NullTransport {
    fn broadcast_vote(&self, text: &str) -> Result<(), NodeError> {
        self.calls
            .borrow_mut()
            .push(TransportCall::BroadcastVote(text.to_string()));
        Ok(())
    }

    fn broadcast_signatures(&self, text: &str) -> Result<(), NodeError> {
        self.calls
            .borrow_mut()
            .push(TransportCall::BroadcastSignatures(text.to_string()));
        Ok(())
    }

    fn fetch_missing_votes(&self, missing: &[IdentityDigest]) -> Result<(), NodeError> {
        self.calls
            .borrow_mut()
            .push(TransportCall::FetchMissingVotes(missing.to_vec()));
        Ok(())
    }

    fn fetch_missing_signatures(&self) -> Result<(), NodeError> {
        self.calls
            .borrow_mut()
            .push(TransportCall::FetchMissingSignatures);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let transport = NullTransport::new();
        transport.broadcast_vote("vote").unwrap();
        transport.fetch_missing_signatures().unwrap();
        transport.broadcast_signatures("sigs").unwrap();
        assert_eq!(transport.calls().len(), 3);
        assert_eq!(transport.sent_votes(), vec!["vote".to_string()]);
        assert_eq!(transport.sent_signatures(), vec!["sigs".to_string()]);
        transport.reset();
        assert!(transport.calls().is_empty());
    }
}
