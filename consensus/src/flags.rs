//! Canonical flag table for one reduction pass.
//!
//! Votes encode router flags as bits indexed into their own `known-flags`
//! list. The table holds the sorted union of every vote's flags and, for
//! each vote, the translation from its local bit index to the canonical
//! index.

use dirauth_types::{Vote, VoteRouterStatus, MAX_KNOWN_FLAGS_IN_VOTE};

use crate::ConsensusError;

/// Synthetic flag for routers whose ed25519 identity lacks majority support.
pub const NO_ED_CONSENSUS_FLAG: &str = "NoEdConsensus";

pub struct FlagTable {
    flags: Vec<String>,
    /// `translation[vote][local] = canonical index`.
    translation: Vec<Vec<usize>>,
    /// Number of votes that list each canonical flag.
    voters_knowing: Vec<usize>,
}

impl FlagTable {
    pub fn new(votes: &[Vote]) -> Result<Self, ConsensusError> {
        for vote in votes {
            if vote.known_flags.len() > MAX_KNOWN_FLAGS_IN_VOTE {
                return Err(ConsensusError::TooManyFlags {
                    count: vote.known_flags.len(),
                });
            }
        }

        let mut flags: Vec<String> = votes
            .iter()
            .flat_map(|v| v.known_flags.iter().cloned())
            .collect();
        flags.push(NO_ED_CONSENSUS_FLAG.to_string());
        flags.sort();
        flags.dedup();

        let mut voters_knowing = vec![0usize; flags.len()];
        let mut translation = Vec::with_capacity(votes.len());
        for vote in votes {
            let mut map = Vec::with_capacity(vote.known_flags.len());
            for flag in &vote.known_flags {
                // Every vote flag is in the union by construction.
                let idx = flags.binary_search(flag).unwrap_or_default();
                map.push(idx);
            }
            let mut distinct = map.clone();
            distinct.sort_unstable();
            distinct.dedup();
            for idx in distinct {
                voters_knowing[idx] += 1;
            }
            translation.push(map);
        }

        Ok(Self {
            flags,
            translation,
            voters_knowing,
        })
    }

    /// The canonical flag list, sorted.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn index(&self, flag: &str) -> Option<usize> {
        self.flags.binary_search_by(|f| f.as_str().cmp(flag)).ok()
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.index(flag).is_some()
    }

    /// How many votes list the canonical flag `idx`.
    pub fn voters_knowing(&self, idx: usize) -> usize {
        self.voters_knowing[idx]
    }

    /// Canonical indices of the flags `rs` carries in vote `vote_idx`.
    pub fn canonical_flags<'a>(
        &'a self,
        vote_idx: usize,
        rs: &'a VoteRouterStatus,
    ) -> impl Iterator<Item = usize> + 'a {
        self.translation[vote_idx]
            .iter()
            .enumerate()
            .filter(move |(local, _)| rs.flags & (1u64 << local) != 0)
            .map(|(_, canonical)| *canonical)
    }

    /// Whether `rs` carries `flag` in vote `vote_idx`.
    pub fn has_flag(&self, vote_idx: usize, rs: &VoteRouterStatus, flag: &str) -> bool {
        match self.index(flag) {
            Some(idx) => self.canonical_flags(vote_idx, rs).any(|c| c == idx),
            None => false,
        }
    }
}
