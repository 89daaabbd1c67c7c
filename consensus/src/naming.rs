//! Nickname bindings asserted through the Named and Unnamed flags.

use std::collections::HashMap;

use dirauth_types::{IdentityDigest, Vote};

use crate::flags::FlagTable;

pub const NAMED_FLAG: &str = "Named";
pub const UNNAMED_FLAG: &str = "Unnamed";

/// What the votes collectively say about one (lower-cased) nickname.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameBinding {
    /// Every Named assertion agrees on this identity.
    Named(IdentityDigest),
    /// Votes disagree about who owns the name.
    Conflict,
    /// Only Unnamed assertions exist for the name.
    Unknown,
}

/// Outcome for one router's nickname.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NameStatus {
    pub is_named: bool,
    pub is_unnamed: bool,
}

#[derive(Debug, Default)]
pub struct NameMap {
    bindings: HashMap<String, NameBinding>,
}

impl NameMap {
    /// Scan every vote's Named assertions first, then its Unnamed ones.
    pub fn build(votes: &[Vote], flags: &FlagTable) -> Self {
        let mut bindings: HashMap<String, NameBinding> = HashMap::new();

        for (idx, vote) in votes.iter().enumerate() {
            if !vote.knows_flag(NAMED_FLAG) {
                continue;
            }
            for rs in vote.routers.iter().filter(|rs| flags.has_flag(idx, rs, NAMED_FLAG)) {
                let key = rs.nickname.to_lowercase();
                match bindings.get(&key) {
                    None => {
                        bindings.insert(key, NameBinding::Named(rs.identity));
                    }
                    Some(NameBinding::Named(id)) if *id != rs.identity => {
                        bindings.insert(key, NameBinding::Conflict);
                    }
                    Some(_) => {}
                }
            }
        }

        for (idx, vote) in votes.iter().enumerate() {
            if !vote.knows_flag(UNNAMED_FLAG) {
                continue;
            }
            for rs in vote
                .routers
                .iter()
                .filter(|rs| flags.has_flag(idx, rs, UNNAMED_FLAG))
            {
                let key = rs.nickname.to_lowercase();
                match bindings.get(&key) {
                    None => {
                        bindings.insert(key, NameBinding::Unknown);
                    }
                    Some(NameBinding::Named(id)) if *id == rs.identity => {
                        bindings.insert(key, NameBinding::Conflict);
                    }
                    Some(_) => {}
                }
            }
        }

        Self { bindings }
    }

    pub fn binding(&self, nickname: &str) -> Option<NameBinding> {
        self.bindings.get(&nickname.to_lowercase()).copied()
    }

    /// Named/Unnamed status of `nickname` for the router `identity`.
    ///
    /// A conflicted name is neither Named nor Unnamed.
    pub fn status(&self, nickname: &str, identity: &IdentityDigest) -> NameStatus {
        match self.binding(nickname) {
            None | Some(NameBinding::Conflict) => NameStatus::default(),
            Some(NameBinding::Named(id)) if id == *identity => NameStatus {
                is_named: true,
                is_unnamed: false,
            },
            Some(_) => NameStatus {
                is_named: false,
                is_unnamed: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_router, make_vote};

    #[test]
    fn agreeing_named_assertions_bind_the_name() {
        let votes = vec![
            make_vote(1, &[make_router(5, "Alice", &["Named"])]),
            make_vote(2, &[make_router(5, "alice", &["Named"])]),
        ];
        let table = FlagTable::new(&votes).unwrap();
        let map = NameMap::build(&votes, &table);
        let id = IdentityDigest::new([5; 20]);
        assert_eq!(map.binding("ALICE"), Some(NameBinding::Named(id)));
        assert!(map.status("alice", &id).is_named);
        let other = IdentityDigest::new([6; 20]);
        assert!(map.status("alice", &other).is_unnamed);
    }

    #[test]
    fn disagreeing_named_assertions_conflict() {
        let votes = vec![
            make_vote(1, &[make_router(5, "bob", &["Named"])]),
            make_vote(2, &[make_router(6, "bob", &["Named"])]),
        ];
        let table = FlagTable::new(&votes).unwrap();
        let map = NameMap::build(&votes, &table);
        assert_eq!(map.binding("bob"), Some(NameBinding::Conflict));
        assert_eq!(
            map.status("bob", &IdentityDigest::new([5; 20])),
            NameStatus::default()
        );
    }

    #[test]
    fn unnamed_only_is_unknown() {
        let votes = vec![make_vote(1, &[make_router(5, "carol", &["Unnamed"])])];
        let table = FlagTable::new(&votes).unwrap();
        let map = NameMap::build(&votes, &table);
        assert_eq!(map.binding("carol"), Some(NameBinding::Unknown));
        assert!(map.status("carol", &IdentityDigest::new([5; 20])).is_unnamed);
    }

    #[test]
    fn unnamed_for_bound_identity_conflicts() {
        let votes = vec![
            make_vote(1, &[make_router(5, "dave", &["Named"])]),
            make_vote(2, &[make_router(5, "dave", &["Unnamed"])]),
        ];
        let table = FlagTable::new(&votes).unwrap();
        let map = NameMap::build(&votes, &table);
        assert_eq!(map.binding("dave"), Some(NameBinding::Conflict));
    }
}
