//! Joins votes by router identity.
//!
//! For every identity listed by any vote, the collator yields one slot per
//! vote holding that vote's entry (or nothing). When more than half of the
//! authorities agree on the router's ed25519 identity, entries carrying a
//! different ed25519 key are discarded and the rest are marked canonical.

use std::collections::BTreeMap;

use dirauth_types::{IdentityDigest, Vote, VoteRouterStatus};

/// One router as seen by every vote.
#[derive(Debug)]
pub struct CollatedRouter<'a> {
    pub identity: IdentityDigest,
    /// `entries[i]` is vote `i`'s entry for this router.
    pub entries: Vec<Option<&'a VoteRouterStatus>>,
    /// Whether the kept entries agree on an ed25519 identity held by a
    /// majority of the authorities.
    pub ed25519_canonical: bool,
}

impl<'a> CollatedRouter<'a> {
    /// Entries that are present, with the index of the vote they came from.
    pub fn listing(&self) -> impl Iterator<Item = (usize, &'a VoteRouterStatus)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, rs)| rs.map(|rs| (idx, rs)))
    }

    pub fn n_listing(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

/// Collate `votes` into identity order.
pub fn collate(votes: &[Vote], total_authorities: usize) -> Vec<CollatedRouter<'_>> {
    let mut by_identity: BTreeMap<IdentityDigest, Vec<Option<&VoteRouterStatus>>> =
        BTreeMap::new();
    for (idx, vote) in votes.iter().enumerate() {
        for rs in &vote.routers {
            let slots = by_identity
                .entry(rs.identity)
                .or_insert_with(|| vec![None; votes.len()]);
            slots[idx] = Some(rs);
        }
    }

    by_identity
        .into_iter()
        .map(|(identity, entries)| resolve_ed25519(identity, entries, total_authorities))
        .collect()
}

fn resolve_ed25519<'a>(
    identity: IdentityDigest,
    mut entries: Vec<Option<&'a VoteRouterStatus>>,
    total_authorities: usize,
) -> CollatedRouter<'a> {
    let mut counts: BTreeMap<[u8; 32], usize> = BTreeMap::new();
    for ed in entries.iter().flatten().filter_map(|rs| rs.ed25519_id) {
        *counts.entry(ed).or_default() += 1;
    }
    let majority = counts
        .into_iter()
        .find(|(_, n)| *n > total_authorities / 2)
        .map(|(ed, _)| ed);

    let Some(ed) = majority else {
        return CollatedRouter {
            identity,
            entries,
            ed25519_canonical: false,
        };
    };

    for slot in entries.iter_mut() {
        if slot.is_some_and(|rs| rs.ed25519_id != Some(ed)) {
            *slot = None;
        }
    }
    CollatedRouter {
        identity,
        entries,
        ed25519_canonical: true,
    }
}
