//! Subprotocol version lists (`Link=1-5 Relay=1-4`) and the weighted vote
//! over them.

use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Highest subprotocol version that can be listed.
pub const MAX_PROTOCOL_VERSION: u32 = 63;

/// Expand a protocol list into `Name=version` singletons.
///
/// Returns `None` when the list is malformed.
pub fn expand_protocol_list(list: &str) -> Option<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    for entry in list.split_whitespace() {
        let (name, ranges) = entry.split_once('=')?;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
        if ranges.is_empty() {
            continue;
        }
        for range in ranges.split(',') {
            let (low, high) = match range.split_once('-') {
                Some((l, h)) => (l.parse::<u32>().ok()?, h.parse::<u32>().ok()?),
                None => {
                    let v = range.parse::<u32>().ok()?;
                    (v, v)
                }
            };
            if low > high || high > MAX_PROTOCOL_VERSION {
                return None;
            }
            for v in low..=high {
                out.insert(format!("{name}={v}"));
            }
        }
    }
    Some(out)
}

/// Contract sorted `Name=version` singletons back into ranges.
///
/// Names appear in the order of their first singleton.
pub fn contract_protocol_list(singletons: &[&str]) -> String {
    let mut groups: Vec<(&str, u64)> = Vec::new();
    for entry in singletons {
        let Some((name, version)) = entry.split_once('=') else {
            continue;
        };
        let Ok(v) = version.parse::<u32>() else {
            continue;
        };
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, mask)) => *mask |= 1u64 << v,
            None => groups.push((name, 1u64 << v)),
        }
    }

    let entries: Vec<String> = groups
        .into_iter()
        .map(|(name, mask)| format!("{name}={}", format_ranges(mask)))
        .collect();
    entries.join(" ")
}

fn format_ranges(mask: u64) -> String {
    let mut out = String::new();
    let mut v = 0u32;
    while v <= MAX_PROTOCOL_VERSION {
        if mask & (1u64 << v) == 0 {
            v += 1;
            continue;
        }
        let start = v;
        while v < MAX_PROTOCOL_VERSION && mask & (1u64 << (v + 1)) != 0 {
            v += 1;
        }
        if !out.is_empty() {
            out.push(',');
        }
        if start == v {
            let _ = write!(out, "{start}");
        } else {
            let _ = write!(out, "{start}-{v}");
        }
        v += 1;
    }
    out
}

/// Vote over protocol lists: keep each `Name=version` that at least
/// `threshold` lists contain.
pub fn compute_protocol_vote(lists: &[&str], threshold: usize) -> String {
    let mut pooled: Vec<String> = Vec::new();
    for list in lists {
        match expand_protocol_list(list) {
            Some(expanded) => pooled.extend(expanded),
            None => tracing::warn!(
                list = %list,
                "failed to parse a protocol list from an authority"
            ),
        }
    }
    pooled.sort();

    let kept: Vec<&str> = pooled
        .chunk_by(|a, b| a == b)
        .filter(|run| run.len() >= threshold)
        .map(|run| run[0].as_str())
        .collect();
    contract_protocol_list(&kept)
}
