//! `package` lines: recommended software packages.

use std::collections::BTreeMap;

use dirauth_types::Vote;
use dirauth_utils::most_frequent;

/// Minimum number of voters that must list a package key.
pub const MIN_VOTERS_FOR_PACKAGE: usize = 3;

/// Check a `name version url digests...` package line.
pub fn validate_package_line(line: &str) -> bool {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() < 4 || tokens[..3].iter().any(|t| t.is_empty()) {
        return false;
    }
    let printable = |s: &str| s.chars().all(|c| c.is_ascii_graphic());
    if !tokens[..3].iter().all(|t| printable(t)) {
        return false;
    }
    tokens[3..].iter().all(|digest| match digest.split_once('=') {
        Some((alg, value)) => {
            !alg.is_empty() && !value.is_empty() && printable(alg) && printable(value)
        }
        None => false,
    })
}

/// Combine package lines from every vote.
///
/// Lines are keyed by `name version`; each voter contributes its last line
/// for a key. A key is published when at least three voters list it and
/// its most common line is chosen by more than half of them. The result is
/// sorted.
pub fn compute_package_lines(votes: &[Vote]) -> Vec<String> {
    let mut by_key: BTreeMap<&str, Vec<Option<&str>>> = BTreeMap::new();
    for (idx, vote) in votes.iter().enumerate() {
        for line in &vote.package_lines {
            if !validate_package_line(line) {
                continue;
            }
            let Some(key) = package_key(line) else {
                continue;
            };
            let slots = by_key.entry(key).or_insert_with(|| vec![None; votes.len()]);
            slots[idx] = Some(line.as_str());
        }
    }

    let mut result = Vec::new();
    for slots in by_key.values() {
        let mut entries: Vec<&str> = slots.iter().flatten().copied().collect();
        entries.sort_unstable();
        let n_voting = entries.len();
        let Some(best) = most_frequent(&entries) else {
            continue;
        };
        let count = entries.iter().filter(|e| *e == best).count();
        if n_voting >= MIN_VOTERS_FOR_PACKAGE && count > n_voting / 2 {
            result.push(best.to_string());
        }
    }
    result.sort();
    result
}

fn package_key(line: &str) -> Option<&str> {
    let first = line.find(' ')?;
    let second = line[first + 1..].find(' ')? + first + 1;
    Some(&line[..second])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_vote;

    const LINE_A: &str = "tor 0.4.8.10 https://dist.example/tor sha256=aaaa";
    const LINE_B: &str = "tor 0.4.8.10 https://dist.example/tor sha256=bbbb";

    fn votes_with(packages: &[&[&str]]) -> Vec<Vote> {
        packages
            .iter()
            .enumerate()
            .map(|(i, lines)| {
                let mut v = make_vote(i as u8 + 1, &[]);
                v.package_lines = lines.iter().map(|s| s.to_string()).collect();
                v
            })
            .collect()
    }

    #[test]
    fn majority_line_is_published() {
        let votes = votes_with(&[&[LINE_A], &[LINE_A], &[LINE_B]]);
        assert_eq!(compute_package_lines(&votes), vec![LINE_A.to_string()]);
    }

    #[test]
    fn needs_three_voters() {
        let votes = votes_with(&[&[LINE_A], &[LINE_A], &[]]);
        assert!(compute_package_lines(&votes).is_empty());
    }

    #[test]
    fn last_line_per_voter_wins() {
        let votes = votes_with(&[&[LINE_A, LINE_B], &[LINE_B], &[LINE_B], &[LINE_A]]);
        assert_eq!(compute_package_lines(&votes), vec![LINE_B.to_string()]);
    }

    #[test]
    fn validation() {
        assert!(validate_package_line(LINE_A));
        assert!(!validate_package_line("tor 0.4.8.10 https://x"));
        assert!(!validate_package_line("tor 0.4.8.10 https://x nodigest"));
    }
}
