//! Recommended-version lists and the version ordering used to sort them.

use std::cmp::Ordering;

/// A parsed `MAJOR.MINOR.MICRO[.PATCH][-TAG]` version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub patch: u32,
    pub status_tag: String,
}

impl RelayVersion {
    /// Parse a version string. An optional leading `Tor ` and a trailing
    /// ` (...)` annotation are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix("Tor ").unwrap_or(s);
        let s = s.split(" (").next().unwrap_or(s).trim();
        let (numbers, tag) = match s.split_once('-') {
            Some((n, t)) => (n, t),
            None => (s, ""),
        };
        let parts: Vec<u32> = numbers
            .split('.')
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        if !(3..=4).contains(&parts.len()) {
            return None;
        }
        Some(Self {
            major: parts[0],
            minor: parts[1],
            micro: parts[2],
            patch: parts.get(3).copied().unwrap_or(0),
            status_tag: tag.to_string(),
        })
    }

    fn numeric_cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro, self.patch)
            .cmp(&(other.major, other.minor, other.micro, other.patch))
            .then_with(|| self.status_tag.cmp(&other.status_tag))
    }
}

/// Total order on version strings: parseable versions compare numerically
/// and sort before unparseable ones; ties fall back to byte order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let by_version = match (RelayVersion::parse(a), RelayVersion::parse(b)) {
        (Some(va), Some(vb)) => va.numeric_cmp(&vb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_version.then_with(|| a.cmp(b))
}

/// Sort `versions` in version order, optionally removing duplicates.
pub fn sort_versions(versions: &mut Vec<String>, dedup: bool) {
    versions.sort_by(|a, b| compare_versions(a, b));
    if dedup {
        versions.dedup();
    }
}

/// Combine the comma-separated version lists of `n_versioning` voters.
///
/// A version is kept when more than half of those voters list it. The
/// result is comma-joined in version order.
pub fn compute_versions_list(lists: &[&str], n_versioning: usize) -> String {
    let mut pooled: Vec<String> = Vec::new();
    for list in lists {
        let mut tokens: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        sort_versions(&mut tokens, true);
        pooled.extend(tokens);
    }
    sort_versions(&mut pooled, false);

    let threshold = n_versioning / 2;
    let mut kept: Vec<String> = Vec::new();
    for run in pooled.chunk_by(|a, b| a == b) {
        if run.len() > threshold {
            kept.push(run[0].clone());
        }
    }
    for v in kept.iter().filter(|v| v.contains(' ')) {
        tracing::warn!(
            version = %v,
            "at least one authority voted for a version containing a space; this is likely to cause trouble"
        );
    }
    kept.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handles_prefix_tag_and_annotation() {
        let v = RelayVersion::parse("Tor 0.4.8.9-alpha (git-abc)").unwrap();
        assert_eq!((v.major, v.minor, v.micro, v.patch), (0, 4, 8, 9));
        assert_eq!(v.status_tag, "alpha");
        assert_eq!(RelayVersion::parse("0.4.8").unwrap().patch, 0);
        assert!(RelayVersion::parse("banana").is_none());
        assert!(RelayVersion::parse("1.2").is_none());
    }

    #[test]
    fn numeric_not_lexical_order() {
        assert_eq!(compare_versions("0.4.8.10", "0.4.8.9"), Ordering::Greater);
        assert_eq!(compare_versions("0.4.8.9", "0.4.8.9-rc"), Ordering::Less);
        assert_eq!(compare_versions("0.4.8.9", "zzz"), Ordering::Less);
        assert_eq!(compare_versions("b", "a"), Ordering::Greater);
        assert_eq!(compare_versions("0.4.8.9", "0.4.8.9"), Ordering::Equal);
    }

    #[test]
    fn majority_of_versioning_voters() {
        let lists = [
            "0.4.8.9,0.4.8.10",
            "0.4.8.10, 0.4.7.16",
            "0.4.8.10,0.4.8.9,0.4.8.9",
        ];
        // threshold = 3/2 = 1, need > 1
        assert_eq!(compute_versions_list(&lists, 3), "0.4.8.9,0.4.8.10");
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert_eq!(compute_versions_list(&[], 0), "");
        assert_eq!(compute_versions_list(&[""], 1), "");
    }
}
