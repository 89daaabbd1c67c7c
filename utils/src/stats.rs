//! Order statistics used by the consensus reduction.
//!
//! Every helper here is deterministic: medians pick the lower middle of an
//! even-length input, and most-frequent helpers break ties in favour of the
//! value that sorts later.

/// Sort `values` in place and return the lower median.
///
/// Returns `None` for an empty slice.
pub fn median<T: Ord + Copy>(values: &mut [T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    Some(values[(values.len() - 1) / 2])
}

/// Lower median of an iterator of values.
pub fn median_of<T, I>(values: I) -> Option<T>
where
    T: Ord + Copy,
    I: IntoIterator<Item = T>,
{
    let mut collected: Vec<T> = values.into_iter().collect();
    median(&mut collected)
}

/// The most frequent element of an already sorted slice.
///
/// Runs of equal elements are counted; on equal counts the later run wins.
pub fn most_frequent<T: PartialEq>(sorted: &[T]) -> Option<&T> {
    most_frequent_by(sorted, |a, b| a == b)
}

/// Like [`most_frequent`], grouping adjacent elements with `same`.
pub fn most_frequent_by<T, F>(sorted: &[T], mut same: F) -> Option<&T>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut best: Option<(&T, usize)> = None;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && same(&sorted[start], &sorted[end]) {
            end += 1;
        }
        let run = end - start;
        if best.map_or(true, |(_, n)| run >= n) {
            best = Some((&sorted[start], run));
        }
        start = end;
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&mut [3, 1, 2]), Some(2));
        assert_eq!(median(&mut [60, -60]), Some(-60));
        assert_eq!(median(&mut [4, 1, 3, 2]), Some(2));
        assert_eq!(median::<u32>(&mut []), None);
    }

    #[test]
    fn median_of_iterator() {
        assert_eq!(median_of(vec![100u64, 40, 70]), Some(70));
    }

    #[test]
    fn most_frequent_prefers_later_on_tie() {
        assert_eq!(most_frequent(&["a", "a", "b", "b"]), Some(&"b"));
        assert_eq!(most_frequent(&["a", "a", "a", "b", "b"]), Some(&"a"));
        assert_eq!(most_frequent::<u8>(&[]), None);
    }

    #[test]
    fn most_frequent_by_custom_grouping() {
        let items = [(1, 'x'), (1, 'y'), (2, 'z')];
        let best = most_frequent_by(&items, |a, b| a.0 == b.0);
        assert_eq!(best, Some(&(1, 'x')));
    }

    proptest! {
        #[test]
        fn median_lies_within_bounds(mut values in proptest::collection::vec(any::<i32>(), 1..50)) {
            let lo = *values.iter().min().unwrap();
            let hi = *values.iter().max().unwrap();
            let m = median(&mut values).unwrap();
            prop_assert!(lo <= m && m <= hi);
        }
    }
}
