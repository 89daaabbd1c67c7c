//! Network parameter medians and the parameter lookups the reducer needs.

use std::collections::BTreeMap;

use dirauth_types::{NetParams, Vote};
use dirauth_utils::median;

/// A parameter voted on by this many authorities is included even without
/// a majority of the roster.
pub const MIN_VOTES_FOR_PARAM: usize = 3;

/// Median of every parameter voted on by more than half of the authorities
/// or by at least [`MIN_VOTES_FOR_PARAM`] of them.
pub fn compute_params(votes: &[Vote], total_authorities: usize) -> NetParams {
    // Keyed by `key=` so series come out in whole-token byte order.
    let mut pooled: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    for vote in votes {
        for (key, value) in vote.params.iter() {
            pooled.entry(format!("{key}=")).or_default().push(value);
        }
    }

    let mut entries = Vec::new();
    for (prefix, mut values) in pooled {
        let key = &prefix[..prefix.len() - 1];
        let count = values.len();
        assert!(
            count <= votes.len(),
            "parameter {key} has more values than there are votes"
        );
        if count > total_authorities / 2 || count >= MIN_VOTES_FOR_PARAM {
            if let Some(m) = median(&mut values) {
                entries.push((key.to_string(), m));
            }
        }
    }
    NetParams::from_sorted(entries).unwrap_or_default()
}

/// Value of `keyword` in the computed parameters, or `default` when absent.
pub fn intermediate_param_value(params: &NetParams, keyword: &str, default: i32) -> i32 {
    params.get(keyword).unwrap_or(default)
}

/// Substring lookup over the rendered parameter line, as performed by
/// consensus methods before 31.
///
/// The value runs to the end of the line, so any parameter that is not the
/// last one fails to parse and yields `default`. Valid values are
/// `1..=i32::MAX`.
pub fn extract_param_buggy(params: &str, name: &str, default: i32) -> i32 {
    let prefix = format!("{name}=");
    let param_str = if params.starts_with(&prefix) {
        Some(params)
    } else {
        params.find(&format!(" {prefix}")).map(|pos| &params[pos + 1..])
    };
    let Some(param_str) = param_str else {
        return default;
    };
    let parsed = param_str
        .split_once('=')
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .filter(|v| (1..=i64::from(i32::MAX)).contains(v));
    match parsed {
        Some(v) => v as i32,
        None => {
            tracing::warn!(element = %param_str, param = name, "bad element in parameter line");
            default
        }
    }
}
