//! Network parameters: sorted, unique `key=value` pairs with 32-bit values.
//!
//! Order is byte order of the `key=` prefix, which is also the byte order
//! of the whole `key=value` tokens: `a-b=1` sorts before `a=1` because `-`
//! is below `=`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::TypesError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetParams {
    entries: Vec<(String, i32)>,
}

impl NetParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs that must already be in [`param_order`] with no
    /// duplicate keys.
    pub fn from_sorted(entries: Vec<(String, i32)>) -> Result<Self, TypesError> {
        for pair in entries.windows(2) {
            if param_order(&pair[0].0, &pair[1].0) != Ordering::Less {
                return Err(TypesError::UnsortedParams(pair[1].0.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Parse space-separated `k=v` tokens, enforcing sort order and i32 range.
    pub fn parse(line: &str) -> Result<Self, TypesError> {
        let mut entries = Vec::new();
        for token in line.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| TypesError::BadParam(token.to_string()))?;
            if key.is_empty() {
                return Err(TypesError::BadParam(token.to_string()));
            }
            let value: i32 = value
                .parse()
                .map_err(|_| TypesError::BadParam(token.to_string()))?;
            entries.push((key.to_string(), value));
        }
        Self::from_sorted(entries)
    }

    pub fn get(&self, key: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k=v` tokens in order.
    pub fn tokens(&self) -> Vec<String> {
        self.entries.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Byte order of `a=` against `b=`.
pub fn param_order(a: &str, b: &str) -> Ordering {
    a.bytes()
        .chain(std::iter::once(b'='))
        .cmp(b.bytes().chain(std::iter::once(b'=')))
}

impl fmt::Display for NetParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(" "))
    }
}
