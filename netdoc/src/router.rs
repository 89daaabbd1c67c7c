//! Items shared by vote and consensus router entries.

use std::fmt::Write as _;
use std::net::Ipv6Addr;

use dirauth_types::{DescriptorDigest, Digest256, IdentityDigest};

use crate::encode::decode_b64_nopad;
use crate::reader::Item;
use crate::NetdocError;

/// Keywords that may follow an `r` line inside one router entry.
pub const ROUTER_KEYWORDS: [&str; 8] = ["a", "s", "v", "pr", "w", "p", "id", "m"];

pub fn is_router_item(keyword: &str) -> bool {
    ROUTER_KEYWORDS.contains(&keyword)
}

pub fn push_ipv6(out: &mut String, ipv6: &Option<(Ipv6Addr, u16)>) {
    if let Some((addr, port)) = ipv6 {
        let _ = writeln!(out, "a [{addr}]:{port}");
    }
}

pub fn parse_ipv6(item: &Item<'_>) -> Result<(Ipv6Addr, u16), NetdocError> {
    let addr = item.ipv6_arg(0)?;
    Ok((*addr.ip(), addr.port()))
}

pub fn identity_b64_arg(item: &Item<'_>, n: usize) -> Result<IdentityDigest, NetdocError> {
    let bytes = decode_b64_nopad(item.arg(n)?).map_err(|e| item.error(e))?;
    Ok(IdentityDigest::from_slice(&bytes)?)
}

pub fn descriptor_b64_arg(item: &Item<'_>, n: usize) -> Result<DescriptorDigest, NetdocError> {
    let bytes = decode_b64_nopad(item.arg(n)?).map_err(|e| item.error(e))?;
    Ok(DescriptorDigest::from_slice(&bytes)?)
}

pub fn digest256_b64(item: &Item<'_>, encoded: &str) -> Result<Digest256, NetdocError> {
    let bytes = decode_b64_nopad(encoded).map_err(|e| item.error(e))?;
    Ok(Digest256::from_slice(&bytes)?)
}

/// `key=value` pairs of a `w` line.
pub fn weight_pairs<'a>(item: &Item<'a>) -> Vec<(&'a str, &'a str)> {
    item.args
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .collect()
}

pub fn parse_u32(item: &Item<'_>, raw: &str) -> Result<u32, NetdocError> {
    raw.parse()
        .map_err(|_| item.error(format!("bad integer {raw:?}")))
}

/// Check that `routers` is sorted by identity with no duplicates.
pub fn check_sorted<T>(
    routers: &[T],
    identity: impl Fn(&T) -> &IdentityDigest,
) -> Result<(), NetdocError> {
    for pair in routers.windows(2) {
        if identity(&pair[0]) >= identity(&pair[1]) {
            return Err(NetdocError::Other(format!(
                "router entries not sorted by identity at {}",
                identity(&pair[1])
            )));
        }
    }
    Ok(())
}
