//! Consensus documents of either flavor.

use std::fmt::Write as _;

use dirauth_crypto::document_digests;
use dirauth_types::{
    Consensus, ConsensusRouterStatus, ConsensusVoter, Digest256, Flavor, NetParams,
    ProtocolLines,
};

use crate::encode::{
    descriptor_b64, digest256_b64, identity_b64, push_item, signed_portion, SIGNATURE_KEYWORD,
};
use crate::reader::{Cursor, Item};
use crate::router::{
    check_sorted, descriptor_b64_arg, digest256_b64 as parse_digest256, identity_b64_arg,
    is_router_item, parse_ipv6, parse_u32, push_ipv6, weight_pairs,
};
use crate::signature::parse_directory_signature;
use crate::{NetdocError, TimingRules};

/// Suffix that marks the `dir-source` entry of a legacy identity.
pub const LEGACY_NICKNAME_SUFFIX: &str = "-legacy";

// ── Formatting ──────────────────────────────────────────────────────────

/// Render `consensus` up to (not including) its signature section.
pub fn format_consensus_unsigned(consensus: &Consensus) -> String {
    let mut out = String::new();
    match consensus.flavor {
        Flavor::Ns => out.push_str("network-status-version 3\n"),
        flavor => {
            let _ = writeln!(out, "network-status-version 3 {flavor}");
        }
    }
    out.push_str("vote-status consensus\n");
    let _ = writeln!(out, "consensus-method {}", consensus.consensus_method);
    let _ = writeln!(out, "valid-after {}", consensus.valid_after);
    let _ = writeln!(out, "fresh-until {}", consensus.fresh_until);
    let _ = writeln!(out, "valid-until {}", consensus.valid_until);
    let _ = writeln!(
        out,
        "voting-delay {} {}",
        consensus.vote_seconds, consensus.dist_seconds
    );
    push_item(&mut out, "client-versions", &consensus.client_versions);
    push_item(&mut out, "server-versions", &consensus.server_versions);
    for line in &consensus.package_lines {
        push_item(&mut out, "package", line);
    }
    push_item(&mut out, "known-flags", &consensus.known_flags.join(" "));
    for (idx, keyword) in ProtocolLines::KEYWORDS.iter().enumerate() {
        if let Some(value) = consensus.protocols.nth(idx) {
            push_item(&mut out, keyword, value);
        }
    }
    if !consensus.params.is_empty() {
        push_item(&mut out, "params", &consensus.params.to_string());
    }

    for voter in &consensus.voters {
        let _ = writeln!(
            out,
            "dir-source {} {} {} {} {} {}",
            voter.nickname, voter.identity, voter.address, voter.ipv4, voter.dir_port, voter.or_port
        );
        if let Some(contact) = &voter.contact {
            push_item(&mut out, "contact", contact);
        }
        if let Some(digest) = &voter.vote_digest {
            let _ = writeln!(out, "vote-digest {digest}");
        }
    }

    for rs in &consensus.routers {
        format_consensus_router(&mut out, consensus.flavor, rs);
    }

    out.push_str("directory-footer\n");
    if let Some(weights) = &consensus.bandwidth_weights {
        let tokens: Vec<String> = weights.iter().map(|(k, v)| format!("{k}={v}")).collect();
        push_item(&mut out, "bandwidth-weights", &tokens.join(" "));
    }
    out
}

fn format_consensus_router(out: &mut String, flavor: Flavor, rs: &ConsensusRouterStatus) {
    let _ = write!(out, "r {} {}", rs.nickname, identity_b64(&rs.identity));
    if flavor == Flavor::Ns {
        if let Some(desc) = &rs.descriptor_digest {
            let _ = write!(out, " {}", descriptor_b64(desc));
        }
    }
    let _ = writeln!(
        out,
        " {} {} {} {}",
        rs.published, rs.ipv4, rs.or_port, rs.dir_port
    );
    push_ipv6(out, &rs.ipv6);
    if let Some(md) = &rs.microdesc_digest {
        let _ = writeln!(out, "m {}", digest256_b64(md));
    }
    push_item(out, "s", &rs.flags.join(" "));
    if let Some(v) = &rs.version {
        push_item(out, "v", v);
    }
    if let Some(pr) = &rs.protocols {
        push_item(out, "pr", pr);
    }
    if let Some(bw) = rs.bandwidth {
        let _ = write!(out, "w Bandwidth={bw}");
        if rs.unmeasured {
            out.push_str(" Unmeasured=1");
        }
        if let Some(gf) = rs.guardfraction {
            let _ = write!(out, " GuardFraction={gf}");
        }
        out.push('\n');
    }
    if let Some(summary) = &rs.exit_summary {
        push_item(out, "p", summary);
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────

/// Parse a consensus document of either flavor.
///
/// Signatures are attached to the `dir-source` entry with the same
/// identity and returned unchecked. Both digests of the signed portion are
/// recorded.
pub fn parse_consensus(text: &str, rules: &TimingRules) -> Result<Consensus, NetdocError> {
    let signed = signed_portion(text)?;
    let digests = document_digests(signed.as_bytes());

    let mut c = Cursor::new(text)?;
    let version = c.expect("network-status-version")?;
    let flavor = match version.tokens().as_slice() {
        ["3"] => Flavor::Ns,
        ["3", name] => name.parse::<Flavor>()?,
        _ => return Err(version.error("unsupported version")),
    };
    let status = c.expect("vote-status")?;
    if status.args != "consensus" {
        return Err(NetdocError::WrongDocumentType(status.args.to_string()));
    }

    let mut consensus = Consensus {
        flavor,
        consensus_method: 0,
        valid_after: Default::default(),
        fresh_until: Default::default(),
        valid_until: Default::default(),
        vote_seconds: 0,
        dist_seconds: 0,
        client_versions: String::new(),
        server_versions: String::new(),
        package_lines: Vec::new(),
        known_flags: Vec::new(),
        protocols: ProtocolLines::default(),
        params: NetParams::new(),
        voters: Vec::new(),
        routers: Vec::new(),
        bandwidth_weights: None,
        digests,
    };

    let mut seen_method = false;
    let mut seen_times = [false; 4];
    while let Some(keyword) = c.peek_keyword() {
        if keyword == "dir-source" {
            break;
        }
        let Some(item) = c.next_item() else { break };
        match item.keyword {
            "consensus-method" => {
                consensus.consensus_method = item.parse_arg(0)?;
                seen_method = true;
            }
            "valid-after" => {
                consensus.valid_after = item.timestamp()?;
                seen_times[0] = true;
            }
            "fresh-until" => {
                consensus.fresh_until = item.timestamp()?;
                seen_times[1] = true;
            }
            "valid-until" => {
                consensus.valid_until = item.timestamp()?;
                seen_times[2] = true;
            }
            "voting-delay" => {
                consensus.vote_seconds = item.parse_arg(0)?;
                consensus.dist_seconds = item.parse_arg(1)?;
                seen_times[3] = true;
            }
            "client-versions" => consensus.client_versions = item.args.to_string(),
            "server-versions" => consensus.server_versions = item.args.to_string(),
            "package" => consensus.package_lines.push(item.args.to_string()),
            "known-flags" => {
                consensus.known_flags = item.tokens().iter().map(|s| s.to_string()).collect()
            }
            "params" => consensus.params = NetParams::parse(item.args)?,
            keyword => {
                if let Some(idx) = ProtocolLines::KEYWORDS.iter().position(|k| *k == keyword) {
                    consensus.protocols.set_nth(idx, item.args.to_string());
                } else {
                    tracing::trace!(keyword, "ignoring unrecognized consensus header item");
                }
            }
        }
    }
    if !seen_method {
        return Err(NetdocError::Missing {
            line: 0,
            keyword: "consensus-method",
        });
    }
    if seen_times.iter().any(|seen| !seen) {
        return Err(NetdocError::Missing {
            line: 0,
            keyword: "valid-after/fresh-until/valid-until/voting-delay",
        });
    }
    rules.check(
        consensus.valid_after,
        consensus.fresh_until,
        consensus.valid_until,
        consensus.vote_seconds,
        consensus.dist_seconds,
    )?;

    while let Some(source) = c.take("dir-source") {
        let nickname = source.arg(0)?.to_string();
        let contact = c.take("contact").map(|i| i.args.to_string());
        let vote_digest = match c.take("vote-digest") {
            Some(item) => Some(
                Digest256::from_hex(item.arg(0)?).map_err(|e| item.error(e.to_string()))?,
            ),
            None => None,
        };
        consensus.voters.push(ConsensusVoter {
            is_legacy: nickname.ends_with(LEGACY_NICKNAME_SUFFIX),
            nickname,
            identity: source.fingerprint_arg(1)?,
            address: source.arg(2)?.to_string(),
            ipv4: source.ipv4_arg(3)?,
            dir_port: source.parse_arg(4)?,
            or_port: source.parse_arg(5)?,
            contact,
            vote_digest,
            signatures: Vec::new(),
        });
    }
    if consensus.voters.is_empty() {
        return Err(NetdocError::Missing {
            line: 0,
            keyword: "dir-source",
        });
    }

    c.skip_until(&["r", "directory-footer"]);
    while let Some(r) = c.take("r") {
        let rs = parse_consensus_router(&mut c, flavor, &r)?;
        consensus.routers.push(rs);
    }
    check_sorted(&consensus.routers, |rs| &rs.identity)?;

    c.skip_until(&["directory-footer"]);
    c.expect("directory-footer")?;
    if let Some(item) = c.take("bandwidth-weights") {
        let weights = item
            .tokens()
            .iter()
            .map(|token| {
                let (k, v) = token
                    .split_once('=')
                    .ok_or_else(|| item.error(format!("bad weight {token:?}")))?;
                let v: i64 = v
                    .parse()
                    .map_err(|_| item.error(format!("bad weight {token:?}")))?;
                Ok((k.to_string(), v))
            })
            .collect::<Result<Vec<_>, NetdocError>>()?;
        consensus.bandwidth_weights = Some(weights);
    }

    c.skip_until(&[SIGNATURE_KEYWORD]);
    for item in c.take_all(SIGNATURE_KEYWORD) {
        let sig = parse_directory_signature(&item)?;
        let voter = consensus.voter_mut(&sig.identity).ok_or_else(|| {
            item.error("signature identity does not match any declared directory source")
        })?;
        voter.signatures.push(sig);
    }

    Ok(consensus)
}

fn parse_consensus_router(
    c: &mut Cursor<'_>,
    flavor: Flavor,
    r: &Item<'_>,
) -> Result<ConsensusRouterStatus, NetdocError> {
    let expected = match flavor {
        Flavor::Ns => 8,
        Flavor::Microdesc => 7,
    };
    let tokens = r.tokens();
    if tokens.len() != expected {
        return Err(r.error(format!(
            "expected {expected} arguments, got {}",
            tokens.len()
        )));
    }
    let (descriptor_digest, rest) = match flavor {
        Flavor::Ns => (Some(descriptor_b64_arg(r, 2)?), 3),
        Flavor::Microdesc => (None, 2),
    };
    let mut rs = ConsensusRouterStatus {
        nickname: tokens[0].to_string(),
        identity: identity_b64_arg(r, 1)?,
        descriptor_digest,
        published: r.timestamp_arg(rest)?,
        ipv4: r.ipv4_arg(rest + 2)?,
        or_port: r.parse_arg(rest + 3)?,
        dir_port: r.parse_arg(rest + 4)?,
        ipv6: None,
        microdesc_digest: None,
        flags: Vec::new(),
        version: None,
        protocols: None,
        bandwidth: None,
        unmeasured: false,
        guardfraction: None,
        exit_summary: None,
    };

    while let Some(keyword) = c.peek_keyword() {
        if !is_router_item(keyword) {
            break;
        }
        let Some(item) = c.next_item() else { break };
        match item.keyword {
            "a" => {
                if rs.ipv6.is_none() {
                    rs.ipv6 = Some(parse_ipv6(&item)?);
                }
            }
            "m" => rs.microdesc_digest = Some(parse_digest256(&item, item.arg(0)?)?),
            "s" => rs.flags = item.tokens().iter().map(|s| s.to_string()).collect(),
            "v" => rs.version = Some(item.args.to_string()),
            "pr" => rs.protocols = Some(item.args.to_string()),
            "w" => {
                for (key, value) in weight_pairs(&item) {
                    match key {
                        "Bandwidth" => rs.bandwidth = Some(parse_u32(&item, value)?),
                        "Unmeasured" => rs.unmeasured = value == "1",
                        "GuardFraction" => rs.guardfraction = Some(parse_u32(&item, value)?),
                        _ => {}
                    }
                }
            }
            "p" => rs.exit_summary = Some(item.args.to_string()),
            _ => {}
        }
    }
    Ok(rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_document;
    use crate::testutil::make_keys;
    use dirauth_types::{DescriptorDigest, DigestAlgorithm, DocumentDigests, IdentityDigest, Timestamp};
    use std::net::Ipv4Addr;

    fn make_consensus(flavor: Flavor) -> Consensus {
        let keys = make_keys(1);
        let va = Timestamp::new(1_700_000_000);
        Consensus {
            flavor,
            consensus_method: 32,
            valid_after: va,
            fresh_until: va.plus(3600),
            valid_until: va.plus(3 * 3600),
            vote_seconds: 300,
            dist_seconds: 300,
            client_versions: "0.4.8.10".into(),
            server_versions: String::new(),
            package_lines: vec!["tor 0.4.8.10 https://example/ sha256=abc".into()],
            known_flags: vec!["Fast".into(), "Running".into(), "Valid".into()],
            protocols: ProtocolLines {
                recommended_client: Some("Link=4-5".into()),
                recommended_relay: Some("Link=4-5".into()),
                required_client: Some(String::new()),
                required_relay: Some("Link=4".into()),
            },
            params: NetParams::parse("circwindow=1000").unwrap(),
            voters: vec![ConsensusVoter {
                nickname: "auth".into(),
                identity: keys.identity_digest(),
                address: "auth.example".into(),
                ipv4: Ipv4Addr::new(192, 0, 2, 1),
                dir_port: 80,
                or_port: 443,
                contact: Some("ops@example".into()),
                vote_digest: Some(Digest256::new([2; 32])),
                is_legacy: false,
                signatures: Vec::new(),
            }],
            routers: vec![ConsensusRouterStatus {
                nickname: "relay".into(),
                identity: IdentityDigest::new([3; 20]),
                descriptor_digest: (flavor == Flavor::Ns).then(|| DescriptorDigest::new([4; 20])),
                published: va.minus(600),
                ipv4: Ipv4Addr::new(10, 0, 0, 3),
                or_port: 9001,
                dir_port: 0,
                ipv6: None,
                microdesc_digest: (flavor == Flavor::Microdesc).then(|| Digest256::new([5; 32])),
                flags: vec!["Fast".into(), "Running".into(), "Valid".into()],
                version: Some("Tor 0.4.8.10".into()),
                protocols: Some("Link=4-5".into()),
                bandwidth: Some(20),
                unmeasured: true,
                guardfraction: None,
                exit_summary: (flavor == Flavor::Ns).then(|| "reject 1-65535".to_string()),
            }],
            bandwidth_weights: Some(vec![("Wbd".into(), 3333), ("Wmm".into(), 10000)]),
            digests: DocumentDigests::new(),
        }
    }

    #[test]
    fn consensus_round_trips_in_both_flavors() {
        let keys = make_keys(1);
        for flavor in Flavor::ALL {
            let original = make_consensus(flavor);
            let unsigned = format_consensus_unsigned(&original);
            let text = sign_document(&unsigned, flavor.signing_digest(), &keys.signers());
            let parsed = parse_consensus(&text, &TimingRules::STANDARD).unwrap();

            assert_eq!(parsed.flavor, flavor);
            assert_eq!(parsed.routers, original.routers);
            assert_eq!(parsed.protocols, original.protocols);
            assert_eq!(parsed.package_lines, original.package_lines);
            assert_eq!(parsed.bandwidth_weight("Wbd"), Some(3333));
            assert_eq!(parsed.voters[0].signatures.len(), 1);
            assert!(parsed.digests.get(DigestAlgorithm::Sha256).is_some());
            assert!(parsed.digests.get(DigestAlgorithm::Blake2b256).is_some());
            assert_eq!(format_consensus_unsigned(&parsed), unsigned);
        }
    }

    #[test]
    fn signature_from_unknown_source_is_rejected() {
        let keys = make_keys(1);
        let other = make_keys(2);
        let unsigned = format_consensus_unsigned(&make_consensus(Flavor::Ns));
        let text = sign_document(&unsigned, DigestAlgorithm::Sha256, &other.signers());
        assert!(parse_consensus(&text, &TimingRules::STANDARD).is_err());
        let text = sign_document(&unsigned, DigestAlgorithm::Sha256, &keys.signers());
        assert!(parse_consensus(&text, &TimingRules::STANDARD).is_ok());
    }

    #[test]
    fn legacy_source_is_recognised() {
        let mut consensus = make_consensus(Flavor::Ns);
        let mut legacy = consensus.voters[0].clone();
        legacy.nickname = "auth-legacy".into();
        legacy.identity = IdentityDigest::new([0x77; 20]);
        legacy.contact = None;
        legacy.vote_digest = None;
        legacy.is_legacy = true;
        consensus.voters.push(legacy);
        let keys = make_keys(1);
        let text = sign_document(
            &format_consensus_unsigned(&consensus),
            DigestAlgorithm::Sha256,
            &keys.signers(),
        );
        let parsed = parse_consensus(&text, &TimingRules::STANDARD).unwrap();
        assert!(parsed.voters[1].is_legacy);
        assert_eq!(parsed.voters[1].contact, None);
    }
}
