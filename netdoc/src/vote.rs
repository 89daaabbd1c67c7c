//! Vote documents.

use std::fmt::Write as _;

use dirauth_crypto::{document_digest, DocumentSigner};
use dirauth_types::{
    DigestAlgorithm, MicrodescHash, NetParams, ProtocolLines, Vote, VoteRouterStatus, VoterInfo,
};

use crate::encode::{
    descriptor_b64, digest256_b64, identity_b64, push_item, signed_portion, SIGNATURE_KEYWORD,
};
use crate::reader::{Cursor, Item};
use crate::router::{
    check_sorted, descriptor_b64_arg, digest256_b64 as parse_digest256, identity_b64_arg,
    is_router_item, parse_ipv6, parse_u32, push_ipv6, weight_pairs,
};
use crate::signature::{parse_directory_signature, sign_document};
use crate::{NetdocError, TimingRules};

/// Votes are always signed over their sha256 digest.
pub const VOTE_DIGEST_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

// ── Formatting ──────────────────────────────────────────────────────────

/// Render `vote` up to (not including) its signature section.
pub fn format_vote_unsigned(vote: &Vote) -> String {
    let mut out = String::new();
    out.push_str("network-status-version 3\n");
    out.push_str("vote-status vote\n");
    let methods: Vec<String> = vote.consensus_methods.iter().map(u32::to_string).collect();
    push_item(&mut out, "consensus-methods", &methods.join(" "));
    let _ = writeln!(out, "published {}", vote.published);
    let _ = writeln!(out, "valid-after {}", vote.valid_after);
    let _ = writeln!(out, "fresh-until {}", vote.fresh_until);
    let _ = writeln!(out, "valid-until {}", vote.valid_until);
    let _ = writeln!(out, "voting-delay {} {}", vote.vote_seconds, vote.dist_seconds);
    if let Some(v) = &vote.client_versions {
        push_item(&mut out, "client-versions", v);
    }
    if let Some(v) = &vote.server_versions {
        push_item(&mut out, "server-versions", v);
    }
    for line in &vote.package_lines {
        push_item(&mut out, "package", line);
    }
    push_item(&mut out, "known-flags", &vote.known_flags.join(" "));
    for (idx, keyword) in ProtocolLines::KEYWORDS.iter().enumerate() {
        if let Some(value) = vote.protocols.nth(idx) {
            push_item(&mut out, keyword, value);
        }
    }
    if !vote.params.is_empty() {
        push_item(&mut out, "params", &vote.params.to_string());
    }
    if let Some(h) = &vote.bandwidth_file_headers {
        push_item(&mut out, "bandwidth-file-headers", h);
    }
    if let Some(d) = &vote.bandwidth_file_digest {
        push_item(&mut out, "bandwidth-file-digest", d);
    }
    for line in &vote.shared_rand_commits {
        out.push_str(line);
        out.push('\n');
    }

    let voter = &vote.voter;
    let _ = writeln!(
        out,
        "dir-source {} {} {} {} {} {}",
        voter.nickname, voter.identity, voter.address, voter.ipv4, voter.dir_port, voter.or_port
    );
    push_item(&mut out, "contact", &voter.contact);
    if let Some(legacy) = &voter.legacy_identity {
        let _ = writeln!(out, "legacy-dir-key {legacy}");
    }

    for rs in &vote.routers {
        format_vote_router(&mut out, vote, rs);
    }
    out.push_str("directory-footer\n");
    out
}

fn format_vote_router(out: &mut String, vote: &Vote, rs: &VoteRouterStatus) {
    let _ = writeln!(
        out,
        "r {} {} {} {} {} {} {}",
        rs.nickname,
        identity_b64(&rs.identity),
        descriptor_b64(&rs.descriptor_digest),
        rs.published,
        rs.ipv4,
        rs.or_port,
        rs.dir_port
    );
    push_ipv6(out, &rs.ipv6);
    let flags = vote.router_flags(rs);
    push_item(out, "s", &flags.join(" "));
    if let Some(v) = &rs.version {
        push_item(out, "v", v);
    }
    if let Some(pr) = &rs.protocols {
        push_item(out, "pr", pr);
    }
    if rs.bandwidth.is_some() || rs.measured_bandwidth.is_some() || rs.guardfraction.is_some() {
        out.push('w');
        if let Some(bw) = rs.bandwidth {
            let _ = write!(out, " Bandwidth={bw}");
        }
        if let Some(m) = rs.measured_bandwidth {
            let _ = write!(out, " Measured={m}");
        }
        if let Some(gf) = rs.guardfraction {
            let _ = write!(out, " GuardFraction={gf}");
        }
        out.push('\n');
    }
    if let Some(policy) = &rs.exit_policy {
        push_item(out, "p", policy);
    }
    if let Some(ed) = &rs.ed25519_id {
        let _ = writeln!(out, "id ed25519 {}", crate::encode::encode_b64_nopad(ed));
    }
    for md in &rs.microdesc {
        let methods: Vec<String> = md.methods.iter().map(u32::to_string).collect();
        let _ = writeln!(out, "m {} sha256={}", methods.join(","), digest256_b64(&md.sha256));
    }
}

/// Render and sign `vote`. The voter fields that come from parsing
/// (`vote_digest`, `signatures`) are ignored.
pub fn format_vote(vote: &Vote, signer: &DocumentSigner<'_>) -> String {
    let unsigned = format_vote_unsigned(vote);
    sign_document(&unsigned, VOTE_DIGEST_ALGORITHM, std::slice::from_ref(signer))
}

// ── Parsing ─────────────────────────────────────────────────────────────

/// Parse one vote document. Signatures are returned unchecked.
pub fn parse_vote(text: &str, rules: &TimingRules) -> Result<Vote, NetdocError> {
    let signed = signed_portion(text)?;
    let vote_digest = document_digest(VOTE_DIGEST_ALGORITHM, signed.as_bytes());

    let mut c = Cursor::new(text)?;
    let version = c.expect("network-status-version")?;
    if version.args != "3" {
        return Err(version.error("unsupported version"));
    }
    let status = c.expect("vote-status")?;
    if status.args != "vote" {
        return Err(NetdocError::WrongDocumentType(status.args.to_string()));
    }

    let mut header = Header::default();
    while let Some(keyword) = c.peek_keyword() {
        if keyword == "dir-source" {
            break;
        }
        let Some(item) = c.next_item() else { break };
        header.absorb(item)?;
    }

    let methods = header.consensus_methods.take().ok_or(NetdocError::Missing {
        line: 0,
        keyword: "consensus-methods",
    })?;
    let published = header.required(header.published, "published")?;
    let valid_after = header.required(header.valid_after, "valid-after")?;
    let fresh_until = header.required(header.fresh_until, "fresh-until")?;
    let valid_until = header.required(header.valid_until, "valid-until")?;
    let (vote_seconds, dist_seconds) = header.voting_delay.ok_or(NetdocError::Missing {
        line: 0,
        keyword: "voting-delay",
    })?;
    rules.check(valid_after, fresh_until, valid_until, vote_seconds, dist_seconds)?;
    let known_flags = header.known_flags.ok_or(NetdocError::Missing {
        line: 0,
        keyword: "known-flags",
    })?;

    let source = c.expect("dir-source")?;
    let contact = c.expect("contact")?;
    let legacy_identity = match c.take("legacy-dir-key") {
        Some(item) => Some(item.fingerprint_arg(0)?),
        None => None,
    };
    c.skip_until(&["r", "directory-footer"]);

    let mut vote = Vote {
        voter: VoterInfo {
            nickname: source.arg(0)?.to_string(),
            identity: source.fingerprint_arg(1)?,
            legacy_identity,
            address: source.arg(2)?.to_string(),
            ipv4: source.ipv4_arg(3)?,
            dir_port: source.parse_arg(4)?,
            or_port: source.parse_arg(5)?,
            contact: contact.args.to_string(),
            vote_digest,
            signatures: Vec::new(),
        },
        consensus_methods: methods,
        published,
        valid_after,
        fresh_until,
        valid_until,
        vote_seconds,
        dist_seconds,
        client_versions: header.client_versions,
        server_versions: header.server_versions,
        package_lines: header.package_lines,
        known_flags,
        protocols: header.protocols,
        params: header.params,
        bandwidth_file_headers: header.bandwidth_file_headers,
        bandwidth_file_digest: header.bandwidth_file_digest,
        shared_rand_commits: header.shared_rand,
        routers: Vec::new(),
    };
    vote.validate_flags()?;

    while let Some(r) = c.take("r") {
        let rs = parse_vote_router(&mut c, &vote, &r)?;
        vote.routers.push(rs);
    }
    check_sorted(&vote.routers, |rs| &rs.identity)?;

    c.skip_until(&["directory-footer"]);
    c.expect("directory-footer")?;
    c.skip_until(&[SIGNATURE_KEYWORD]);
    let sig_items = c.take_all(SIGNATURE_KEYWORD);
    if sig_items.len() != 1 {
        return Err(NetdocError::Other(format!(
            "vote must carry exactly one signature, found {}",
            sig_items.len()
        )));
    }
    let sig = parse_directory_signature(&sig_items[0])?;
    if sig.identity != vote.voter.identity {
        return Err(sig_items[0].error("signature identity does not match dir-source"));
    }
    vote.voter.signatures.push(sig);

    Ok(vote)
}

#[derive(Default)]
struct Header {
    consensus_methods: Option<Vec<u32>>,
    published: Option<dirauth_types::Timestamp>,
    valid_after: Option<dirauth_types::Timestamp>,
    fresh_until: Option<dirauth_types::Timestamp>,
    valid_until: Option<dirauth_types::Timestamp>,
    voting_delay: Option<(u32, u32)>,
    client_versions: Option<String>,
    server_versions: Option<String>,
    package_lines: Vec<String>,
    known_flags: Option<Vec<String>>,
    protocols: ProtocolLines,
    params: NetParams,
    bandwidth_file_headers: Option<String>,
    bandwidth_file_digest: Option<String>,
    shared_rand: Vec<String>,
}

impl Header {
    fn required<T>(&self, value: Option<T>, keyword: &'static str) -> Result<T, NetdocError> {
        value.ok_or(NetdocError::Missing { line: 0, keyword })
    }

    fn absorb(&mut self, item: Item<'_>) -> Result<(), NetdocError> {
        match item.keyword {
            "consensus-methods" => {
                let methods = item
                    .tokens()
                    .iter()
                    .map(|t| parse_u32(&item, t))
                    .collect::<Result<Vec<_>, _>>()?;
                if methods.is_empty() {
                    return Err(item.error("empty consensus method list"));
                }
                self.consensus_methods = Some(methods);
            }
            "published" => self.published = Some(item.timestamp()?),
            "valid-after" => self.valid_after = Some(item.timestamp()?),
            "fresh-until" => self.fresh_until = Some(item.timestamp()?),
            "valid-until" => self.valid_until = Some(item.timestamp()?),
            "voting-delay" => self.voting_delay = Some((item.parse_arg(0)?, item.parse_arg(1)?)),
            "client-versions" => self.client_versions = Some(item.args.to_string()),
            "server-versions" => self.server_versions = Some(item.args.to_string()),
            "package" => self.package_lines.push(item.args.to_string()),
            "known-flags" => {
                let flags: Vec<String> = item.tokens().iter().map(|s| s.to_string()).collect();
                if flags.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(item.error("known-flags not in order"));
                }
                self.known_flags = Some(flags);
            }
            "params" => self.params = NetParams::parse(item.args)?,
            "bandwidth-file-headers" => self.bandwidth_file_headers = Some(item.args.to_string()),
            "bandwidth-file-digest" => self.bandwidth_file_digest = Some(item.args.to_string()),
            keyword if keyword.starts_with("shared-rand-") => {
                let mut line = keyword.to_string();
                if !item.args.is_empty() {
                    line.push(' ');
                    line.push_str(item.args);
                }
                self.shared_rand.push(line);
            }
            keyword => {
                if let Some(idx) = ProtocolLines::KEYWORDS.iter().position(|k| *k == keyword) {
                    self.protocols.set_nth(idx, item.args.to_string());
                } else {
                    tracing::trace!(keyword, "ignoring unrecognized vote header item");
                }
            }
        }
        Ok(())
    }
}

fn parse_vote_router(
    c: &mut Cursor<'_>,
    vote: &Vote,
    r: &Item<'_>,
) -> Result<VoteRouterStatus, NetdocError> {
    let tokens = r.tokens();
    if tokens.len() != 8 {
        return Err(r.error(format!("expected 8 arguments, got {}", tokens.len())));
    }
    let mut rs = VoteRouterStatus {
        nickname: tokens[0].to_string(),
        identity: identity_b64_arg(r, 1)?,
        descriptor_digest: descriptor_b64_arg(r, 2)?,
        published: r.timestamp_arg(3)?,
        ipv4: r.ipv4_arg(5)?,
        or_port: r.parse_arg(6)?,
        dir_port: r.parse_arg(7)?,
        ipv6: None,
        flags: 0,
        version: None,
        protocols: None,
        bandwidth: None,
        measured_bandwidth: None,
        guardfraction: None,
        exit_policy: None,
        ed25519_id: None,
        microdesc: Vec::new(),
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
            "s" => {
                for flag in item.tokens() {
                    let idx = vote
                        .flag_index(flag)
                        .ok_or_else(|| item.error(format!("unknown flag {flag}")))?;
                    rs.flags |= 1u64 << idx;
                }
            }
            "v" => rs.version = Some(item.args.to_string()),
            "pr" => rs.protocols = Some(item.args.to_string()),
            "w" => {
                for (key, value) in weight_pairs(&item) {
                    match key {
                        "Bandwidth" => rs.bandwidth = Some(parse_u32(&item, value)?),
                        "Measured" => rs.measured_bandwidth = Some(parse_u32(&item, value)?),
                        "GuardFraction" => {
                            let gf = parse_u32(&item, value)?;
                            if gf > 100 {
                                return Err(item.error("guard fraction above 100"));
                            }
                            rs.guardfraction = Some(gf);
                        }
                        _ => {}
                    }
                }
            }
            "p" => rs.exit_policy = Some(item.args.to_string()),
            "id" => {
                if item.arg(0)? != "ed25519" {
                    return Err(item.error("unsupported id key type"));
                }
                let value = item.arg(1)?;
                if value != "none" {
                    let bytes = crate::encode::decode_b64_nopad(value).map_err(|e| item.error(e))?;
                    let key = <[u8; 32]>::try_from(bytes.as_slice())
                        .map_err(|_| item.error("ed25519 identity must be 32 bytes"))?;
                    rs.ed25519_id = Some(key);
                }
            }
            "m" => {
                let methods = item
                    .arg(0)?
                    .split(',')
                    .map(|m| parse_u32(&item, m))
                    .collect::<Result<Vec<_>, _>>()?;
                let sha = item
                    .tokens()
                    .into_iter()
                    .skip(1)
                    .find_map(|t| t.strip_prefix("sha256="))
                    .ok_or_else(|| item.error("missing sha256 digest"))?;
                rs.microdesc.push(MicrodescHash {
                    methods,
                    sha256: parse_digest256(&item, sha)?,
                });
            }
            _ => {}
        }
    }
    Ok(rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_keys, make_router, make_vote};
    use dirauth_types::Digest256;

    #[test]
    fn vote_round_trips_through_text() {
        let keys = make_keys(1);
        let mut vote = make_vote(&keys, 1_700_000_000);
        let mut rs = make_router(3, "relay3");
        rs.flags = 0b11;
        rs.ipv6 = Some(("2001:db8::1".parse().unwrap(), 9001));
        rs.measured_bandwidth = Some(500);
        rs.guardfraction = Some(40);
        rs.exit_policy = Some("accept 80,443".into());
        rs.ed25519_id = Some([9; 32]);
        rs.microdesc.push(MicrodescHash {
            methods: vec![28, 29, 30, 31, 32],
            sha256: Digest256::new([4; 32]),
        });
        vote.routers.push(rs);
        vote.params = NetParams::parse("bwweightscale=10000 circwindow=1000").unwrap();
        vote.shared_rand_commits.push("shared-rand-participate".into());

        let text = format_vote(&vote, &keys.primary_signer());
        let parsed = parse_vote(&text, &TimingRules::STANDARD).unwrap();

        assert_eq!(parsed.routers, vote.routers);
        assert_eq!(parsed.params, vote.params);
        assert_eq!(parsed.known_flags, vote.known_flags);
        assert_eq!(parsed.voter.identity, keys.identity_digest());
        assert_eq!(parsed.voter.signatures.len(), 1);
        assert_eq!(parsed.shared_rand_commits, vec!["shared-rand-participate"]);
        assert_eq!(parsed.client_versions, vote.client_versions);
        assert!(!parsed.voter.vote_digest.is_zero());
    }

    #[test]
    fn vote_digest_changes_with_content() {
        let keys = make_keys(1);
        let a = make_vote(&keys, 1_700_000_000);
        let mut b = a.clone();
        b.vote_seconds = 200;
        let pa = parse_vote(&format_vote(&a, &keys.primary_signer()), &TimingRules::STANDARD).unwrap();
        let pb = parse_vote(&format_vote(&b, &keys.primary_signer()), &TimingRules::STANDARD).unwrap();
        assert_ne!(pa.voter.vote_digest, pb.voter.vote_digest);
    }

    #[test]
    fn unknown_flag_on_router_is_rejected() {
        let keys = make_keys(1);
        let vote = make_vote(&keys, 1_700_000_000);
        let text = format_vote(&vote, &keys.primary_signer())
            .replace("directory-footer", "r x AAAAAAAAAAAAAAAAAAAAAAAAAAA AAAAAAAAAAAAAAAAAAAAAAAAAAA 2023-11-14 22:00:00 10.0.0.1 9001 0\ns Bogus\ndirectory-footer");
        assert!(parse_vote(&text, &TimingRules::STANDARD).is_err());
    }

    #[test]
    fn unsorted_routers_are_rejected() {
        let keys = make_keys(1);
        let mut vote = make_vote(&keys, 1_700_000_000);
        vote.routers.push(make_router(5, "five"));
        vote.routers.push(make_router(4, "four"));
        let text = format_vote(&vote, &keys.primary_signer());
        assert!(parse_vote(&text, &TimingRules::STANDARD).is_err());
    }

    #[test]
    fn short_interval_is_rejected() {
        let keys = make_keys(1);
        let mut vote = make_vote(&keys, 1_700_000_000);
        vote.fresh_until = vote.valid_after.plus(60);
        let text = format_vote(&vote, &keys.primary_signer());
        assert!(matches!(
            parse_vote(&text, &TimingRules::STANDARD),
            Err(NetdocError::BadTiming(_))
        ));
        assert!(parse_vote(&text, &TimingRules::TESTING).is_ok());
    }

    #[test]
    fn consensus_text_is_not_a_vote() {
        let keys = make_keys(1);
        let vote = make_vote(&keys, 1_700_000_000);
        let text = format_vote(&vote, &keys.primary_signer()).replace("vote-status vote", "vote-status consensus");
        assert!(matches!(
            parse_vote(&text, &TimingRules::STANDARD),
            Err(NetdocError::WrongDocumentType(_))
        ));
    }
}
