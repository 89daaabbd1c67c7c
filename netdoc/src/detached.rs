//! Detached signature documents.
//!
//! ```text
//! consensus-digest <ns sha256 hex>
//! valid-after / fresh-until / valid-until
//! additional-digest <flavor> <alg> <hex>      (other flavors)
//! additional-signature <flavor> <alg> FP SKFP (other flavors)
//! directory-signature FP SKFP                 (ns)
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use dirauth_types::{
    Consensus, DetachedSignatureSet, Digest256, DigestAlgorithm, DocumentDigests, Flavor,
};

use crate::reader::Cursor;
use crate::signature::{
    format_signatures, parse_additional_signature, parse_directory_signature,
    ADDITIONAL_SIGNATURE_KEYWORD,
};
use crate::NetdocError;

/// Render the detached signatures of every pending flavor.
///
/// Requires an ns consensus: its sha256 digest and period head the document.
pub fn format_detached_signatures(
    pending: &BTreeMap<Flavor, Consensus>,
) -> Result<String, NetdocError> {
    let ns = pending
        .get(&Flavor::Ns)
        .ok_or_else(|| NetdocError::Other("no ns consensus to describe".into()))?;
    let ns_digest = ns
        .digests
        .get(DigestAlgorithm::Sha256)
        .ok_or_else(|| NetdocError::Other("ns consensus has no sha256 digest".into()))?;

    let mut out = String::new();
    let _ = writeln!(out, "consensus-digest {ns_digest}");
    let _ = writeln!(out, "valid-after {}", ns.valid_after);
    let _ = writeln!(out, "fresh-until {}", ns.fresh_until);
    let _ = writeln!(out, "valid-until {}", ns.valid_until);

    for (flavor, consensus) in pending.iter().filter(|(f, _)| **f != Flavor::Ns) {
        for (alg, digest) in consensus.digests.iter() {
            let _ = writeln!(out, "additional-digest {flavor} {alg} {digest}");
        }
    }
    for consensus in pending.values().filter(|c| c.flavor != Flavor::Ns) {
        out.push_str(&format_signatures(consensus, true));
    }
    out.push_str(&format_signatures(ns, true));
    Ok(out)
}

/// Parse a detached signature document. Signatures are returned unchecked.
pub fn parse_detached_signatures(text: &str) -> Result<DetachedSignatureSet, NetdocError> {
    let mut c = Cursor::new(text)?;
    let mut set = DetachedSignatureSet::default();
    let mut seen = [false; 4];

    while let Some(item) = c.next_item() {
        match item.keyword {
            "consensus-digest" => {
                if seen[0] {
                    return Err(item.error("duplicate consensus-digest"));
                }
                let digest =
                    Digest256::from_hex(item.arg(0)?).map_err(|e| item.error(e.to_string()))?;
                set.digests
                    .entry(Flavor::Ns)
                    .or_insert_with(DocumentDigests::new)
                    .insert(DigestAlgorithm::Sha256, digest);
                seen[0] = true;
            }
            "valid-after" => {
                set.valid_after = item.timestamp()?;
                seen[1] = true;
            }
            "fresh-until" => {
                set.fresh_until = item.timestamp()?;
                seen[2] = true;
            }
            "valid-until" => {
                set.valid_until = item.timestamp()?;
                seen[3] = true;
            }
            "additional-digest" => {
                let flavor: Flavor = item.arg(0)?.parse()?;
                if flavor == Flavor::Ns {
                    return Err(item.error("additional-digest for ns flavor"));
                }
                let alg: DigestAlgorithm = item.arg(1)?.parse()?;
                let digest =
                    Digest256::from_hex(item.arg(2)?).map_err(|e| item.error(e.to_string()))?;
                let digests = set.digests.entry(flavor).or_insert_with(DocumentDigests::new);
                if digests.get(alg).is_some() {
                    return Err(item.error("repeated digest"));
                }
                digests.insert(alg, digest);
            }
            ADDITIONAL_SIGNATURE_KEYWORD => {
                let (flavor, sig) = parse_additional_signature(&item)?;
                set.signatures.entry(flavor).or_default().push(sig);
            }
            "directory-signature" => {
                let sig = parse_directory_signature(&item)?;
                set.signatures.entry(Flavor::Ns).or_default().push(sig);
            }
            keyword => tracing::trace!(keyword, "ignoring unrecognized detached item"),
        }
    }

    if seen.iter().any(|s| !s) {
        return Err(NetdocError::Missing {
            line: 0,
            keyword: "consensus-digest/valid-after/fresh-until/valid-until",
        });
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::make_signature;
    use crate::testutil::make_keys;
    use dirauth_types::{ConsensusVoter, NetParams, ProtocolLines, Timestamp};
    use std::net::Ipv4Addr;

    fn make_pending(flavor: Flavor, digest_byte: u8) -> Consensus {
        let keys = make_keys(1);
        let va = Timestamp::new(1_700_000_000);
        let mut digests = DocumentDigests::new();
        digests.insert(DigestAlgorithm::Sha256, Digest256::new([digest_byte; 32]));
        digests.insert(DigestAlgorithm::Blake2b256, Digest256::new([digest_byte + 1; 32]));
        let sig = make_signature(
            flavor.signing_digest(),
            digests.get(flavor.signing_digest()).unwrap().as_bytes(),
            &keys.primary_signer(),
        );
        Consensus {
            flavor,
            consensus_method: 32,
            valid_after: va,
            fresh_until: va.plus(3600),
            valid_until: va.plus(10_800),
            vote_seconds: 300,
            dist_seconds: 300,
            client_versions: String::new(),
            server_versions: String::new(),
            package_lines: Vec::new(),
            known_flags: Vec::new(),
            protocols: ProtocolLines::default(),
            params: NetParams::new(),
            voters: vec![ConsensusVoter {
                nickname: "auth".into(),
                identity: keys.identity_digest(),
                address: "auth.example".into(),
                ipv4: Ipv4Addr::new(192, 0, 2, 1),
                dir_port: 80,
                or_port: 443,
                contact: Some(String::new()),
                vote_digest: None,
                is_legacy: false,
                signatures: vec![sig],
            }],
            routers: Vec::new(),
            bandwidth_weights: None,
            digests,
        }
    }

    #[test]
    fn detached_document_round_trips() {
        let mut pending = BTreeMap::new();
        pending.insert(Flavor::Ns, make_pending(Flavor::Ns, 10));
        pending.insert(Flavor::Microdesc, make_pending(Flavor::Microdesc, 20));

        let text = format_detached_signatures(&pending).unwrap();
        assert!(text.starts_with(&format!("consensus-digest {}", "0A".repeat(32))));
        let set = parse_detached_signatures(&text).unwrap();

        assert_eq!(set.valid_after, Timestamp::new(1_700_000_000));
        assert_eq!(
            set.digests[&Flavor::Ns].get(DigestAlgorithm::Sha256),
            Some(&Digest256::new([10; 32]))
        );
        assert_eq!(
            set.digests[&Flavor::Microdesc].get(DigestAlgorithm::Blake2b256),
            Some(&Digest256::new([21; 32]))
        );
        assert_eq!(set.signatures_for(Flavor::Ns).unwrap().len(), 1);
        let md = set.signatures_for(Flavor::Microdesc).unwrap();
        assert_eq!(md[0].alg, DigestAlgorithm::Blake2b256);
        assert_eq!(set.total_signatures(), 2);
    }

    #[test]
    fn detached_requires_ns_flavor() {
        let mut pending = BTreeMap::new();
        pending.insert(Flavor::Microdesc, make_pending(Flavor::Microdesc, 20));
        assert!(format_detached_signatures(&pending).is_err());
    }

    #[test]
    fn missing_period_is_rejected() {
        let text = format!("consensus-digest {}\nvalid-after 2023-11-14 22:13:20\n", "AB".repeat(32));
        assert!(parse_detached_signatures(&text).is_err());
    }
}
