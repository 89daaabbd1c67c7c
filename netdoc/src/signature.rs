//! Signature items and document signing.

use std::fmt::Write as _;

use dirauth_crypto::{document_digest, sign_digest, DocumentSigner};
use dirauth_types::{
    Consensus, DigestAlgorithm, DocumentSignature, Flavor, IdentityDigest, SignatureStatus,
};

use crate::encode::{push_object, SIGNATURE_KEYWORD};
use crate::reader::Item;
use crate::NetdocError;

pub const ADDITIONAL_SIGNATURE_KEYWORD: &str = "additional-signature";
const SIGNATURE_LABEL: &str = "SIGNATURE";

/// Append a `directory-signature [alg] FP SKFP` item and its object.
///
/// The algorithm name is omitted for sha256.
pub fn push_directory_signature(out: &mut String, sig: &DocumentSignature) {
    out.push_str(SIGNATURE_KEYWORD);
    out.push(' ');
    if sig.alg != DigestAlgorithm::Sha256 {
        let _ = write!(out, "{} ", sig.alg);
    }
    let _ = writeln!(out, "{} {}", sig.identity, sig.signing_key_digest);
    push_object(out, SIGNATURE_LABEL, &sig.signature);
}

/// Append an `additional-signature flavor alg FP SKFP` item and its object.
pub fn push_additional_signature(out: &mut String, flavor: Flavor, sig: &DocumentSignature) {
    let _ = writeln!(
        out,
        "{ADDITIONAL_SIGNATURE_KEYWORD} {flavor} {} {} {}",
        sig.alg, sig.identity, sig.signing_key_digest
    );
    push_object(out, SIGNATURE_LABEL, &sig.signature);
}

/// Parse a `directory-signature` item.
pub fn parse_directory_signature(item: &Item<'_>) -> Result<DocumentSignature, NetdocError> {
    let tokens = item.tokens();
    let (alg, id_idx) = match tokens.len() {
        2 => (DigestAlgorithm::Sha256, 0),
        3 => (tokens[0].parse::<DigestAlgorithm>()?, 1),
        n => return Err(item.error(format!("expected 2 or 3 arguments, got {n}"))),
    };
    signature_from_parts(item, alg, id_idx)
}

/// Parse an `additional-signature` item into its flavor and signature.
pub fn parse_additional_signature(
    item: &Item<'_>,
) -> Result<(Flavor, DocumentSignature), NetdocError> {
    let flavor: Flavor = item.arg(0)?.parse()?;
    let alg: DigestAlgorithm = item.arg(1)?.parse()?;
    Ok((flavor, signature_from_parts(item, alg, 2)?))
}

fn signature_from_parts(
    item: &Item<'_>,
    alg: DigestAlgorithm,
    id_idx: usize,
) -> Result<DocumentSignature, NetdocError> {
    let identity = item.fingerprint_arg(id_idx)?;
    let signing_key_digest = item.fingerprint_arg(id_idx + 1)?;
    let object = item
        .object
        .as_ref()
        .ok_or_else(|| item.error("missing signature object"))?;
    if object.label != SIGNATURE_LABEL {
        return Err(item.error(format!("unexpected object {}", object.label)));
    }
    Ok(DocumentSignature {
        alg,
        identity,
        signing_key_digest,
        signature: object.data.clone(),
        status: SignatureStatus::Unchecked,
    })
}

/// Sign the document `unsigned` (which must end just before the signature
/// section) with every signer, and return the complete text.
///
/// All signatures cover the same digest: `unsigned` followed by the first
/// `directory-signature ` token.
pub fn sign_document(unsigned: &str, alg: DigestAlgorithm, signers: &[DocumentSigner<'_>]) -> String {
    let mut signed = String::with_capacity(unsigned.len() + 32);
    signed.push_str(unsigned);
    signed.push_str(SIGNATURE_KEYWORD);
    signed.push(' ');
    let digest = document_digest(alg, signed.as_bytes());

    let mut out = String::from(unsigned);
    for signer in signers {
        let sig = make_signature(alg, digest.as_bytes(), signer);
        push_directory_signature(&mut out, &sig);
    }
    out
}

/// Sign `digest` on behalf of `signer`.
pub fn make_signature(
    alg: DigestAlgorithm,
    digest: &[u8],
    signer: &DocumentSigner<'_>,
) -> DocumentSignature {
    DocumentSignature {
        alg,
        identity: signer.identity,
        signing_key_digest: signer.signing_key_digest(),
        signature: sign_digest(digest, signer.key),
        status: SignatureStatus::Good,
    }
}

/// Format every usable signature on `consensus`.
///
/// Missing and known-bad signatures are skipped. In detached form, flavors
/// other than ns use `additional-signature` items.
pub fn format_signatures(consensus: &Consensus, detached: bool) -> String {
    let mut out = String::new();
    for voter in &consensus.voters {
        for sig in &voter.signatures {
            if sig.signature.is_empty() || sig.is_bad() {
                continue;
            }
            if detached && consensus.flavor != Flavor::Ns {
                push_additional_signature(&mut out, consensus.flavor, sig);
            } else {
                push_directory_signature(&mut out, sig);
            }
        }
    }
    out
}

/// Identities that have a good signature on `consensus`.
pub fn good_signers(consensus: &Consensus) -> Vec<IdentityDigest> {
    consensus
        .voters
        .iter()
        .filter(|v| v.has_good_signature())
        .map(|v| v.identity)
        .collect()
}
