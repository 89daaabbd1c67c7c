//! Folding detached signatures into a pending consensus.

use dirauth_crypto::check_signature;
use dirauth_types::{AuthorityRoster, Consensus, DetachedSignatureSet, Flavor, SignatureStatus};

use crate::LedgerError;

/// Add the signatures in `sigs` for `target`'s flavor to `target`,
/// returning how many were added or replaced.
///
/// The period must match, and every digest `sigs` lists for the flavor must
/// equal ours, with at least one present. A digest we don't hold, or a
/// flavor with no digests at all, refuses the whole document rather than
/// skipping the unrecognized entries: signatures over a different document
/// are never worth keeping.
///
/// A signature is skipped when we already hold a good one from that voter
/// with that algorithm, when we hold the same bytes, or when it fails to
/// verify. Bad signatures are never stored, so the count only covers
/// signatures that stay in the rewritten document.
pub fn add_detached_signatures(
    target: &mut Consensus,
    sigs: &DetachedSignatureSet,
    roster: &AuthorityRoster,
    source: &str,
) -> Result<usize, LedgerError> {
    let flavor = target.flavor;

    if sigs.valid_after != target.valid_after {
        return Err(LedgerError::SignatureTimesMismatch(
            "Valid-After times do not match when adding detached signatures to consensus",
        ));
    }
    if sigs.fresh_until != target.fresh_until {
        return Err(LedgerError::SignatureTimesMismatch(
            "Fresh-Until times do not match when adding detached signatures to consensus",
        ));
    }
    if sigs.valid_until != target.valid_until {
        return Err(LedgerError::SignatureTimesMismatch(
            "Valid-Until times do not match when adding detached signatures to consensus",
        ));
    }

    let Some(sig_list) = sigs.signatures_for(flavor) else {
        return Err(LedgerError::MissingFlavorSignatures);
    };
    let Some(digests) = sigs.digests.get(&flavor) else {
        return Err(LedgerError::MissingFlavorDigests);
    };
    let mut matches = 0;
    for (alg, digest) in digests.iter() {
        if target.digests.get(alg) == Some(digest) {
            matches += 1;
        } else {
            return Err(LedgerError::MismatchedDigest);
        }
    }
    if matches == 0 {
        return Err(LedgerError::NoRecognizedDigests);
    }

    tracing::debug!(
        flavor = %flavor,
        count = sig_list.len(),
        "have signatures for adding to consensus"
    );

    let target_digests = target.digests.clone();
    let mut added = 0;
    for incoming in sig_list {
        let Some(voter) = target.voter_mut(&incoming.identity) else {
            tracing::debug!(voter = %incoming.identity, "we do not know any voter with this identity");
            continue;
        };
        let held = voter
            .signatures
            .iter()
            .position(|s| s.alg == incoming.alg);
        if held.is_some_and(|idx| voter.signatures[idx].is_good()) {
            tracing::debug!(
                voter = %incoming.identity,
                alg = %incoming.alg,
                "we already have a good signature"
            );
            continue;
        }
        if held.is_some_and(|idx| voter.signatures[idx].signature == incoming.signature) {
            tracing::debug!(voter = %incoming.identity, "we already have this signature");
            continue;
        }

        let mut sig = incoming.clone();
        if sig.status == SignatureStatus::Unchecked {
            if let (Some(key), Some(digest)) = (
                roster.key_for_signer(&sig.identity),
                target_digests.get(sig.alg),
            ) {
                check_signature(&mut sig, digest.as_bytes(), &key);
            }
        }

        if sig.is_bad() {
            tracing::debug!(voter = %sig.identity, source, "not adding signature that fails to verify");
            continue;
        }
        if flavor == Flavor::Ns {
            tracing::info!(flavor = %flavor, voter = %voter.nickname, source, "added a signature");
        } else {
            tracing::debug!(flavor = %flavor, voter = %voter.nickname, source, "added a signature");
        }
        if let Some(idx) = held {
            voter.signatures.remove(idx);
        }
        voter.signatures.push(sig);
        added += 1;
    }
    Ok(added)
}
