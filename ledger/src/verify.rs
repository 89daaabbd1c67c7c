//! Signature checks against the authority roster.

use dirauth_crypto::check_signature;
use dirauth_types::{AuthorityRoster, Consensus, SignatureStatus, Vote};

/// Check every signature on `vote` against the roster, returning whether at
/// least one is good.
pub fn check_vote_signatures(vote: &mut Vote, roster: &AuthorityRoster) -> bool {
    let digest = vote.voter.vote_digest;
    let mut any_good = false;
    for sig in vote.voter.signatures.iter_mut() {
        match roster.key_for_signer(&sig.identity) {
            Some(key) => any_good |= check_signature(sig, digest.as_bytes(), &key),
            None => sig.status = SignatureStatus::Unchecked,
        }
    }
    any_good
}

/// Check every not-yet-checked signature on `consensus`.
///
/// Signatures from unknown signers, or over a digest the document lacks,
/// stay unchecked.
pub fn check_consensus_signatures(consensus: &mut Consensus, roster: &AuthorityRoster) {
    let digests = consensus.digests.clone();
    for voter in consensus.voters.iter_mut() {
        for sig in voter.signatures.iter_mut() {
            if sig.status != SignatureStatus::Unchecked {
                continue;
            }
            let (Some(key), Some(digest)) = (roster.key_for_signer(&sig.identity), digests.get(sig.alg))
            else {
                continue;
            };
            if !check_signature(sig, digest.as_bytes(), &key) {
                tracing::warn!(
                    voter = %sig.identity,
                    alg = %sig.alg,
                    "bad signature on consensus"
                );
            }
        }
    }
}

/// Number of roster authorities (by primary identity) with a good signature.
pub fn count_good_authorities(consensus: &Consensus, roster: &AuthorityRoster) -> usize {
    consensus
        .voters
        .iter()
        .filter(|v| roster.contains(&v.identity) && v.has_good_signature())
        .count()
}
