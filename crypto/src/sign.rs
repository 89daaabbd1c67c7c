//! Ed25519 signing and verification of document digests.

use dirauth_types::{DocumentSignature, PublicKey, SignatureStatus};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use crate::fingerprint;

/// Sign a document digest, returning the raw 64-byte signature.
pub fn sign_digest(digest: &[u8], key: &SigningKey) -> Vec<u8> {
    key.sign(digest).to_bytes().to_vec()
}

/// Verify a signature over a digest.
///
/// Returns `false` for malformed keys or signatures of the wrong length.
pub fn verify_digest(digest: &[u8], signature: &[u8], key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(key.as_bytes()) else {
        return false;
    };
    let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(digest, &sig).is_ok()
}

/// Check `sig` against `digest` with `key`, recording the outcome in its
/// status. A key whose fingerprint differs from the claimed signing-key
/// digest marks the signature bad.
pub fn check_signature(sig: &mut DocumentSignature, digest: &[u8], key: &PublicKey) -> bool {
    let ok = fingerprint(key) == sig.signing_key_digest && verify_digest(digest, &sig.signature, key);
    sig.status = if ok {
        SignatureStatus::Good
    } else {
        SignatureStatus::Bad
    };
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirauth_types::{DigestAlgorithm, IdentityDigest};

    fn make_key(seed: u8) -> (SigningKey, PublicKey) {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let public = PublicKey(key.verifying_key().to_bytes());
        (key, public)
    }

    #[test]
    fn sign_and_verify() {
        let (key, public) = make_key(7);
        let sig = sign_digest(b"digest bytes", &key);
        assert_eq!(sig.len(), 64);
        assert!(verify_digest(b"digest bytes", &sig, &public));
        assert!(!verify_digest(b"other bytes", &sig, &public));
    }

    #[test]
    fn wrong_key_or_length_fails() {
        let (key, _) = make_key(7);
        let (_, other) = make_key(8);
        let sig = sign_digest(b"d", &key);
        assert!(!verify_digest(b"d", &sig, &other));
        assert!(!verify_digest(b"d", &sig[..10], &other));
    }

    #[test]
    fn check_signature_records_status() {
        let (key, public) = make_key(3);
        let mut sig = DocumentSignature {
            alg: DigestAlgorithm::Sha256,
            identity: IdentityDigest::new([1; 20]),
            signing_key_digest: fingerprint(&public),
            signature: sign_digest(b"d", &key),
            status: SignatureStatus::Unchecked,
        };
        assert!(check_signature(&mut sig, b"d", &public));
        assert!(sig.is_good());

        sig.signing_key_digest = IdentityDigest::new([9; 20]);
        assert!(!check_signature(&mut sig, b"d", &public));
        assert!(sig.is_bad());
    }
}
