//! Document digests and key fingerprints.

use blake2::digest::consts::{U20, U32};
use blake2::Blake2b;
use dirauth_types::{Digest256, DigestAlgorithm, DocumentDigests, IdentityDigest, PublicKey};
use sha2::{Digest, Sha256};

type Blake2b256 = Blake2b<U32>;
type Blake2b160 = Blake2b<U20>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Compute the SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}

/// Digest `data` with the given algorithm.
pub fn document_digest(alg: DigestAlgorithm, data: &[u8]) -> Digest256 {
    match alg {
        DigestAlgorithm::Sha256 => Digest256::new(sha256(data)),
        DigestAlgorithm::Blake2b256 => Digest256::new(blake2b_256(data)),
    }
}

/// Digest `data` with every supported algorithm.
pub fn document_digests(data: &[u8]) -> DocumentDigests {
    let mut digests = DocumentDigests::new();
    for alg in DigestAlgorithm::ALL {
        digests.insert(alg, document_digest(alg, data));
    }
    digests
}

/// The 20-byte fingerprint identifying a public key.
pub fn fingerprint(key: &PublicKey) -> IdentityDigest {
    let mut hasher = Blake2b160::new();
    hasher.update(key.as_bytes());
    let mut output = [0u8; 20];
    output.copy_from_slice(&hasher.finalize());
    IdentityDigest::new(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn algorithms_differ() {
        let a = document_digest(DigestAlgorithm::Sha256, b"network-status-version 3\n");
        let b = document_digest(DigestAlgorithm::Blake2b256, b"network-status-version 3\n");
        assert_ne!(a, b);
        let all = document_digests(b"network-status-version 3\n");
        assert_eq!(all.get(DigestAlgorithm::Sha256), Some(&a));
        assert_eq!(all.get(DigestAlgorithm::Blake2b256), Some(&b));
    }

    #[test]
    fn fingerprint_is_deterministic_and_key_specific() {
        let f1 = fingerprint(&PublicKey([1; 32]));
        assert_eq!(f1, fingerprint(&PublicKey([1; 32])));
        assert_ne!(f1, fingerprint(&PublicKey([2; 32])));
        assert!(!f1.is_zero());
    }
}
