//! Cryptographic primitives for the directory-authority voting protocol.
//!
//! - **SHA-256** and **Blake2b-256** digests over a document's signed portion
//! - **Blake2b-160** fingerprints of public keys (authority identities)
//! - **Ed25519** signatures over document digests
//! - [`AuthorityKeys`]: the identity, signing and optional legacy keys of
//!   this authority

pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use hash::{blake2b_256, document_digest, document_digests, fingerprint, sha256};
pub use keys::{AuthorityKeys, DocumentSigner, KeySeed};
pub use sign::{check_signature, sign_digest, verify_digest};
