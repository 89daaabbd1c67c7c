//! Authority key material.
//!
//! An authority holds a long-term identity key, a medium-term signing key
//! and, optionally, a legacy key pair that co-signs every document. Keys are
//! derived from 32-byte Ed25519 seeds stored as hex.

use std::path::Path;

use dirauth_types::{IdentityDigest, PublicKey};
use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{fingerprint, CryptoError};

/// A 32-byte Ed25519 seed.
///
/// Does not implement `Debug`, `Serialize` or `Clone`. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeySeed(pub [u8; 32]);

impl KeySeed {
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(s.trim()).map_err(|e| CryptoError::BadKey(e.to_string()))?;
        let result = <[u8; 32]>::try_from(bytes.as_slice())
            .map(KeySeed)
            .map_err(|_| CryptoError::BadKey(format!("expected 32 bytes, got {}", bytes.len())));
        bytes.zeroize();
        result
    }

    pub fn from_file(path: &Path) -> Result<Self, CryptoError> {
        let mut content = std::fs::read_to_string(path)?;
        let seed = Self::from_hex(&content);
        content.zeroize();
        seed
    }
}

/// One signing slot: the identity a signature is attributed to and the key
/// that produces it.
pub struct DocumentSigner<'a> {
    pub identity: IdentityDigest,
    pub key: &'a SigningKey,
}

impl DocumentSigner<'_> {
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.key.verifying_key().to_bytes())
    }

    pub fn signing_key_digest(&self) -> IdentityDigest {
        fingerprint(&self.public_key())
    }
}

pub struct AuthorityKeys {
    identity: SigningKey,
    signing: SigningKey,
    legacy: Option<SigningKey>,
}

impl AuthorityKeys {
    pub fn from_seeds(identity: &KeySeed, signing: &KeySeed, legacy: Option<&KeySeed>) -> Self {
        Self {
            identity: SigningKey::from_bytes(&identity.0),
            signing: SigningKey::from_bytes(&signing.0),
            legacy: legacy.map(|seed| SigningKey::from_bytes(&seed.0)),
        }
    }

    pub fn identity_public(&self) -> PublicKey {
        PublicKey(self.identity.verifying_key().to_bytes())
    }

    pub fn signing_public(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    pub fn legacy_public(&self) -> Option<PublicKey> {
        self.legacy
            .as_ref()
            .map(|k| PublicKey(k.verifying_key().to_bytes()))
    }

    pub fn identity_digest(&self) -> IdentityDigest {
        fingerprint(&self.identity_public())
    }

    pub fn legacy_identity_digest(&self) -> Option<IdentityDigest> {
        self.legacy_public().map(|k| fingerprint(&k))
    }

    /// The primary signer (identity digest, signing key).
    pub fn primary_signer(&self) -> DocumentSigner<'_> {
        DocumentSigner {
            identity: self.identity_digest(),
            key: &self.signing,
        }
    }

    /// The legacy signer, when a legacy key is configured.
    pub fn legacy_signer(&self) -> Option<DocumentSigner<'_>> {
        self.legacy.as_ref().map(|key| DocumentSigner {
            identity: fingerprint(&PublicKey(key.verifying_key().to_bytes())),
            key,
        })
    }

    /// Every signer that must sign a consensus, primary first.
    pub fn signers(&self) -> Vec<DocumentSigner<'_>> {
        let mut signers = vec![self.primary_signer()];
        signers.extend(self.legacy_signer());
        signers
    }
}
