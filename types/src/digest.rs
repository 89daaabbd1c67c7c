//! Fixed-size digest types for authority identities, descriptors and documents.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

macro_rules! digest_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;
            pub const ZERO: Self = Self([0u8; $len]);

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            /// Build from a slice, failing if the length is wrong.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| TypesError::BadDigest {
                    expected: $len,
                    got: bytes.len(),
                })?;
                Ok(Self(arr))
            }

            /// Parse from hexadecimal (either case).
            pub fn from_hex(s: &str) -> Result<Self, TypesError> {
                let bytes = hex::decode(s).map_err(|e| TypesError::BadHex(e.to_string()))?;
                Self::from_slice(&bytes)
            }

            /// Upper-case hexadecimal, as used on the wire.
            pub fn to_hex(&self) -> String {
                hex::encode_upper(self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode_upper(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }
    };
}

digest_type!(
    /// 20-byte digest of an authority or relay identity key (its fingerprint).
    IdentityDigest,
    20
);

digest_type!(
    /// 20-byte digest of a relay's server descriptor.
    DescriptorDigest,
    20
);

digest_type!(
    /// 32-byte document or microdescriptor digest.
    Digest256,
    32
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_upper_case_and_round_trips() {
        let id = IdentityDigest::new([0xab; 20]);
        let hex = id.to_hex();
        assert_eq!(hex, "AB".repeat(20));
        assert_eq!(IdentityDigest::from_hex(&hex).unwrap(), id);
        assert_eq!(IdentityDigest::from_hex(&hex.to_lowercase()).unwrap(), id);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Digest256::from_slice(&[1u8; 20]).unwrap_err();
        assert!(matches!(err, TypesError::BadDigest { expected: 32, got: 20 }));
        assert!(IdentityDigest::from_hex("zz").is_err());
    }

    #[test]
    fn ordering_is_bytewise() {
        let mut a = [0u8; 20];
        let mut b = [0u8; 20];
        a[0] = 1;
        b[19] = 0xff;
        assert!(DescriptorDigest::new(b) < DescriptorDigest::new(a));
    }
}
