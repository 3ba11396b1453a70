use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A 32-byte cryptographic root over a ledger or state trie.
///
/// Serializes as a lowercase hex string so that persisted audit entries
/// stay readable and diffable across nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootHash([u8; 32]);

impl RootHash {
    /// Create a `RootHash` from a pre-computed 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a `RootHash` from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|_| TypeError::InvalidHex(s.to_string()))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| TypeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The all-zero root. Represents an empty ledger or trie.
    pub const fn empty() -> Self {
        Self([0u8; 32])
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for RootHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_hex())
    }
}

impl fmt::Debug for RootHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootHash({})", self.short_hex())
    }
}

impl Serialize for RootHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RootHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = RootHash;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 64-character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RootHash, E> {
                RootHash::from_hex(v).map_err(|e| E::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let root = RootHash::from_bytes([0xab; 32]);
        let parsed = RootHash::from_hex(&root.to_hex()).unwrap();
        assert_eq!(root, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = RootHash::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 2 });
    }

    #[test]
    fn rejects_non_hex() {
        let err = RootHash::from_hex("zz").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn json_round_trip() {
        let root = RootHash::from_bytes([7u8; 32]);
        let json = serde_json::to_string(&root).unwrap();
        assert_eq!(json, format!("\"{}\"", root.to_hex()));
        let back: RootHash = serde_json::from_str(&json).unwrap();
        assert_eq!(root, back);
    }
}
