use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Content-addressed identifier for a link.
///
/// A `LinkHash` is the BLAKE3 digest of a link's canonical JSON
/// serialization. It renders as a 64-character lowercase hex string, which
/// is also its wire form: the hash serializes to and from a JSON string so
/// it can be used directly as a map key and a URL path segment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkHash([u8; 32]);

impl LinkHash {
    /// Create a `LinkHash` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Parse from a lowercase or uppercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(s).map_err(|e| ValidationError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(ValidationError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase-hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex rendering (first 8 characters), for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkHash({})", self.short_hex())
    }
}

impl fmt::Display for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for LinkHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for LinkHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for LinkHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = LinkHash;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LinkHash, E> {
                LinkHash::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hash = LinkHash::from_hash([0xab; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(LinkHash::from_hex(&hex).unwrap(), hash);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            LinkHash::from_hex("zzzz"),
            Err(ValidationError::InvalidHex(_))
        ));
        assert_eq!(
            LinkHash::from_hex("abcd"),
            Err(ValidationError::InvalidLength(2))
        );
    }

    #[test]
    fn display_is_full_hex() {
        let hash = LinkHash::from_hash([1; 32]);
        assert_eq!(format!("{hash}"), hash.to_hex());
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = LinkHash::from_hash([0x0f; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let parsed: LinkHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn ordering_is_bytewise() {
        let a = LinkHash::from_hash([0; 32]);
        let b = LinkHash::from_hash([1; 32]);
        assert!(a < b);
    }
}
