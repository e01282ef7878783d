//! entry hash type - 32-byte SHA-256 digest used for payload and chain links.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};

use crate::Error;

/// length of an entry hash in bytes (SHA-256).
pub const ENTRY_HASH_LEN: usize = 32;

/// 32-byte SHA-256 digest.
///
/// the all-zero value is the genesis link: `prev_hash` of the first entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntryHash([u8; ENTRY_HASH_LEN]);

impl EntryHash {
    /// `prev_hash` of entry 0.
    pub const GENESIS: EntryHash = EntryHash([0u8; ENTRY_HASH_LEN]);

    /// SHA-256 of `data`.
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// returns the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; ENTRY_HASH_LEN] {
        &self.0
    }

    /// lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// whether this is the genesis link.
    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }
}

impl From<[u8; ENTRY_HASH_LEN]> for EntryHash {
    fn from(bytes: [u8; ENTRY_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for EntryHash {
    type Error = Error;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; ENTRY_HASH_LEN] =
            slice.try_into().map_err(|_| Error::InvalidHashLength {
                expected: ENTRY_HASH_LEN,
                actual: slice.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl std::str::FromStr for EntryHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryHash({})", hex::encode(self.0))
    }
}

impl Serialize for EntryHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for EntryHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(de::Error::custom)?;
        Self::try_from(bytes.as_slice()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_all_zero() {
        assert_eq!(EntryHash::GENESIS.as_bytes(), &[0u8; ENTRY_HASH_LEN]);
        assert!(EntryHash::GENESIS.is_genesis());
        assert!(!EntryHash::digest(b"").is_genesis());
    }

    #[test]
    fn digest_matches_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            EntryHash::digest(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn try_from_slice_invalid_length() {
        let short = [0u8; 16];
        assert!(matches!(
            EntryHash::try_from(&short[..]),
            Err(Error::InvalidHashLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn parse_from_hex() {
        let hash = EntryHash::digest(b"ballot");
        let parsed: EntryHash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);
        assert!("zz".parse::<EntryHash>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = EntryHash::from([0xde; ENTRY_HASH_LEN]);
        let json = serde_json::to_string(&hash).unwrap();
        assert!(json.starts_with("\"dedede"));
        let parsed: EntryHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, parsed);
    }
}
