//! opaque identity address.
//!
//! addresses come from the wallet/identity provider (typically a hex
//! wallet address such as `0xabc...`). the ledger performs no ownership
//! verification; it only requires a well-formed, non-empty identifier.
//! addresses are compared byte-for-byte, without case folding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// maximum length of an address in bytes.
pub const MAX_ADDRESS_LEN: usize = 128;

/// a validated, opaque identity address.
///
/// # Example
/// ```
/// use ballotchain_types::Address;
///
/// let addr: Address = "0xA".parse().unwrap();
/// assert_eq!(addr.as_str(), "0xA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// create a new address, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// get the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        if s.is_empty() {
            return Err(Error::InvalidAddress("address cannot be empty".into()));
        }
        if s.len() > MAX_ADDRESS_LEN {
            return Err(Error::InvalidAddress(format!(
                "address too long ({} bytes, max {})",
                s.len(),
                MAX_ADDRESS_LEN
            )));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidAddress(
                "address cannot contain whitespace".into(),
            ));
        }
        Ok(())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Address {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

// serde: deserialize with validation
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::new(s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        for s in ["0xA", "0xabcdef1234567890abcdef1234567890abcdef12", "alice"] {
            assert!(Address::new(s).is_ok(), "{s} should be valid");
        }
    }

    #[test]
    fn test_empty_address_rejected() {
        assert!(matches!(Address::new(""), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_whitespace_rejected() {
        assert!(Address::new("0x A").is_err());
        assert!(Address::new(" 0xA").is_err());
        assert!(Address::new("0xA\n").is_err());
    }

    #[test]
    fn test_too_long_rejected() {
        let long = "a".repeat(MAX_ADDRESS_LEN + 1);
        assert!(Address::new(long).is_err());
        let max = "a".repeat(MAX_ADDRESS_LEN);
        assert!(Address::new(max).is_ok());
    }

    #[test]
    fn test_case_is_preserved() {
        let upper = Address::new("0xABC").unwrap();
        let lower = Address::new("0xabc").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(upper, "0xABC");
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: Address = serde_json::from_str(r#""0xA""#).unwrap();
        assert_eq!(ok.as_str(), "0xA");
        assert!(serde_json::from_str::<Address>(r#""""#).is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#""0xA""#);
    }
}
