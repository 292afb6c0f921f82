use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("verify key must be {PUBLIC_KEY_LENGTH} bytes, found {0}")]
    Length(usize),
    #[error("verify key is not a valid ed25519 point")]
    InvalidPoint,
    #[error("verify key is not valid hex: {0}")]
    Hex(String),
}

/// Public identity of a requester or reader.
///
/// Only ever used as a permission-map key; the engine never pairs it with a
/// signing key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerifyKey([u8; PUBLIC_KEY_LENGTH]);

impl VerifyKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::Length(bytes.len()))?;
        VerifyingKey::from_bytes(&raw).map_err(|_| KeyError::InvalidPoint)?;
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<VerifyingKey> for VerifyKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl From<&VerifyingKey> for VerifyKey {
    fn from(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl FromStr for VerifyKey {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(value.trim()).map_err(|err| KeyError::Hex(err.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for VerifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for VerifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short prefix keeps permission dumps readable
        write!(f, "VerifyKey({}..)", &self.to_hex()[..12])
    }
}

impl Serialize for VerifyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VerifyKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn key(seed: u8) -> VerifyKey {
        SigningKey::from_bytes(&[seed; 32]).verifying_key().into()
    }

    #[test]
    fn hex_form_round_trips() -> anyhow::Result<()> {
        let original = key(3);
        let parsed: VerifyKey = original.to_hex().parse()?;
        assert_eq!(parsed, original);
        Ok(())
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(VerifyKey::from_bytes(&[0u8; 5]), Err(KeyError::Length(5)));
    }

    #[test]
    fn serde_uses_hex_strings() -> anyhow::Result<()> {
        let original = key(9);
        let json = serde_json::to_string(&original)?;
        assert_eq!(json, format!("\"{}\"", original.to_hex()));
        let back: VerifyKey = serde_json::from_str(&json)?;
        assert_eq!(back, original);
        Ok(())
    }
}
