use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of bytes in an encoded [`ObjectId`].
pub const OBJECT_ID_LEN: usize = 16;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    #[error("object id must be {OBJECT_ID_LEN} bytes, found {0}")]
    Length(usize),
    #[error("invalid object id '{0}'")]
    Parse(String),
}

/// Opaque identifier of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Allocate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| IdError::Length(bytes.len()))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| IdError::Parse(value.to_string()))
    }
}

/// Locator of the node an action is addressed to.
///
/// Every route segment is optional; an address with no segments names the
/// local node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<ObjectId>,
}

impl Address {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_vm(mut self, vm: ObjectId) -> Self {
        self.vm = Some(vm);
        self
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("<unnamed>");
        write!(f, "{name}")?;
        for (label, segment) in [
            ("network", self.network),
            ("domain", self.domain),
            ("device", self.device),
            ("vm", self.vm),
        ] {
            if let Some(id) = segment {
                write!(f, " {label}={id}")?;
            }
        }
        Ok(())
    }
}
