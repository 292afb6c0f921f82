// Vendor adapters: how foreign payloads cross the wire.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use pep440_rs::Version;
use remex_domain::{Foreign, ForeignObject};
use tracing::{debug, warn};

use crate::core::tooling::diagnostics;

/// Opaque serialized form of a foreign value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VendorBytes {
    pub obj_type: String,
    pub vendor_lib: String,
    pub vendor_lib_version: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("[RX415] no adapter registered for type {type_tag}")]
    UnknownType { type_tag: String },
    #[error("[RX415] type {type_tag} belongs to {expected}, payload names {found}")]
    MissingVendor {
        type_tag: String,
        expected: String,
        found: String,
    },
    #[error("[RX415] invalid {vendor_lib} version '{version}'")]
    InvalidVersion { vendor_lib: String, version: String },
    #[error("[RX415] {type_tag} payload rejected by {vendor_lib}: {reason}")]
    Payload {
        type_tag: String,
        vendor_lib: String,
        reason: String,
    },
}

impl AdapterError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        diagnostics::adapter::UNSUPPORTED
    }
}

/// Foreign type that knows how to serialize itself for its vendor library.
pub trait VendorCodec: Foreign {
    const VENDOR_LIB: &'static str;
    const VENDOR_VERSION: &'static str;

    fn save(&self) -> Vec<u8>;

    fn load(bytes: &[u8]) -> Result<Self, String>;
}

type EncodeFn = fn(&dyn ForeignObject) -> Option<Vec<u8>>;
type DecodeFn = fn(&[u8]) -> Result<Box<dyn ForeignObject>, String>;

/// Type-erased adapter entry.
#[derive(Clone, Copy)]
pub struct ForeignAdapter {
    pub type_tag: &'static str,
    pub vendor_lib: &'static str,
    pub vendor_version: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl ForeignAdapter {
    #[must_use]
    pub fn of<T: VendorCodec>() -> Self {
        Self {
            type_tag: T::TYPE_TAG,
            vendor_lib: T::VENDOR_LIB,
            vendor_version: T::VENDOR_VERSION,
            encode: encode_erased::<T>,
            decode: decode_erased::<T>,
        }
    }
}

impl fmt::Debug for ForeignAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignAdapter")
            .field("type_tag", &self.type_tag)
            .field("vendor_lib", &self.vendor_lib)
            .field("vendor_version", &self.vendor_version)
            .finish_non_exhaustive()
    }
}

fn encode_erased<T: VendorCodec>(value: &dyn ForeignObject) -> Option<Vec<u8>> {
    value.as_any().downcast_ref::<T>().map(<T as VendorCodec>::save)
}

fn decode_erased<T: VendorCodec>(bytes: &[u8]) -> Result<Box<dyn ForeignObject>, String> {
    let value: Box<dyn ForeignObject> = Box::new(T::load(bytes)?);
    Ok(value)
}

/// Adapters keyed by type tag.
#[derive(Clone, Debug, Default)]
pub struct AdapterTable {
    adapters: HashMap<&'static str, ForeignAdapter>,
}

impl AdapterTable {
    pub fn register(&mut self, adapter: ForeignAdapter) {
        debug!(
            type_tag = adapter.type_tag,
            vendor_lib = adapter.vendor_lib,
            "registered vendor adapter"
        );
        self.adapters.insert(adapter.type_tag, adapter);
    }

    #[must_use]
    pub fn get(&self, type_tag: &str) -> Option<&ForeignAdapter> {
        self.adapters.get(type_tag)
    }

    pub fn encode(&self, value: &dyn ForeignObject) -> Result<VendorBytes, AdapterError> {
        let type_tag = value.type_tag();
        let adapter = self.lookup(type_tag)?;
        let content = (adapter.encode)(value).ok_or_else(|| AdapterError::Payload {
            type_tag: type_tag.to_string(),
            vendor_lib: adapter.vendor_lib.to_string(),
            reason: "value does not match the registered type".to_string(),
        })?;
        Ok(VendorBytes {
            obj_type: type_tag.to_string(),
            vendor_lib: adapter.vendor_lib.to_string(),
            vendor_lib_version: adapter.vendor_version.to_string(),
            content,
        })
    }

    /// Rebuild a foreign value. A payload written by a newer vendor version
    /// is still decoded, with a warning.
    pub fn decode(&self, bytes: &VendorBytes) -> Result<Box<dyn ForeignObject>, AdapterError> {
        let adapter = self.lookup(&bytes.obj_type)?;
        if adapter.vendor_lib != bytes.vendor_lib {
            return Err(AdapterError::MissingVendor {
                type_tag: bytes.obj_type.clone(),
                expected: adapter.vendor_lib.to_string(),
                found: bytes.vendor_lib.clone(),
            });
        }
        let encoded = parse_version(&bytes.vendor_lib, &bytes.vendor_lib_version)?;
        let local = parse_version(adapter.vendor_lib, adapter.vendor_version)?;
        if encoded > local {
            warn!(
                type_tag = %bytes.obj_type,
                vendor_lib = %bytes.vendor_lib,
                encoded = %bytes.vendor_lib_version,
                local = adapter.vendor_version,
                "payload was written by a newer vendor version"
            );
        }
        (adapter.decode)(&bytes.content).map_err(|reason| AdapterError::Payload {
            type_tag: bytes.obj_type.clone(),
            vendor_lib: bytes.vendor_lib.clone(),
            reason,
        })
    }

    fn lookup(&self, type_tag: &str) -> Result<&ForeignAdapter, AdapterError> {
        self.get(type_tag).ok_or_else(|| AdapterError::UnknownType {
            type_tag: type_tag.to_string(),
        })
    }
}

fn parse_version(vendor_lib: &str, raw: &str) -> Result<Version, AdapterError> {
    Version::from_str(raw.trim()).map_err(|_| AdapterError::InvalidVersion {
        vendor_lib: vendor_lib.to_string(),
        version: raw.to_string(),
    })
}
