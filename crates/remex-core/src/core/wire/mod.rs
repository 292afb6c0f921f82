//! Protobuf wire codec for actions and stored objects.

use remex_domain::{IdError, KeyError, ObjectId};

use crate::core::registry::AdapterError;
use crate::core::tooling::diagnostics;

mod action;
mod object;
mod proto;

pub use action::{decode_action, encode_action};
pub use object::{decode_object, encode_object};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("[RX400] malformed message: {0}")]
    Malformed(#[from] prost::DecodeError),
    #[error("[RX400] message is missing {0}")]
    MissingField(&'static str),
    #[error("[RX400] invalid id in {field}: {source}")]
    InvalidId {
        field: &'static str,
        #[source]
        source: IdError,
    },
    #[error("[RX400] unknown property kind tag {0}")]
    UnknownKind(u32),
    #[error("[RX400] duplicate keyword argument '{0}'")]
    DuplicateKwarg(String),
    #[error("[RX400] invalid read permission key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl DecodeError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Adapter(err) => err.code(),
            _ => diagnostics::wire::MALFORMED,
        }
    }
}

fn decode_id(field: &'static str, bytes: &[u8]) -> Result<ObjectId, DecodeError> {
    ObjectId::from_slice(bytes).map_err(|source| DecodeError::InvalidId { field, source })
}
