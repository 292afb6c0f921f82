//! Object store contract consumed by the engine, plus the in-memory and
//! SQLite-backed implementations.

use remex_domain::{ObjectId, StorableObject};

use crate::core::tooling::diagnostics;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, STORE_FILENAME};

/// Errors surfaced by object stores.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("[RX404] object {id} is missing from the store")]
    NotFound { id: ObjectId },
    #[error("[RX409] object {id} changed while the commit was prepared")]
    Conflict { id: ObjectId },
    #[error("[RX800] stored object {id} digest mismatch (expected {expected}, found {actual})")]
    DigestMismatch {
        id: ObjectId,
        expected: String,
        actual: String,
    },
    #[error("[RX800] stored object {id} could not be decoded: {error}")]
    Codec { id: ObjectId, error: String },
    #[error("[RX812] store format incompatible for {key}: expected {expected}, found {found}")]
    IncompatibleFormat {
        key: String,
        expected: String,
        found: String,
    },
    #[error("[RX810] store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => diagnostics::store::NOT_FOUND,
            Self::Conflict { .. } => diagnostics::store::CONFLICT,
            Self::DigestMismatch { .. } | Self::Codec { .. } => diagnostics::store::CORRUPT,
            Self::IncompatibleFormat { .. } => diagnostics::store::FORMAT_INCOMPATIBLE,
            Self::Backend(_) => diagnostics::store::BACKEND_FAILURE,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Writes that must land together, guarded by the objects they were
/// derived from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitBatch {
    guards: Vec<StorableObject>,
    writes: Vec<StorableObject>,
}

impl CommitBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the object stored under `expected.id` to still equal `expected`.
    #[must_use]
    pub fn guard(mut self, expected: StorableObject) -> Self {
        self.guards.push(expected);
        self
    }

    /// Store `object` under its own id.
    #[must_use]
    pub fn write(mut self, object: StorableObject) -> Self {
        self.writes.push(object);
        self
    }

    pub fn guards(&self) -> &[StorableObject] {
        &self.guards
    }

    pub fn writes(&self) -> &[StorableObject] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<StorableObject> {
        self.writes
    }
}

/// Keyed container of stored objects.
///
/// Implementations must make each `get`/`set` atomic per key, apply a
/// `commit` atomically across keys, and be safe to share across threads.
/// The engine adds no locking of its own.
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored under `id`, or [`StoreError::NotFound`].
    fn get(&self, id: &ObjectId) -> Result<StorableObject, StoreError>;

    /// Store `obj` under `id`, replacing any previous entry.
    fn set(&self, id: ObjectId, obj: StorableObject) -> Result<(), StoreError>;

    /// Apply every write of `batch` at once, or none of them.
    ///
    /// Fails with [`StoreError::Conflict`] when a guarded object no longer
    /// matches the copy the batch was built from.
    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError>;

    fn contains(&self, id: &ObjectId) -> Result<bool, StoreError> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    fn get(&self, id: &ObjectId) -> Result<StorableObject, StoreError> {
        (**self).get(id)
    }

    fn set(&self, id: ObjectId, obj: StorableObject) -> Result<(), StoreError> {
        (**self).set(id, obj)
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }

    fn contains(&self, id: &ObjectId) -> Result<bool, StoreError> {
        (**self).contains(id)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn get(&self, id: &ObjectId) -> Result<StorableObject, StoreError> {
        (**self).get(id)
    }

    fn set(&self, id: ObjectId, obj: StorableObject) -> Result<(), StoreError> {
        (**self).set(id, obj)
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }

    fn contains(&self, id: &ObjectId) -> Result<bool, StoreError> {
        (**self).contains(id)
    }
}
