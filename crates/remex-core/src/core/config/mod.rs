//! Configuration and store construction.

pub mod settings;

pub use settings::*;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::core::registry::AdapterTable;
use crate::core::store::{MemoryStore, ObjectStore, SqliteStore};

/// Open the store selected by `config`.
///
/// # Errors
/// Returns an error if the persistent store cannot be opened.
pub fn open_store(
    config: &StoreConfig,
    adapters: Arc<AdapterTable>,
) -> Result<Arc<dyn ObjectStore>> {
    debug!(
        backend = config.backend.as_str(),
        path = %config.location.path.display(),
        source = config.location.source,
        "opening object store"
    );
    let store: Arc<dyn ObjectStore> = match config.backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.location.path, adapters)?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
