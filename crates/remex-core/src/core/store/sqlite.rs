// Persistent store: one sqlite file, objects encoded with the wire object codec.
use std::{
    fs,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use remex_domain::{ObjectId, StorableObject};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{CommitBatch, ObjectStore, StoreError};
use crate::core::registry::AdapterTable;
use crate::core::wire::{decode_object, encode_object};

pub const STORE_FILENAME: &str = "objects.sqlite";
const SCHEMA_VERSION: u32 = 1;
const META_KEY_SCHEMA_VERSION: &str = "schema_version";
const META_KEY_CREATED_BY: &str = "created_by_version";
const META_KEY_LAST_USED: &str = "last_used_version";
const REMEX_VERSION: &str = env!("CARGO_PKG_VERSION");
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Object store persisted in `<root>/objects.sqlite`.
///
/// A connection is opened per call, so the handle can be shared freely
/// between threads; sqlite serializes the writers.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    root: PathBuf,
    adapters: Arc<AdapterTable>,
}

impl SqliteStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created, the schema cannot be
    /// initialized, or the existing store was written with another schema
    /// version.
    pub fn open(root: impl Into<PathBuf>, adapters: Arc<AdapterTable>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create store root {}", root.display()))?;
        let store = Self { root, adapters };
        let mut conn = store.connection_raw()?;
        store.init_schema(&conn)?;
        store.ensure_meta(&mut conn)?;
        debug!(root = %store.root.display(), "sqlite store ready");
        Ok(store)
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.root.join(STORE_FILENAME)
    }

    /// Sorted ids of every stored object.
    pub fn ids(&self) -> Result<Vec<ObjectId>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT id FROM objects ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            let id = raw
                .parse::<ObjectId>()
                .map_err(|err| StoreError::Backend(format!("invalid id column '{raw}': {err}")))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn connection(&self) -> Result<Connection, StoreError> {
        let conn = self
            .connection_raw()
            .map_err(|err| StoreError::Backend(format!("{err:#}")))?;
        Ok(conn)
    }

    fn connection_raw(&self) -> Result<Connection> {
        let path = self.db_path();
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open object store at {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("failed to set busy timeout for object store")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("failed to enable WAL for object store")?;
        Ok(conn)
    }

    fn init_schema(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS objects (
                id TEXT PRIMARY KEY,
                payload BLOB NOT NULL,
                digest TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .context("failed to initialize object store schema")?;
        Ok(())
    }

    fn ensure_meta(&self, conn: &mut Connection) -> Result<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to start object store meta transaction")?;
        tx.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params![META_KEY_SCHEMA_VERSION, SCHEMA_VERSION.to_string()],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params![META_KEY_CREATED_BY, REMEX_VERSION],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO meta(key, value) VALUES (?1, ?2)",
            params![META_KEY_LAST_USED, REMEX_VERSION],
        )?;
        tx.commit()?;

        let found: String = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![META_KEY_SCHEMA_VERSION],
                |row| row.get(0),
            )
            .context("failed to read object store schema version")?;
        if found != SCHEMA_VERSION.to_string() {
            return Err(StoreError::IncompatibleFormat {
                key: META_KEY_SCHEMA_VERSION.to_string(),
                expected: SCHEMA_VERSION.to_string(),
                found,
            }
            .into());
        }
        Ok(())
    }
}

impl SqliteStore {
    fn read_row(&self, conn: &Connection, id: &ObjectId) -> Result<StorableObject, StoreError> {
        let row = conn
            .query_row(
                "SELECT payload, digest FROM objects WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((payload, expected)) = row else {
            return Err(StoreError::NotFound { id: *id });
        };
        let actual = hex::encode(Sha256::digest(&payload));
        if actual != expected {
            return Err(StoreError::DigestMismatch {
                id: *id,
                expected,
                actual,
            });
        }
        decode_object(&payload, &self.adapters).map_err(|err| StoreError::Codec {
            id: *id,
            error: err.to_string(),
        })
    }

    fn encode_row(&self, obj: &StorableObject) -> Result<(Vec<u8>, String), StoreError> {
        let payload = encode_object(obj, &self.adapters).map_err(|err| StoreError::Codec {
            id: obj.id,
            error: err.to_string(),
        })?;
        let digest = hex::encode(Sha256::digest(&payload));
        Ok((payload, digest))
    }
}

fn upsert(
    conn: &Connection,
    id: ObjectId,
    payload: &[u8],
    digest: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO objects (id, payload, digest, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            payload = excluded.payload,
            digest = excluded.digest,
            updated_at = excluded.updated_at",
        params![id.to_string(), payload, digest, timestamp_secs()],
    )?;
    Ok(())
}

impl ObjectStore for SqliteStore {
    fn get(&self, id: &ObjectId) -> Result<StorableObject, StoreError> {
        let conn = self.connection()?;
        let object = self.read_row(&conn, id)?;
        debug!(%id, "sqlite store hit");
        Ok(object)
    }

    fn set(&self, id: ObjectId, obj: StorableObject) -> Result<(), StoreError> {
        let (payload, digest) = self.encode_row(&obj)?;
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        upsert(&tx, id, &payload, &digest)?;
        tx.commit()?;
        debug!(%id, bytes = payload.len(), "sqlite store set");
        Ok(())
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError> {
        let rows = batch
            .writes()
            .iter()
            .map(|obj| {
                let (payload, digest) = self.encode_row(obj)?;
                Ok((obj.id, payload, digest))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for expected in batch.guards() {
            let current = match self.read_row(&tx, &expected.id) {
                Ok(current) => Some(current),
                Err(StoreError::NotFound { .. }) => None,
                Err(err) => return Err(err),
            };
            if current.as_ref() != Some(expected) {
                return Err(StoreError::Conflict { id: expected.id });
            }
        }
        for (id, payload, digest) in &rows {
            upsert(&tx, *id, payload, digest)?;
        }
        tx.commit()?;
        debug!(writes = rows.len(), "sqlite store commit");
        Ok(())
    }

    fn contains(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let conn = self.connection()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM objects WHERE id = ?1",
                params![id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn timestamp_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::core::vendor::psi::PsiServerSetup;
    use ed25519_dalek::SigningKey;
    use remex_domain::{DynValue, VerifyKey};
    use tempfile::tempdir;

    fn adapters() -> Arc<AdapterTable> {
        Arc::clone(Registry::with_defaults().adapters())
    }

    fn reader(seed: u8) -> VerifyKey {
        SigningKey::from_bytes(&[seed; 32]).verifying_key().into()
    }

    #[test]
    fn creates_schema_and_meta() -> Result<()> {
        let temp = tempdir()?;
        let store = SqliteStore::open(temp.path().join("store"), adapters())?;
        assert!(store.db_path().is_file());
        let conn = store.connection_raw()?;
        let schema: String = conn.query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![META_KEY_SCHEMA_VERSION],
            |row| row.get(0),
        )?;
        assert_eq!(schema, SCHEMA_VERSION.to_string());
        Ok(())
    }

    #[test]
    fn objects_survive_reopen() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path().join("store");
        let id = ObjectId::new();
        let object = StorableObject::new(id, "hello")
            .readable_by(reader(1), id)
            .with_tags(vec!["greeting".to_string()])
            .with_description("demo");
        {
            let store = SqliteStore::open(&root, adapters())?;
            store.set(id, object.clone())?;
        }
        let reopened = SqliteStore::open(&root, adapters())?;
        assert_eq!(reopened.get(&id)?, object);
        assert_eq!(reopened.ids()?, vec![id]);
        Ok(())
    }

    #[test]
    fn foreign_payloads_round_trip_through_adapters() -> Result<()> {
        let temp = tempdir()?;
        let store = SqliteStore::open(temp.path(), adapters())?;
        let id = ObjectId::new();
        let mut setup = PsiServerSetup::new(vec![1, 2, 3]);
        setup.id = id;
        let object = StorableObject::new(id, DynValue::foreign(setup));
        store.set(id, object.clone())?;
        assert_eq!(store.get(&id)?, object);
        Ok(())
    }

    #[test]
    fn missing_rows_report_not_found() -> Result<()> {
        let temp = tempdir()?;
        let store = SqliteStore::open(temp.path(), adapters())?;
        let id = ObjectId::new();
        assert_eq!(store.get(&id), Err(StoreError::NotFound { id }));
        assert!(!store.contains(&id)?);
        Ok(())
    }

    #[test]
    fn tampered_payload_is_rejected() -> Result<()> {
        let temp = tempdir()?;
        let store = SqliteStore::open(temp.path(), adapters())?;
        let id = ObjectId::new();
        store.set(id, StorableObject::new(id, 7_i64))?;
        let conn = store.connection_raw()?;
        conn.execute(
            "UPDATE objects SET payload = ?1 WHERE id = ?2",
            params![vec![0_u8, 1, 2], id.to_string()],
        )?;
        let err = store.get(&id).expect_err("digest mismatch");
        assert!(matches!(err, StoreError::DigestMismatch { .. }), "{err}");
        assert_eq!(err.code(), "RX800");
        Ok(())
    }

    #[test]
    fn commit_is_all_or_nothing() -> Result<()> {
        let temp = tempdir()?;
        let store = SqliteStore::open(temp.path(), adapters())?;
        let id = ObjectId::new();
        let original = StorableObject::new(id, 1_i64).readable_by(reader(2), id);
        store.set(id, original.clone())?;
        let result = StorableObject::new(ObjectId::new(), "first");

        store.commit(
            CommitBatch::new()
                .guard(original.clone())
                .write(StorableObject::new(id, 2_i64))
                .write(result.clone()),
        )?;
        assert_eq!(store.get(&id)?.data.as_int(), Some(2));
        assert_eq!(store.get(&result.id)?, result);

        let late = StorableObject::new(ObjectId::new(), "second");
        let err = store
            .commit(
                CommitBatch::new()
                    .guard(original)
                    .write(StorableObject::new(id, 3_i64))
                    .write(late.clone()),
            )
            .expect_err("stale guard");
        assert_eq!(err, StoreError::Conflict { id });
        assert_eq!(store.get(&id)?.data.as_int(), Some(2));
        assert!(!store.contains(&late.id)?);
        Ok(())
    }

    #[test]
    fn rejects_foreign_schema_versions() -> Result<()> {
        let temp = tempdir()?;
        let store = SqliteStore::open(temp.path(), adapters())?;
        let conn = store.connection_raw()?;
        conn.execute(
            "UPDATE meta SET value = '99' WHERE key = ?1",
            params![META_KEY_SCHEMA_VERSION],
        )?;
        drop(conn);
        let err = SqliteStore::open(temp.path(), adapters()).expect_err("schema mismatch");
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::IncompatibleFormat { .. })
        ));
        Ok(())
    }
}
