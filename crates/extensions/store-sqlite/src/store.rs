//! SQLite entry store implementation.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tracing::debug;

use termsnap_protocols::{
    CacheError, Embedding, Entry, EntryId, EntryMetadata, EntryStore, NewEntry, StoreStats,
};

use crate::codec::{decode_embedding, encode_embedding};
use crate::schema::{init_schema, FILE_PRAGMAS};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Column list shared by every query that materializes an [`Entry`].
pub(crate) const ENTRY_COLUMNS: &str = "e.id, e.input_text, e.output_text, e.explanation, \
     e.metadata, e.embedding, e.use_count, e.scope_key, e.succeeded, e.is_active, \
     e.created_at, e.modified_at";

/// SQLite-backed store for one cache instantiation.
///
/// Tables are namespaced by `M::NAMESPACE`, so several stores can share a
/// connection (see [`SqliteStore::with_connection`]).
pub struct SqliteStore<M> {
    conn: Arc<Connection>,
    _metadata: PhantomData<fn() -> M>,
}

impl<M: EntryMetadata> SqliteStore<M> {
    /// Create a store on a fresh in-memory database.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        Self::with_connection(Arc::new(conn)).await
    }

    /// Create a store on a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = open_file(path).await?;
        Self::with_connection(Arc::new(conn)).await
    }

    /// Create a store on an existing connection, initializing its tables.
    pub async fn with_connection(conn: Arc<Connection>) -> Result<Self, CacheError> {
        conn.call(|conn| Ok(init_schema(conn, M::NAMESPACE)?))
            .await
            .map_err(|e| CacheError::StorageError(e.to_string()))?;

        Ok(Self {
            conn,
            _metadata: PhantomData,
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Open a file database with the pragmas every store expects.
pub async fn open_file(path: impl AsRef<Path>) -> Result<Connection, CacheError> {
    let path = path.as_ref().to_path_buf();
    let conn = Connection::open(path)
        .await
        .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

    conn.call(|conn| {
        conn.execute_batch(FILE_PRAGMAS)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await
    .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

    Ok(conn)
}

pub(crate) fn row_to_entry<M: EntryMetadata>(row: &Row<'_>) -> rusqlite::Result<Entry<M>> {
    let metadata_str: String = row.get(4)?;
    let embedding_blob: Option<Vec<u8>> = row.get(5)?;
    let use_count: i64 = row.get(6)?;
    let created_str: String = row.get(10)?;
    let modified_str: String = row.get(11)?;

    Ok(Entry {
        id: row.get(0)?,
        input_text: row.get(1)?,
        output_text: row.get(2)?,
        explanation: row.get(3)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
        embedding: embedding_blob.as_deref().and_then(decode_embedding),
        use_count: use_count.max(0) as u64,
        scope_key: row.get(7)?,
        succeeded: row.get(8)?,
        is_active: row.get(9)?,
        created_at: parse_timestamp(&created_str),
        modified_at: parse_timestamp(&modified_str),
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn storage_err(e: tokio_rusqlite::Error) -> CacheError {
    CacheError::StorageError(e.to_string())
}

fn query_err(e: tokio_rusqlite::Error) -> CacheError {
    CacheError::QueryError(e.to_string())
}

#[async_trait]
impl<M: EntryMetadata> EntryStore<M> for SqliteStore<M> {
    async fn insert(&self, entry: NewEntry<M>) -> Result<EntryId, CacheError> {
        let now = Utc::now().to_rfc3339();
        let metadata = serde_json::to_string(&entry.metadata)?;
        let (blob, dimension) = entry
            .embedding
            .as_ref()
            .map(|e| (encode_embedding(e), e.dimension as i64))
            .unzip();

        let sql = format!(
            "INSERT INTO {ns}_entries (input_text, output_text, explanation, metadata,
                 embedding, embedding_dim, scope_key, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            ns = M::NAMESPACE
        );

        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    &sql,
                    params![
                        entry.input_text,
                        entry.output_text,
                        entry.explanation,
                        metadata,
                        blob,
                        dimension,
                        entry.scope_key,
                        now
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(storage_err)?;

        debug!(namespace = M::NAMESPACE, id, "Inserted cache entry");
        Ok(id)
    }

    async fn get(&self, id: EntryId) -> Result<Option<Entry<M>>, CacheError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {ns}_entries e WHERE e.id = ?1",
            ns = M::NAMESPACE
        );

        self.conn
            .call(move |conn| {
                let entry = conn
                    .query_row(&sql, [id], row_to_entry::<M>)
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(query_err)
    }

    async fn increment_use_count(&self, id: EntryId) -> Result<(), CacheError> {
        let sql = format!(
            "UPDATE {ns}_entries SET use_count = use_count + 1 WHERE id = ?1",
            ns = M::NAMESPACE
        );

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, [id])?))
            .await
            .map_err(storage_err)?;

        if changed == 0 {
            return Err(CacheError::NotFound(id));
        }
        Ok(())
    }

    async fn update_embedding(&self, id: EntryId, embedding: &Embedding) -> Result<(), CacheError> {
        let blob = encode_embedding(embedding);
        let dimension = embedding.dimension as i64;
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {ns}_entries SET embedding = ?1, embedding_dim = ?2, modified_at = ?3
             WHERE id = ?4",
            ns = M::NAMESPACE
        );

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, params![blob, dimension, now, id])?))
            .await
            .map_err(storage_err)?;

        if changed == 0 {
            return Err(CacheError::NotFound(id));
        }
        Ok(())
    }

    async fn record_outcome(&self, id: EntryId, succeeded: bool) -> Result<(), CacheError> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {ns}_entries SET succeeded = ?1, modified_at = ?2 WHERE id = ?3",
            ns = M::NAMESPACE
        );

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, params![succeeded, now, id])?))
            .await
            .map_err(storage_err)?;

        if changed == 0 {
            return Err(CacheError::NotFound(id));
        }
        Ok(())
    }

    async fn entries_without_embedding(&self, batch_size: usize) -> Result<Vec<Entry<M>>, CacheError> {
        // Truncated blobs count as missing so backfill repairs them.
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {ns}_entries e
             WHERE e.is_active = 1
               AND (e.embedding IS NULL OR length(e.embedding) = 0 OR length(e.embedding) % 4 != 0)
             ORDER BY e.modified_at, e.id
             LIMIT ?1",
            ns = M::NAMESPACE
        );

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map([batch_size as i64], row_to_entry::<M>)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(query_err)
    }

    async fn defer_backfill(&self, id: EntryId) -> Result<(), CacheError> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {ns}_entries SET modified_at = ?1 WHERE id = ?2",
            ns = M::NAMESPACE
        );

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, params![now, id])?))
            .await
            .map_err(storage_err)?;

        if changed == 0 {
            return Err(CacheError::NotFound(id));
        }
        Ok(())
    }

    async fn frequent(&self, limit: usize, scope_key: Option<&str>) -> Result<Vec<Entry<M>>, CacheError> {
        let scope_key = scope_key.map(str::to_string);
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {ns}_entries e
             WHERE e.is_active = 1 AND (?1 IS NULL OR e.scope_key = ?1)
             ORDER BY e.use_count DESC, e.id DESC
             LIMIT ?2",
            ns = M::NAMESPACE
        );

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(params![scope_key, limit as i64], row_to_entry::<M>)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(query_err)
    }

    async fn deactivate(&self, id: EntryId) -> Result<bool, CacheError> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {ns}_entries SET is_active = 0, modified_at = ?1
             WHERE id = ?2 AND is_active = 1",
            ns = M::NAMESPACE
        );

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, params![now, id])?))
            .await
            .map_err(storage_err)?;

        debug!(namespace = M::NAMESPACE, id, changed, "Deactivated cache entry");
        Ok(changed > 0)
    }

    async fn hard_delete(&self, id: EntryId) -> Result<bool, CacheError> {
        let sql = format!("DELETE FROM {ns}_entries WHERE id = ?1", ns = M::NAMESPACE);

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, [id])?))
            .await
            .map_err(storage_err)?;

        debug!(namespace = M::NAMESPACE, id, changed, "Deleted cache entry");
        Ok(changed > 0)
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        let sql = format!(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_active), 0),
                    COALESCE(SUM(CASE WHEN is_active = 1 AND embedding IS NOT NULL THEN 1 ELSE 0 END), 0)
             FROM {ns}_entries",
            ns = M::NAMESPACE
        );

        self.conn
            .call(move |conn| {
                let stats = conn.query_row(&sql, [], |row| {
                    Ok(StoreStats {
                        total: row.get::<_, i64>(0)?.max(0) as u64,
                        active: row.get::<_, i64>(1)?.max(0) as u64,
                        embedded: row.get::<_, i64>(2)?.max(0) as u64,
                    })
                })?;
                Ok(stats)
            })
            .await
            .map_err(query_err)
    }
}
