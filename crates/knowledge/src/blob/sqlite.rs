//! SQLite-backed durable blob store.

use super::BlobStore;
use chrono::Utc;
use recall_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Blob store in a single SQLite file.
///
/// Queries run on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteBlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBlobStore {
    /// Open (or create) the blob database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Persistence(format!("Failed to create blob store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Persistence(format!("Failed to open blob store: {}", e)))?;

        let store = Self::with_connection(conn)?;
        tracing::debug!("Opened SQLite blob store at {:?}", db_path);
        Ok(store)
    }

    /// Blob store in a private in-memory database.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Persistence(format!("Failed to open blob store: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                bytes BLOB NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_blobs_name ON blobs(name);
            "#,
        )
        .map_err(|e| AppError::Persistence(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn);
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::Persistence(format!("Blob store task failed: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait::async_trait]
impl BlobStore for SqliteBlobStore {
    /// Store `bytes` as the only blob named `name`.
    ///
    /// Earlier blobs with the same name are deleted in the same transaction,
    /// so a name always maps to one stored record.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let name = name.to_string();
        let size = bytes.len();

        let (id, name, replaced) = self
            .with_conn(move |conn| {
                let tx = conn.transaction().map_err(|e| {
                    AppError::Persistence(format!("Failed to begin upload of '{}': {}", name, e))
                })?;

                let replaced = tx
                    .execute("DELETE FROM blobs WHERE name = ?1", params![name])
                    .map_err(|e| {
                        AppError::Persistence(format!("Failed to replace '{}': {}", name, e))
                    })?;

                tx.execute(
                    "INSERT INTO blobs (id, name, bytes, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![id, name, bytes, Utc::now().to_rfc3339()],
                )
                .map_err(|e| AppError::Persistence(format!("Failed to upload '{}': {}", name, e)))?;

                tx.commit().map_err(|e| {
                    AppError::Persistence(format!("Failed to commit upload of '{}': {}", name, e))
                })?;

                Ok((id, name, replaced))
            })
            .await?;

        tracing::debug!(
            "Stored blob '{}' ({} bytes) as {}, replacing {} older",
            name,
            size,
            id,
            replaced
        );
        Ok(id)
    }

    async fn find(&self, name: &str) -> AppResult<Option<String>> {
        let name = name.to_string();

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id FROM blobs WHERE name = ?1 ORDER BY seq DESC LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Persistence(format!("Failed to look up '{}': {}", name, e)))
        })
        .await
    }

    async fn get(&self, id: &str) -> AppResult<Vec<u8>> {
        let id = id.to_string();

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT bytes FROM blobs WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Persistence(format!("Failed to download '{}': {}", id, e)))?
            .ok_or_else(|| AppError::Persistence(format!("Blob '{}' not found", id)))
        })
        .await
    }
}

impl SqliteBlobStore {
    /// Number of stored blobs, across all names.
    pub async fn blob_count(&self) -> AppResult<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get::<_, i64>(0))
                .map(|count| count as usize)
                .map_err(|e| AppError::Persistence(format!("Failed to count blobs: {}", e)))
        })
        .await
    }
}
