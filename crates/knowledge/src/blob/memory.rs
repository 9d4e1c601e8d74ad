//! Process-local blob store.

use super::BlobStore;
use recall_core::{AppError, AppResult};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
struct StoredBlob {
    id: String,
    name: String,
    bytes: Vec<u8>,
}

/// In-memory blob store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<Vec<StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs, across all names.
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        // One blob per name, as in the SQLite store
        blobs.retain(|b| b.name != name);
        blobs.push(StoredBlob {
            id: id.clone(),
            name: name.to_string(),
            bytes,
        });
        Ok(id)
    }

    async fn find(&self, name: &str) -> AppResult<Option<String>> {
        let blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs
            .iter()
            .rev()
            .find(|b| b.name == name)
            .map(|b| b.id.clone()))
    }

    async fn get(&self, id: &str) -> AppResult<Vec<u8>> {
        let blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        blobs
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| AppError::Persistence(format!("Blob '{}' not found", id)))
    }
}
