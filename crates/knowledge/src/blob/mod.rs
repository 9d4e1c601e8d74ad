//! Named-blob storage capability used by the persistence adapter.
//!
//! Semantics follow a document store such as a cloud drive: `put` uploads a
//! new blob under a fresh id and discards earlier blobs with the same name,
//! `find` resolves a name to its current blob.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBlobStore;
pub use sqlite::SqliteBlobStore;

use recall_core::AppResult;

/// Trait for blob store backends.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Upload `bytes` under `name`, returning the new blob's id.
    ///
    /// Any earlier blob with the same name is removed.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> AppResult<String>;

    /// Id of the latest blob named `name`, if any.
    async fn find(&self, name: &str) -> AppResult<Option<String>>;

    /// Download a blob by id.
    async fn get(&self, id: &str) -> AppResult<Vec<u8>>;
}
