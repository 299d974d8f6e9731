use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::checksum::Checksum;
use super::error::StorageError;
use super::key::StorageKey;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// What the store hands back after a successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub key: StorageKey,
    pub size: u64,
    pub checksum: Checksum,
}

/// Key-addressed media storage.
///
/// Callers decide the key (already sanitized); the store owns the bytes and
/// knows how to turn a key into a public URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous object.
    async fn put(&self, key: &StorageKey, data: &[u8]) -> Result<StoredObject, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(key, reader).await
    }

    /// Store data from an async reader under `key`.
    async fn put_stream(
        &self,
        key: &StorageKey,
        reader: BoxReader,
    ) -> Result<StoredObject, StorageError>;

    /// Retrieve all bytes for an object.
    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, key: &StorageKey) -> Result<BoxReader, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &StorageKey) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &StorageKey) -> Result<bool, StorageError>;

    /// Stable public URL for an object.
    fn url(&self, key: &StorageKey) -> String;
}
