use crate::{error::StoreError, source::LineReader};
use async_trait::async_trait;

pub mod endpoint;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

/// Minimal object-store surface used for request input and partition output.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Keys under `prefix`, in the order the backend lists them.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<LineReader, StoreError>;

    /// Create or fully replace the object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}
