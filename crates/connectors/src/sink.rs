use crate::{
    error::{SinkError, StoreError},
    location::Location,
    storage::Storage,
};
use async_trait::async_trait;
use tracing::debug;

/// Durable writer for output partitions.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Write `bytes` to `path`, replacing anything already there. Either the
    /// whole payload is written or an error is returned.
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), SinkError>;
}

#[async_trait]
impl OutputSink for Storage {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), SinkError> {
        let len = bytes.len();
        let location = path
            .parse::<Location>()
            .map_err(|_| SinkError::InvalidLocation(path.to_string()))?;

        match location {
            Location::Local(file) => {
                let io_err = |source: std::io::Error| SinkError::Io {
                    path: path.to_string(),
                    source,
                };
                if let Some(parent) = file.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
                }
                tokio::fs::write(&file, bytes).await.map_err(io_err)?;
            }
            Location::Object(obj) => {
                let put_err = |source: StoreError| SinkError::Put {
                    path: path.to_string(),
                    source,
                };
                let store = self.object_store(&obj).map_err(put_err)?;
                store
                    .put(&obj.bucket, &obj.key, bytes)
                    .await
                    .map_err(put_err)?;
            }
        }

        debug!(path, bytes = len, "Wrote output file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{location::Scheme, store::memory::MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_local_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("part-1.jsonl");

        Storage::local()
            .write(path.to_str().unwrap(), b"{\"a\":1}".to_vec())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_local_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part-1.jsonl");
        let path = path.to_str().unwrap();
        let storage = Storage::local();

        storage.write(path, b"first version".to_vec()).await.unwrap();
        storage.write(path, b"second".to_vec()).await.unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_object_write() {
        let store = MemoryStore::new();
        let storage = Storage::local().with_object_store(Scheme::S3, Arc::new(store.clone()));

        storage
            .write("s3://bucket/out/part-1.jsonl", b"line".to_vec())
            .await
            .unwrap();

        let stored = store.read("bucket", "out/part-1.jsonl").unwrap();
        assert_eq!(stored.as_deref(), Some(&b"line"[..]));
    }

    #[tokio::test]
    async fn test_object_write_uses_store_for_its_scheme_only() {
        let store = MemoryStore::new();
        let storage = Storage::local().with_object_store(Scheme::Gcs, Arc::new(store.clone()));

        let err = storage
            .write("s3://bucket/out/part-1.jsonl", b"line".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Put { .. }));
        assert!(store.keys("bucket").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_object_write_without_store_fails() {
        let err = Storage::local()
            .write("s3://bucket/out/part-1.jsonl", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Put { .. }));
    }
}
