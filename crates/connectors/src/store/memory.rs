use crate::{error::StoreError, source::LineReader, store::ObjectStore};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    io::Cursor,
    sync::{Arc, Mutex},
};

type Objects = BTreeMap<(String, String), Arc<[u8]>>;

/// In-process object store. Keys list in lexicographic order, like S3.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<Objects>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        bucket: &str,
        key: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<(), StoreError> {
        let bytes: Vec<u8> = bytes.into();
        self.lock()?
            .insert((bucket.to_string(), key.to_string()), Arc::from(bytes));
        Ok(())
    }

    pub fn read(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .lock()?
            .get(&(bucket.to_string(), key.to_string()))
            .map(|bytes| bytes.to_vec()))
    }

    pub fn keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()?
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Objects>, StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::Lock("memory store poisoned".into()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .keys(bucket)?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<LineReader, StoreError> {
        let bytes = self
            .read(bucket, key)?
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))?;
        Ok(Box::pin(Cursor::new(bytes)))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.insert(bucket, key, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_list_get() {
        let store = MemoryStore::new();
        store.put("b", "out/part-2.jsonl", b"two".to_vec()).await.unwrap();
        store.put("b", "out/part-1.jsonl", b"one".to_vec()).await.unwrap();
        store.put("other", "out/part-1.jsonl", b"x".to_vec()).await.unwrap();

        let keys = store.list("b", "out/").await.unwrap();
        assert_eq!(keys, vec!["out/part-1.jsonl", "out/part-2.jsonl"]);

        let mut reader = store.get("b", "out/part-1.jsonl").await.unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "one");
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let store = MemoryStore::new();
        let err = store.get("b", "nope").await.err().unwrap();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
