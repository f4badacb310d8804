use crate::{
    error::{SourceError, StoreError},
    location::{Location, ObjectLocation},
    storage::Storage,
};
use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;

/// Buffered reader over one input file; lines are pulled lazily.
pub type LineReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// File extensions recognized as request files under an object-store prefix.
pub const REQUEST_EXTENSIONS: [&str; 2] = [".json", ".jsonl"];

/// Where requests come from.
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Expand a logical input path into the concrete locations to read, in order.
    async fn resolve(&self, path: &str) -> Result<Vec<String>, SourceError>;

    /// Open one resolved location for line-by-line reading.
    async fn open(&self, location: &str) -> Result<LineReader, SourceError>;
}

/// Keep only keys that look like request files, preserving listing order,
/// and rebuild each one as a fully qualified location.
pub fn request_objects(prefix: &ObjectLocation, keys: Vec<String>) -> Vec<String> {
    keys.into_iter()
        .filter(|key| REQUEST_EXTENSIONS.iter().any(|ext| key.ends_with(ext)))
        .map(|key| prefix.with_key(key).to_string())
        .collect()
}

#[async_trait]
impl RequestSource for Storage {
    async fn resolve(&self, path: &str) -> Result<Vec<String>, SourceError> {
        match path.parse::<Location>()? {
            Location::Local(_) => Ok(vec![path.to_string()]),
            Location::Object(prefix) => {
                let store = self
                    .object_store(&prefix)
                    .map_err(|source| SourceError::List {
                        prefix: path.to_string(),
                        source,
                    })?;
                let keys = store
                    .list(&prefix.bucket, &prefix.key)
                    .await
                    .map_err(|source| SourceError::List {
                        prefix: path.to_string(),
                        source,
                    })?;
                let listed = keys.len();
                let locations = request_objects(&prefix, keys);
                info!(
                    prefix = %path,
                    listed,
                    selected = locations.len(),
                    "Resolved object-store prefix"
                );
                Ok(locations)
            }
        }
    }

    async fn open(&self, location: &str) -> Result<LineReader, SourceError> {
        match location.parse::<Location>()? {
            Location::Local(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|source| SourceError::Open {
                        location: location.to_string(),
                        source,
                    })?;
                Ok(Box::pin(BufReader::new(file)))
            }
            Location::Object(obj) => {
                let fetch_err = |source: StoreError| SourceError::Fetch {
                    location: location.to_string(),
                    source,
                };
                let store = self.object_store(&obj).map_err(fetch_err)?;
                store.get(&obj.bucket, &obj.key).await.map_err(fetch_err)
            }
        }
    }
}
