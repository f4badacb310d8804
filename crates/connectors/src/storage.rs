use crate::{
    error::StoreError,
    location::{Location, ObjectLocation, Scheme},
    store::ObjectStore,
};
use std::{collections::HashMap, sync::Arc};

/// Filesystem plus one object store per scheme, dispatched by location.
///
/// Implements both [`RequestSource`](crate::RequestSource) and
/// [`OutputSink`](crate::OutputSink).
#[derive(Clone, Default)]
pub struct Storage {
    objects: HashMap<Scheme, Arc<dyn ObjectStore>>,
}

impl Storage {
    /// Local filesystem only; object-store locations are rejected.
    pub fn local() -> Self {
        Self::default()
    }

    /// Serve `scheme` locations from `store`. Other schemes are unaffected.
    pub fn with_object_store(mut self, scheme: Scheme, store: Arc<dyn ObjectStore>) -> Self {
        self.objects.insert(scheme, store);
        self
    }

    /// Build storage able to serve every given path, connecting one object
    /// store for each scheme that appears.
    pub async fn for_paths(paths: &[&str]) -> Result<Self, StoreError> {
        let mut storage = Self::local();
        for path in paths {
            let Ok(Location::Object(obj)) = path.parse::<Location>() else {
                continue;
            };
            if storage.objects.contains_key(&obj.scheme) {
                continue;
            }
            let store = default_object_store(obj.scheme).await?;
            storage = storage.with_object_store(obj.scheme, store);
        }
        Ok(storage)
    }

    pub(crate) fn object_store(
        &self,
        location: &ObjectLocation,
    ) -> Result<&Arc<dyn ObjectStore>, StoreError> {
        self.objects
            .get(&location.scheme)
            .ok_or_else(|| StoreError::Unavailable(location.to_string()))
    }
}

#[cfg(feature = "s3")]
async fn default_object_store(scheme: Scheme) -> Result<Arc<dyn ObjectStore>, StoreError> {
    let store = crate::store::s3::S3Store::from_env(scheme).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
async fn default_object_store(scheme: Scheme) -> Result<Arc<dyn ObjectStore>, StoreError> {
    Err(StoreError::Unavailable(format!(
        "{} locations (built without feature 's3')",
        scheme.prefix()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_local_paths_need_no_object_store() {
        let storage = Storage::for_paths(&["requests.jsonl", "/tmp/out"]).await.unwrap();
        assert!(storage.objects.is_empty());
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn test_object_paths_require_s3_feature() {
        let err = Storage::for_paths(&["s3://bucket/requests/", "/tmp/out"])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn test_gcs_paths_are_not_served_by_s3_default() {
        let err = Storage::for_paths(&["gs://bucket/requests/"])
            .await
            .err()
            .unwrap();
        let StoreError::Unavailable(what) = err else {
            panic!("expected an unavailable store");
        };
        assert!(what.starts_with("gs://"), "unexpected message: {what}");
    }

    #[test]
    fn test_stores_are_keyed_by_scheme() {
        let gcs = Arc::new(MemoryStore::new());
        let storage = Storage::local().with_object_store(Scheme::Gcs, gcs);

        let gs: Location = "gs://bucket/in/".parse().unwrap();
        let s3: Location = "s3://bucket/in/".parse().unwrap();
        let (Location::Object(gs), Location::Object(s3)) = (gs, s3) else {
            panic!("expected object locations");
        };

        assert!(storage.object_store(&gs).is_ok());
        assert!(matches!(
            storage.object_store(&s3),
            Err(StoreError::Unavailable(_))
        ));
    }
}
