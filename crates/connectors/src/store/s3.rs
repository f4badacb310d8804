use crate::{
    error::StoreError,
    location::Scheme,
    source::LineReader,
    store::{ObjectStore, endpoint::EndpointConfig},
};
use async_trait::async_trait;
use aws_sdk_s3::{config::Builder as S3ConfigBuilder, primitives::ByteStream};
use tracing::debug;

/// S3 (or S3-compatible) object store.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client for `scheme` from the ambient AWS environment, pointed
    /// at the endpoint [`EndpointConfig`] resolves for that scheme.
    pub async fn from_env(scheme: Scheme) -> Result<Self, StoreError> {
        let endpoint = EndpointConfig::from_env(scheme)?;
        let cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let mut builder = S3ConfigBuilder::from(&cfg);
        if let Some(url) = &endpoint.endpoint_url {
            builder = builder.endpoint_url(url);
        }
        if endpoint.force_path_style {
            builder = builder.force_path_style(true);
        }

        debug!(
            scheme = scheme.prefix(),
            endpoint = endpoint.endpoint_url.as_deref().unwrap_or("aws"),
            "Connecting object store"
        );
        Ok(Self::new(aws_sdk_s3::Client::from_conf(builder.build())))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket);
            if !prefix.is_empty() {
                req = req.prefix(prefix);
            }
            if let Some(t) = token.as_deref() {
                req = req.continuation_token(t);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| StoreError::Request(e.to_string()))?;

            for obj in resp.contents.unwrap_or_default() {
                if let Some(key) = obj.key {
                    keys.push(key);
                }
            }

            token = resp.next_continuation_token;
            if token.is_none() {
                break;
            }
        }

        debug!(bucket, prefix, objects = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<LineReader, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(Box::pin(resp.body.into_async_read()))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(())
    }
}
