use crate::{
    retry::{RetryDisposition, RetryError, RetryPolicy},
    settings::PipelineSettings,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Statuses treated as transient by default.
pub const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Response body is not valid JSON: {0}")]
    Decode(String),

    #[error("HTTP client has been closed")]
    Closed,

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// Retrying JSON-over-HTTP client shared by every worker.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    url: reqwest::Url,
    retry: RetryPolicy,
    retry_statuses: Vec<u16>,
    closed: CancellationToken,
}

impl InferenceClient {
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Self::new(http, &settings.url, settings.retry.clone())
    }

    pub fn new(
        http: reqwest::Client,
        url: &str,
        retry: RetryPolicy,
    ) -> Result<Self, TransportError> {
        let url = reqwest::Url::parse(url).map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self {
            http,
            url,
            retry,
            retry_statuses: RETRYABLE_STATUSES.to_vec(),
            closed: CancellationToken::new(),
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// POST `body` and return the decoded JSON response.
    ///
    /// Retryable statuses, connection failures and timeouts are retried
    /// under the configured policy; the last error is returned once the
    /// budget is spent.
    pub async fn post_json(&self, body: &Map<String, Value>) -> Result<Value, TransportError> {
        self.retry
            .run(|| self.attempt(body), |err| self.classify(err))
            .await
            .map_err(RetryError::into_inner)
    }

    /// Release the client. Calls made afterwards fail with
    /// [`TransportError::Closed`]. Clones share the closed state.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!(url = %self.url, "Closing HTTP client");
            self.closed.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    async fn attempt(&self, body: &Map<String, Value>) -> Result<Value, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let response = self.http.post(self.url.clone()).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn classify(&self, err: &TransportError) -> RetryDisposition {
        match err {
            TransportError::Status { status, .. } if self.retry_statuses.contains(status) => {
                RetryDisposition::Retry
            }
            TransportError::Request(e) if e.is_connect() || e.is_timeout() => {
                RetryDisposition::Retry
            }
            _ => RetryDisposition::Stop,
        }
    }
}
