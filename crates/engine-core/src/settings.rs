use crate::retry::RetryPolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_URL: &str = "http://localhost:8080/v1/completions";
pub const DEFAULT_OUTPUT_PATH: &str = "/tmp/lingo-batch-inference";
pub const DEFAULT_FLUSH_EVERY: usize = 1000;
pub const DEFAULT_CONCURRENCY: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1200);
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Errors raised while validating pipeline settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("A requests path is required")]
    MissingRequestsPath,

    #[error("An output path is required")]
    MissingOutputPath,

    #[error("'{0}' must be at least 1")]
    ZeroValue(&'static str),
}

/// Immutable, validated configuration for one batch run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Inference endpoint requests are POSTed to
    pub url: String,
    /// Input file or object-store prefix
    pub requests_path: String,
    /// Directory or prefix partitions are written under
    pub output_path: String,
    /// Results per partition file
    pub flush_every: usize,
    /// Number of workers
    pub concurrency: usize,
    /// Capacity of the bounded request queue
    pub queue_capacity: usize,
    /// Fields stripped from a request before it is sent
    pub ignore_fields: Vec<String>,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn builder(requests_path: impl Into<String>) -> PipelineSettingsBuilder {
        PipelineSettingsBuilder {
            requests_path: requests_path.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSettingsBuilder {
    requests_path: String,
    url: Option<String>,
    output_path: Option<String>,
    flush_every: Option<usize>,
    concurrency: Option<usize>,
    queue_capacity: Option<usize>,
    ignore_fields: Vec<String>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
}

impl PipelineSettingsBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn flush_every(mut self, n: usize) -> Self {
        self.flush_every = Some(n);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n);
        self
    }

    /// Defaults to the worker count when unset.
    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = Some(n);
        self
    }

    pub fn ignore_fields(mut self, fields: Vec<String>) -> Self {
        self.ignore_fields = fields;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<PipelineSettings, SettingsError> {
        let url = self.url.unwrap_or_else(|| DEFAULT_URL.to_string());
        validate_url(&url)?;

        if self.requests_path.trim().is_empty() {
            return Err(SettingsError::MissingRequestsPath);
        }

        let output_path = self
            .output_path
            .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string());
        if output_path.trim().is_empty() {
            return Err(SettingsError::MissingOutputPath);
        }

        let flush_every = non_zero(
            "flush_every",
            self.flush_every.unwrap_or(DEFAULT_FLUSH_EVERY),
        )?;
        let concurrency = non_zero(
            "concurrency",
            self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        )?;
        let queue_capacity =
            non_zero("queue_capacity", self.queue_capacity.unwrap_or(concurrency))?;

        Ok(PipelineSettings {
            url,
            requests_path: self.requests_path,
            output_path,
            flush_every,
            concurrency,
            queue_capacity,
            ignore_fields: self.ignore_fields,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry: self
                .retry
                .unwrap_or_else(|| RetryPolicy::with_attempts(DEFAULT_RETRY_ATTEMPTS)),
        })
    }
}

fn non_zero(name: &'static str, value: usize) -> Result<usize, SettingsError> {
    if value == 0 {
        return Err(SettingsError::ZeroValue(name));
    }
    Ok(value)
}

fn validate_url(url: &str) -> Result<(), SettingsError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| SettingsError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SettingsError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Parse a comma-separated field list such as `"id, bar"`.
/// Entries are trimmed and empty entries are dropped.
pub fn parse_ignore_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignore_fields() {
        assert_eq!(parse_ignore_fields("id,title"), vec!["id", "title"]);
    }

    #[test]
    fn test_parse_ignore_fields_empty() {
        assert!(parse_ignore_fields("").is_empty());
        assert!(parse_ignore_fields(" , ,").is_empty());
    }

    #[test]
    fn test_parse_ignore_fields_single() {
        assert_eq!(parse_ignore_fields("id"), vec!["id"]);
        assert_eq!(parse_ignore_fields("id,  "), vec!["id"]);
        assert_eq!(parse_ignore_fields(" id,  "), vec!["id"]);
    }

    #[test]
    fn test_parse_ignore_fields_spaces() {
        assert_eq!(parse_ignore_fields(" id , title  ,  "), vec!["id", "title"]);
    }

    #[test]
    fn test_defaults() {
        let settings = PipelineSettings::builder("requests.jsonl").build().unwrap();
        assert_eq!(settings.url, DEFAULT_URL);
        assert_eq!(settings.output_path, DEFAULT_OUTPUT_PATH);
        assert_eq!(settings.flush_every, 1000);
        assert_eq!(settings.concurrency, 100);
        assert_eq!(settings.queue_capacity, 100);
        assert_eq!(settings.timeout, Duration::from_secs(1200));
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(settings.ignore_fields.is_empty());
    }

    #[test]
    fn test_queue_capacity_follows_concurrency() {
        let settings = PipelineSettings::builder("r.jsonl")
            .concurrency(7)
            .build()
            .unwrap();
        assert_eq!(settings.queue_capacity, 7);

        let settings = PipelineSettings::builder("r.jsonl")
            .concurrency(7)
            .queue_capacity(2)
            .build()
            .unwrap();
        assert_eq!(settings.queue_capacity, 2);
    }

    #[test]
    fn test_rejects_zero_values() {
        let err = PipelineSettings::builder("r.jsonl")
            .flush_every(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SettingsError::ZeroValue("flush_every")));

        let err = PipelineSettings::builder("r.jsonl")
            .concurrency(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SettingsError::ZeroValue("concurrency")));
    }

    #[test]
    fn test_rejects_bad_url() {
        let err = PipelineSettings::builder("r.jsonl")
            .url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidUrl { .. }));

        let err = PipelineSettings::builder("r.jsonl")
            .url("ftp://host/v1")
            .build()
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidUrl { .. }));
    }

    #[test]
    fn test_requires_requests_path() {
        let err = PipelineSettings::builder("  ").build().unwrap_err();
        assert!(matches!(err, SettingsError::MissingRequestsPath));
    }
}
