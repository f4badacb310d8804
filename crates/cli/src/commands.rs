use clap::{Args, Subcommand};
use engine_core::{
    retry::RetryPolicy,
    settings::{
        DEFAULT_CONCURRENCY, DEFAULT_FLUSH_EVERY, DEFAULT_OUTPUT_PATH, DEFAULT_RETRY_ATTEMPTS,
        DEFAULT_URL, PipelineSettings, SettingsError, parse_ignore_fields,
    },
};
use std::time::Duration;

#[derive(Subcommand)]
pub enum Commands {
    /// Send every request under a path to the inference endpoint and write
    /// the results as partition files
    Run(RunArgs),

    /// Print the input files a requests path expands to
    Resolve {
        #[arg(long, help = "Local file or s3:// / gs:// prefix")]
        path: String,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(long, env = "URL", default_value = DEFAULT_URL, help = "Inference endpoint")]
    pub url: String,

    #[arg(
        long,
        env = "REQUESTS_PATH",
        help = "Local JSONL file or object-store prefix to read requests from"
    )]
    pub requests_path: String,

    #[arg(
        long,
        env = "OUTPUT_PATH",
        default_value = DEFAULT_OUTPUT_PATH,
        help = "Directory or prefix partition files are written under"
    )]
    pub output_path: String,

    #[arg(long, env = "FLUSH_EVERY", default_value_t = DEFAULT_FLUSH_EVERY)]
    pub flush_every: usize,

    #[arg(
        long,
        env = "CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        help = "Number of concurrent workers"
    )]
    pub concurrency: usize,

    #[arg(
        long,
        env = "IGNORE_FIELDS",
        default_value = "",
        help = "Comma-separated fields stripped before sending, e.g. \"id,bar\""
    )]
    pub ignore_fields: String,

    #[arg(long, env = "TIMEOUT", default_value_t = 1200, help = "Per-request timeout in seconds")]
    pub timeout: u64,

    #[arg(long, env = "RETRY_ATTEMPTS", default_value_t = DEFAULT_RETRY_ATTEMPTS)]
    pub retry_attempts: usize,

    #[arg(
        long,
        env = "QUEUE_CAPACITY",
        help = "Request queue bound; defaults to the worker count"
    )]
    pub queue_capacity: Option<usize>,
}

impl RunArgs {
    pub fn into_settings(self) -> Result<PipelineSettings, SettingsError> {
        let mut builder = PipelineSettings::builder(self.requests_path)
            .url(self.url)
            .output_path(self.output_path)
            .flush_every(self.flush_every)
            .concurrency(self.concurrency)
            .ignore_fields(parse_ignore_fields(&self.ignore_fields))
            .timeout(Duration::from_secs(self.timeout))
            .retry(RetryPolicy::with_attempts(self.retry_attempts));

        if let Some(capacity) = self.queue_capacity {
            builder = builder.queue_capacity(capacity);
        }
        builder.build()
    }
}
