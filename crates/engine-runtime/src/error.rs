use engine_core::transport::TransportError;
use engine_processing::error::{FlushError, ProducerError};
use thiserror::Error;

/// Fatal errors that end a batch run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The HTTP transport could not be built.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading or parsing the input failed.
    #[error("Producer error: {0}")]
    Producer(#[from] ProducerError),

    /// A partition could not be written.
    #[error("Flush error: {0}")]
    Flush(#[from] FlushError),

    /// An error occurred while joining a task.
    /// This usually indicates that the task was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
