use connectors::error::{SinkError, SourceError};
use model::records::{partition::PartitionId, request::RequestParseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Failed to read requests: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to read line {line} of '{location}': {source}")]
    Read {
        location: String,
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed request on line {line} of '{location}': {source}")]
    Parse {
        location: String,
        line: u64,
        #[source]
        source: RequestParseError,
    },

    #[error("The request queue was closed unexpectedly.")]
    QueueClosed,
}

#[derive(Error, Debug)]
pub enum FlushError {
    #[error("Failed to serialize partition {partition}: {source}")]
    Encode {
        partition: PartitionId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write partition {partition}: {source}")]
    Write {
        partition: PartitionId,
        #[source]
        source: SinkError,
    },
}
