use thiserror::Error;

/// Errors returned by an object-store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store request failed: {0}")]
    Request(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("No object store configured for '{0}'")]
    Unavailable(String),
}

/// Errors raised while resolving or reading request input.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid location '{0}'")]
    InvalidLocation(String),

    #[error("Failed to open '{location}': {source}")]
    Open {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list objects under '{prefix}': {source}")]
    List {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to fetch '{location}': {source}")]
    Fetch {
        location: String,
        #[source]
        source: StoreError,
    },
}

/// Errors raised while writing output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Invalid location '{0}'")]
    InvalidLocation(String),

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload '{path}': {source}")]
    Put {
        path: String,
        #[source]
        source: StoreError,
    },
}
