use connectors::error::{SourceError, StoreError};
use engine_core::settings::SettingsError;
use engine_runtime::error::RunError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to set up storage: {0}")]
    Storage(#[from] StoreError),

    #[error("Failed to resolve requests: {0}")]
    Resolve(#[from] SourceError),

    #[error("Batch run failed: {0}")]
    Runner(#[from] RunError),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
