use crate::{
    commands::{Commands, RunArgs},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::{RequestSource, Storage};
use engine_runtime::execution::{RunSummary, executor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "batchelor",
    version,
    about = "Bounded-concurrency batch inference runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Initialize logger
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    let shutdown = ShutdownCoordinator::new(cancel.clone());

    let code = match dispatch(cli.command, &shutdown, cancel).await {
        Ok(()) => ExitCode::Success,
        Err(CliError::ShutdownRequested) => {
            info!("Run cancelled; queued requests were flushed");
            ExitCode::ShutdownRequested
        }
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn dispatch(
    command: Commands,
    shutdown: &ShutdownCoordinator,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => run(args, shutdown, cancel).await,
        Commands::Resolve { path } => {
            let storage = Storage::for_paths(&[path.as_str()]).await?;
            for location in storage.resolve(&path).await? {
                println!("{location}");
            }
            Ok(())
        }
    }
}

async fn run(
    args: RunArgs,
    shutdown: &ShutdownCoordinator,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let settings = args.into_settings()?;
    let paths = [settings.requests_path.as_str(), settings.output_path.as_str()];
    let storage = Arc::new(Storage::for_paths(&paths).await?);

    shutdown.register_handlers();
    let summary = executor::run(settings, storage.clone(), storage, cancel).await?;
    report(&summary, shutdown.is_shutdown_requested())
}

/// Logs the run totals and turns a cancelled run into `ShutdownRequested`.
fn report(summary: &RunSummary, shutdown_requested: bool) -> Result<(), CliError> {
    info!(
        run_id = %summary.run_id,
        requests = summary.requests,
        partitions = summary.partitions,
        failed = summary.metrics.requests_failed,
        cancelled = summary.cancelled,
        "Run complete"
    );

    if shutdown_requested || summary.cancelled {
        return Err(CliError::ShutdownRequested);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{retry::RetryPolicy, settings::PipelineSettings};
    use std::path::Path;

    fn settings(input: &Path, output: &Path) -> PipelineSettings {
        // Nothing listens on the discard port.
        PipelineSettings::builder(input.to_string_lossy())
            .url("http://127.0.0.1:9/v1/completions")
            .output_path(output.to_string_lossy())
            .retry(RetryPolicy::immediate(1))
            .build()
            .unwrap()
    }

    async fn run_once(lines: &str, cancel: CancellationToken) -> RunSummary {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("requests.jsonl");
        std::fs::write(&input, lines).unwrap();
        let storage = Arc::new(Storage::local());
        executor::run(
            settings(&input, &dir.path().join("out")),
            storage.clone(),
            storage,
            cancel,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_shutdown() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = run_once("{\"n\": 1}\n{\"n\": 2}\n", cancel).await;

        assert!(summary.cancelled);
        let err = report(&summary, false).unwrap_err();
        assert!(matches!(err, CliError::ShutdownRequested));
    }

    #[tokio::test]
    async fn test_finished_run_reports_success() {
        let summary = run_once("{\"n\": 1}\n", CancellationToken::new()).await;

        assert!(!summary.cancelled);
        assert_eq!(summary.requests, 1);
        assert!(report(&summary, false).is_ok());
        assert!(matches!(
            report(&summary, true),
            Err(CliError::ShutdownRequested)
        ));
    }
}
