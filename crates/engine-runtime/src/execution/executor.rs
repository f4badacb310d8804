use crate::{
    error::RunError,
    execution::workers::{self, PoolHandles},
};
use connectors::{OutputSink, RequestSource};
use engine_core::{
    metrics::{Metrics, MetricsSnapshot},
    settings::PipelineSettings,
    transport::InferenceClient,
};
use engine_processing::{
    error::FlushError,
    flusher::{FlushSummary, Flusher},
    producer::Producer,
    queue::{RequestQueue, result_channel},
};
use model::records::queue::QueueItem;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Requests the producer placed on the request queue
    pub requests: u64,
    pub partitions: u64,
    pub results: u64,
    pub metrics: MetricsSnapshot,
    /// Whether input reading stopped early on cancellation
    pub cancelled: bool,
    pub elapsed: Duration,
}

pub async fn run(
    settings: PipelineSettings,
    source: Arc<dyn RequestSource>,
    sink: Arc<dyn OutputSink>,
    cancel: CancellationToken,
) -> Result<RunSummary, RunError> {
    let client = InferenceClient::from_settings(&settings)?;
    BatchExecutor::new(settings, source, sink, client, cancel)
        .execute()
        .await
}

/// Runs one batch: producer, worker pool and flusher wired through the
/// request queue and the result channel.
pub struct BatchExecutor {
    run_id: Uuid,
    settings: PipelineSettings,
    source: Arc<dyn RequestSource>,
    sink: Arc<dyn OutputSink>,
    client: InferenceClient,
    cancel: CancellationToken,
    metrics: Metrics,
}

impl BatchExecutor {
    pub fn new(
        settings: PipelineSettings,
        source: Arc<dyn RequestSource>,
        sink: Arc<dyn OutputSink>,
        client: InferenceClient,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            settings,
            source,
            sink,
            client,
            cancel,
            metrics: Metrics::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Shutdown order:
    /// 1. start producer, flusher and workers together;
    /// 2. wait for the producer;
    /// 3. wait until every queued item, end marker included, is acknowledged;
    /// 4. close the HTTP client;
    /// 5. put the end marker on the result channel;
    /// 6. wait for the flusher;
    /// 7. abort workers still parked on the empty request queue.
    ///
    /// Any fatal error aborts every task and is returned as is.
    pub async fn execute(self) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        info!(
            run_id = %self.run_id,
            url = %self.settings.url,
            requests_path = %self.settings.requests_path,
            output_path = %self.settings.output_path,
            concurrency = self.settings.concurrency,
            flush_every = self.settings.flush_every,
            "Starting batch run"
        );

        let queue = RequestQueue::bounded(self.settings.queue_capacity);
        let (results_tx, results_rx) = result_channel();

        let producer = Producer::new(
            self.source.clone(),
            self.settings.requests_path.clone(),
            queue.sender(),
            self.cancel.clone(),
            self.metrics.clone(),
        );
        let mut producer = tokio::spawn(producer.run());

        let flusher = Flusher::new(
            results_rx,
            self.sink.clone(),
            self.settings.output_path.clone(),
            self.settings.flush_every,
            self.metrics.clone(),
        );
        let mut flusher = tokio::spawn(flusher.run());

        let mut pool = workers::spawn_pool(
            self.settings.concurrency,
            PoolHandles {
                requests: queue.receiver(),
                results: results_tx.clone(),
                client: self.client.clone(),
                ignore_fields: self.settings.ignore_fields.clone().into(),
                metrics: self.metrics.clone(),
            },
        );

        let requests = tokio::select! {
            joined = &mut producer => match joined {
                Ok(Ok(requests)) => requests,
                Ok(Err(err)) => {
                    error!(run_id = %self.run_id, error = %err, "Producer failed");
                    flusher.abort();
                    return Err(err.into());
                }
                Err(err) => {
                    flusher.abort();
                    return Err(err.into());
                }
            },
            joined = &mut flusher => {
                producer.abort();
                return Err(flusher_stopped_early(joined));
            }
        };
        info!(run_id = %self.run_id, requests, "All requests queued");

        tokio::select! {
            _ = queue.join() => {}
            joined = &mut flusher => return Err(flusher_stopped_early(joined)),
        }
        info!(run_id = %self.run_id, "Request queue drained");

        self.client.close();

        if results_tx.send(QueueItem::End).is_err() {
            return Err(flusher_stopped_early(flusher.await));
        }
        drop(results_tx);

        let flushed = match flusher.await {
            Ok(Ok(summary)) => summary,
            Ok(Err(err)) => {
                error!(run_id = %self.run_id, error = %err, "Flusher failed");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        pool.shutdown().await;

        let summary = self.summary(requests, flushed, started.elapsed());
        info!(
            run_id = %summary.run_id,
            requests = summary.requests,
            succeeded = summary.metrics.requests_succeeded,
            failed = summary.metrics.requests_failed,
            partitions = summary.partitions,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            cancelled = summary.cancelled,
            "Batch run finished"
        );
        Ok(summary)
    }

    fn summary(&self, requests: u64, flushed: FlushSummary, elapsed: Duration) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            requests,
            partitions: flushed.partitions,
            results: flushed.results,
            metrics: self.metrics.snapshot(),
            cancelled: self.cancel.is_cancelled(),
            elapsed,
        }
    }
}

fn flusher_stopped_early(joined: Result<Result<FlushSummary, FlushError>, JoinError>) -> RunError {
    match joined {
        Ok(Err(err)) => {
            error!(error = %err, "Flusher failed");
            err.into()
        }
        Ok(Ok(_)) => RunError::Unexpected("Flusher stopped before the run finished".to_string()),
        Err(err) => err.into(),
    }
}
