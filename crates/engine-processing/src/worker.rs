use crate::queue::{RequestReceiver, ResultSender};
use engine_core::{metrics::Metrics, transport::InferenceClient};
use model::records::{queue::QueueItem, request::Request, result::InferenceResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// One member of the worker pool.
///
/// A worker only leaves its loop by itself when it dequeues the end marker or
/// the request queue closes. Workers still parked on an empty queue after the
/// run has drained are aborted by the orchestrator.
pub struct Worker {
    id: usize,
    requests: RequestReceiver,
    results: ResultSender,
    client: InferenceClient,
    ignore_fields: Arc<[String]>,
    metrics: Metrics,
}

impl Worker {
    pub fn new(
        id: usize,
        requests: RequestReceiver,
        results: ResultSender,
        client: InferenceClient,
        ignore_fields: Arc<[String]>,
        metrics: Metrics,
    ) -> Self {
        Self {
            id,
            requests,
            results,
            client,
            ignore_fields,
            metrics,
        }
    }

    /// Returns the number of requests this worker handled.
    pub async fn run(self) -> u64 {
        let mut handled = 0u64;

        while let Some((item, ack)) = self.requests.recv().await {
            let request = match item {
                QueueItem::Item(request) => request,
                QueueItem::End => {
                    ack.complete();
                    debug!(worker = self.id, handled, "Received end marker");
                    break;
                }
            };

            let result = self.process(request).await;
            handled += 1;

            // The flusher only goes away early when it failed; the run is
            // being torn down at that point.
            let sent = self.results.send(QueueItem::Item(result));
            ack.complete();
            if sent.is_err() {
                warn!(worker = self.id, "Result channel closed; stopping worker");
                break;
            }
        }

        handled
    }

    /// Send one request and turn the outcome into a result that carries the
    /// original, unfiltered request.
    pub async fn process(&self, request: Request) -> InferenceResult {
        let body = request.filtered(&self.ignore_fields);

        match self.client.post_json(&body).await {
            Ok(response) => {
                self.metrics.increment_succeeded(1);
                InferenceResult::success(request, response)
            }
            Err(err) => {
                self.metrics.increment_failed(1);
                warn!(worker = self.id, error = %err, "Request failed");
                InferenceResult::failure(request, err.to_string())
            }
        }
    }
}
