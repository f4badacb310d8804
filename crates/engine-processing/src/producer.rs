use crate::{
    error::ProducerError,
    queue::{QueueClosed, RequestSender},
};
use connectors::RequestSource;
use engine_core::metrics::Metrics;
use model::records::{queue::QueueItem, request::Request};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reads every request under the input path and feeds the request queue.
pub struct Producer {
    source: Arc<dyn RequestSource>,
    requests_path: String,
    sender: RequestSender,
    cancel: CancellationToken,
    metrics: Metrics,
}

impl Producer {
    pub fn new(
        source: Arc<dyn RequestSource>,
        requests_path: impl Into<String>,
        sender: RequestSender,
        cancel: CancellationToken,
        metrics: Metrics,
    ) -> Self {
        Self {
            source,
            requests_path: requests_path.into(),
            sender,
            cancel,
            metrics,
        }
    }

    /// Push each request in input order, then exactly one end marker.
    ///
    /// Returns the number of requests pushed. On cancellation reading stops
    /// early but the end marker is still sent so downstream stages wind down.
    /// A read or parse failure returns immediately without an end marker.
    pub async fn run(self) -> Result<u64, ProducerError> {
        let locations = self.source.resolve(&self.requests_path).await?;
        info!(
            path = %self.requests_path,
            files = locations.len(),
            "Reading requests"
        );

        let mut produced = 0u64;
        for location in &locations {
            if self.cancel.is_cancelled() {
                break;
            }
            produced += self.produce_file(location).await?;
        }

        self.sender
            .send(QueueItem::End)
            .await
            .map_err(|QueueClosed| ProducerError::QueueClosed)?;

        if self.cancel.is_cancelled() {
            info!(produced, "Cancellation requested. Producer stopped early.");
        } else {
            info!(produced, "Producer finished");
        }
        Ok(produced)
    }

    async fn produce_file(&self, location: &str) -> Result<u64, ProducerError> {
        let reader = self.source.open(location).await?;
        let mut lines = reader.lines();
        let mut line_no = 0u64;
        let mut produced = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = lines.next_line() => next,
            };

            let line = next.map_err(|source| ProducerError::Read {
                location: location.to_string(),
                line: line_no + 1,
                source,
            })?;
            let Some(line) = line else { break };
            line_no += 1;

            if line.trim().is_empty() {
                debug!(location, line = line_no, "Skipping blank line");
                continue;
            }

            let request = Request::parse(&line).map_err(|source| ProducerError::Parse {
                location: location.to_string(),
                line: line_no,
                source,
            })?;

            self.sender
                .send(QueueItem::Item(request))
                .await
                .map_err(|QueueClosed| ProducerError::QueueClosed)?;
            self.metrics.increment_requests_read(1);
            produced += 1;
        }

        debug!(location, produced, "Finished reading file");
        Ok(produced)
    }
}
