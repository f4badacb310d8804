use crate::{error::FlushError, queue::ResultReceiver};
use connectors::OutputSink;
use engine_core::metrics::Metrics;
use model::records::{
    partition::{PartitionId, encode_jsonl},
    queue::QueueItem,
    result::InferenceResult,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub partitions: u64,
    pub results: u64,
}

/// Batches results and writes them out as numbered partition files.
pub struct Flusher {
    results: ResultReceiver,
    sink: Arc<dyn OutputSink>,
    output_path: String,
    flush_every: usize,
    metrics: Metrics,
    next_partition: PartitionId,
    batch: Vec<InferenceResult>,
    summary: FlushSummary,
}

impl Flusher {
    pub fn new(
        results: ResultReceiver,
        sink: Arc<dyn OutputSink>,
        output_path: impl Into<String>,
        flush_every: usize,
        metrics: Metrics,
    ) -> Self {
        let flush_every = flush_every.max(1);
        Self {
            results,
            sink,
            output_path: output_path.into(),
            flush_every,
            metrics,
            next_partition: PartitionId::first(),
            batch: Vec::with_capacity(flush_every),
            summary: FlushSummary::default(),
        }
    }

    /// Consume results until the end marker, writing a partition every
    /// `flush_every` results and one last partition for whatever remains.
    /// An empty remainder writes nothing.
    pub async fn run(mut self) -> Result<FlushSummary, FlushError> {
        loop {
            match self.results.recv().await {
                Some(QueueItem::Item(result)) => {
                    self.batch.push(result);
                    if self.batch.len() >= self.flush_every {
                        self.flush().await?;
                    }
                }
                Some(QueueItem::End) => break,
                None => {
                    warn!(
                        buffered = self.batch.len(),
                        "Result channel closed without an end marker"
                    );
                    break;
                }
            }
        }

        if !self.batch.is_empty() {
            self.flush().await?;
        }

        info!(
            partitions = self.summary.partitions,
            results = self.summary.results,
            "Flusher finished"
        );
        Ok(self.summary)
    }

    async fn flush(&mut self) -> Result<(), FlushError> {
        let partition = self.next_partition;
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.flush_every));
        let bytes = encode_jsonl(&batch)
            .map_err(|source| FlushError::Encode { partition, source })?;
        let path = partition.path_in(&self.output_path);

        self.sink
            .write(&path, bytes)
            .await
            .map_err(|source| FlushError::Write { partition, source })?;

        let count = batch.len() as u64;
        info!(partition = %partition, path = %path, results = count, "Wrote partition");

        self.next_partition = partition.next();
        self.summary.partitions += 1;
        self.summary.results += count;
        self.metrics.record_partition(count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ResultSender, result_channel};
    use connectors::Storage;
    use model::records::request::Request;
    use serde_json::json;
    use std::path::Path;

    fn result(n: usize) -> InferenceResult {
        let request = Request::parse(&json!({ "n": n }).to_string()).unwrap();
        InferenceResult::success(request, json!({ "out": n }))
    }

    fn flusher(dir: &Path, flush_every: usize) -> (ResultSender, Flusher) {
        let (tx, rx) = result_channel();
        let flusher = Flusher::new(
            rx,
            Arc::new(Storage::local()),
            dir.to_string_lossy(),
            flush_every,
            Metrics::new(),
        );
        (tx, flusher)
    }

    fn line_counts(dir: &Path) -> Vec<(String, usize)> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
            .into_iter()
            .map(|path| {
                let content = std::fs::read_to_string(&path).unwrap();
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                (name, content.lines().count())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_partitions_full_batches_and_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, flusher) = flusher(dir.path(), 10);

        for n in 0..25 {
            tx.send(QueueItem::Item(result(n))).unwrap();
        }
        tx.send(QueueItem::End).unwrap();

        let summary = flusher.run().await.unwrap();
        assert_eq!(
            summary,
            FlushSummary {
                partitions: 3,
                results: 25
            }
        );
        assert_eq!(
            line_counts(dir.path()),
            vec![
                ("part-1.jsonl".to_string(), 10),
                ("part-2.jsonl".to_string(), 10),
                ("part-3.jsonl".to_string(), 5),
            ]
        );
    }

    #[tokio::test]
    async fn test_end_marker_alone_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, flusher) = flusher(dir.path(), 10);
        tx.send(QueueItem::End).unwrap();

        let summary = flusher.run().await.unwrap();
        assert_eq!(summary, FlushSummary::default());
        assert!(line_counts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_tail() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, flusher) = flusher(dir.path(), 2);
        for n in 0..4 {
            tx.send(QueueItem::Item(result(n))).unwrap();
        }
        tx.send(QueueItem::End).unwrap();

        let summary = flusher.run().await.unwrap();
        assert_eq!(summary.partitions, 2);
        assert_eq!(
            line_counts(dir.path()),
            vec![
                ("part-1.jsonl".to_string(), 2),
                ("part-2.jsonl".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_partition_lines_are_results() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, flusher) = flusher(dir.path(), 10);
        tx.send(QueueItem::Item(result(7))).unwrap();
        tx.send(QueueItem::End).unwrap();
        flusher.run().await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("part-1.jsonl")).unwrap();
        assert_eq!(content, r#"{"request":{"n":7},"response":{"out":7}}"#);
    }

    #[tokio::test]
    async fn test_closed_channel_flushes_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, flusher) = flusher(dir.path(), 10);
        tx.send(QueueItem::Item(result(1))).unwrap();
        drop(tx);

        let summary = flusher.run().await.unwrap();
        assert_eq!(summary.results, 1);
    }
}
