use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    requests_read: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    results_flushed: AtomicU64,
    partitions_written: AtomicU64,
}

/// Run counters, cheap to clone and shared across producer, workers and flusher.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_read: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub results_flushed: u64,
    pub partitions_written: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests_read(&self, count: u64) {
        self.inner.requests_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_succeeded(&self, count: u64) {
        self.inner
            .requests_succeeded
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failed(&self, count: u64) {
        self.inner.requests_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_partition(&self, results: u64) {
        self.inner.partitions_written.fetch_add(1, Ordering::Relaxed);
        self.inner
            .results_flushed
            .fetch_add(results, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_read: self.inner.requests_read.load(Ordering::Relaxed),
            requests_succeeded: self.inner.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.inner.requests_failed.load(Ordering::Relaxed),
            results_flushed: self.inner.results_flushed.load(Ordering::Relaxed),
            partitions_written: self.inner.partitions_written.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let worker_view = metrics.clone();

        metrics.increment_requests_read(3);
        worker_view.increment_succeeded(2);
        worker_view.increment_failed(1);
        metrics.record_partition(3);

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                requests_read: 3,
                requests_succeeded: 2,
                requests_failed: 1,
                results_flushed: 3,
                partitions_written: 1,
            }
        );
    }
}
