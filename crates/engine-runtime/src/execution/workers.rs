use engine_core::{metrics::Metrics, transport::InferenceClient};
use engine_processing::{
    queue::{RequestReceiver, ResultSender},
    worker::Worker,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;

/// Shared handles every worker in the pool gets a clone of.
pub struct PoolHandles {
    pub requests: RequestReceiver,
    pub results: ResultSender,
    pub client: InferenceClient,
    pub ignore_fields: Arc<[String]>,
    pub metrics: Metrics,
}

/// Spawn `size` workers on the current runtime.
///
/// Dropping the returned set aborts any worker still running.
pub fn spawn_pool(size: usize, handles: PoolHandles) -> JoinSet<u64> {
    info!(workers = size, "Launching workers");

    let mut pool = JoinSet::new();
    for id in 0..size {
        let worker = Worker::new(
            id,
            handles.requests.clone(),
            handles.results.clone(),
            handles.client.clone(),
            handles.ignore_fields.clone(),
            handles.metrics.clone(),
        );
        pool.spawn(worker.run());
    }
    pool
}
