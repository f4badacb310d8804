//! Channels between the pipeline stages.
//!
//! The request queue is bounded and tracks how many of the items pushed onto
//! it are still unacknowledged, so the orchestrator can wait for it to drain
//! without every worker having to exit. The result channel is unbounded so
//! that workers never wait on the flusher.

use model::records::{queue::QueueItem, request::Request, result::InferenceResult};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};

pub type ResultSender = mpsc::UnboundedSender<QueueItem<InferenceResult>>;
pub type ResultReceiver = mpsc::UnboundedReceiver<QueueItem<InferenceResult>>;

pub fn result_channel() -> (ResultSender, ResultReceiver) {
    mpsc::unbounded_channel()
}

/// Error returned when pushing onto a request queue nobody reads anymore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

/// Bounded request queue with a drain signal.
pub struct RequestQueue {
    tx: mpsc::Sender<QueueItem<Request>>,
    rx: Arc<Mutex<mpsc::Receiver<QueueItem<Request>>>>,
    pending: Arc<watch::Sender<usize>>,
}

impl RequestQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (pending, _) = watch::channel(0usize);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            pending: Arc::new(pending),
        }
    }

    pub fn sender(&self) -> RequestSender {
        RequestSender {
            tx: self.tx.clone(),
            pending: self.pending.clone(),
        }
    }

    pub fn receiver(&self) -> RequestReceiver {
        RequestReceiver {
            rx: self.rx.clone(),
            pending: self.pending.clone(),
        }
    }

    /// Items pushed but not yet acknowledged.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Resolve once every item pushed so far, the end marker included, has
    /// been acknowledged.
    pub async fn join(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }
}

/// Producer side of the request queue. Sending waits while the queue is full.
#[derive(Clone)]
pub struct RequestSender {
    tx: mpsc::Sender<QueueItem<Request>>,
    pending: Arc<watch::Sender<usize>>,
}

impl RequestSender {
    pub async fn send(&self, item: QueueItem<Request>) -> Result<(), QueueClosed> {
        // Count before the item becomes visible so a fast consumer cannot
        // acknowledge it first and drive the counter below zero.
        self.pending.send_modify(|pending| *pending += 1);
        if self.tx.send(item).await.is_err() {
            self.pending
                .send_modify(|pending| *pending = pending.saturating_sub(1));
            return Err(QueueClosed);
        }
        Ok(())
    }
}

/// Consumer side of the request queue, shared by all workers.
#[derive(Clone)]
pub struct RequestReceiver {
    rx: Arc<Mutex<mpsc::Receiver<QueueItem<Request>>>>,
    pending: Arc<watch::Sender<usize>>,
}

impl RequestReceiver {
    /// Wait for the next item. `None` means every sender is gone.
    pub async fn recv(&self) -> Option<(QueueItem<Request>, Ack)> {
        let item = self.rx.lock().await.recv().await?;
        Some((
            item,
            Ack {
                pending: Some(self.pending.clone()),
            },
        ))
    }
}

/// Acknowledgement for one dequeued item. Completing (or dropping) it marks
/// the item done.
pub struct Ack {
    pending: Option<Arc<watch::Sender<usize>>>,
}

impl Ack {
    pub fn complete(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.send_modify(|pending| *pending = pending.saturating_sub(1));
        }
    }
}

impl Drop for Ack {
    fn drop(&mut self) {
        self.release();
    }
}
