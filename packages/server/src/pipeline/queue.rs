use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use worker::{DerivationJob, Deriver};

/// Producer side of the in-process derivation queue.
#[derive(Clone)]
pub struct DerivationQueue {
    tx: mpsc::Sender<DerivationJob>,
}

impl DerivationQueue {
    /// Create a bounded queue. The receiver goes to [`spawn_dispatcher`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DerivationJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Hand a job to the dispatcher without waiting.
    ///
    /// Returns `false` when the job was dropped because the queue is full or
    /// the dispatcher has stopped. The upload that produced the job is not
    /// affected either way.
    pub fn schedule(&self, job: DerivationJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!(
                    video_id = job.video_id,
                    blob_key = %job.original_key,
                    "Derivation queue full, job dropped"
                );
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!(
                    video_id = job.video_id,
                    blob_key = %job.original_key,
                    "Derivation dispatcher not running, job dropped"
                );
                false
            }
        }
    }
}

/// Drain `rx`, running each job on its own task with at most
/// `max_concurrent` jobs in flight.
pub fn spawn_dispatcher(
    deriver: Arc<Deriver>,
    rx: mpsc::Receiver<DerivationJob>,
    max_concurrent: usize,
) -> JoinHandle<()> {
    tokio::spawn(dispatch(deriver, rx, max_concurrent.max(1)))
}

async fn dispatch(
    deriver: Arc<Deriver>,
    mut rx: mpsc::Receiver<DerivationJob>,
    max_concurrent: usize,
) {
    info!(max_concurrent, "Starting derivation dispatcher");
    let permits = Arc::new(Semaphore::new(max_concurrent));

    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let deriver = Arc::clone(&deriver);
        // A panicking job only takes down its own task.
        tokio::spawn(async move {
            let _permit = permit;
            deriver.run(&job).await;
        });
    }

    info!("Derivation queue closed, dispatcher stopping");
}
