//! CrmSyncQueue - Background work queue for CRM mirroring.
//!
//! Commits hand a snapshot to the queue and return immediately. A single
//! worker task drains the queue; failures are logged there and never retried.
//! When the queue is full the snapshot is dropped with a warning.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::conversation::Conversation;
use crate::ports::CrmSync;

/// Default number of snapshots buffered before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sending half of the CRM queue. Cheap to clone.
#[derive(Clone)]
pub struct CrmSyncQueue {
    sender: mpsc::Sender<Conversation>,
}

impl CrmSyncQueue {
    /// Spawns the worker on the current runtime.
    ///
    /// The worker stops once every queue handle has been dropped.
    pub fn start(sync: Arc<dyn CrmSync>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, sync));
        (Self { sender }, worker)
    }

    /// Schedules a sync without waiting for it.
    pub fn schedule(&self, snapshot: Conversation) {
        let lead_id = snapshot.id().clone();
        match self.sender.try_send(snapshot) {
            Ok(()) => tracing::debug!(lead_id = %lead_id, "crm sync scheduled"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(lead_id = %lead_id, "crm sync queue full, dropping update")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(lead_id = %lead_id, "crm sync worker stopped, dropping update")
            }
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Conversation>, sync: Arc<dyn CrmSync>) {
    while let Some(snapshot) = receiver.recv().await {
        match sync.sync(&snapshot).await {
            Ok(()) => tracing::debug!(lead_id = %snapshot.id(), "crm sync completed"),
            Err(e) => tracing::warn!(lead_id = %snapshot.id(), error = %e, "crm sync failed"),
        }
    }
    tracing::debug!("crm sync worker stopped");
}
