//! # Broadcast Coordinator
//!
//! Terminal downstream stage that fans released batches out to every
//! subscriber. Because it only ever sees batches the gate has released, each
//! subscriber observes per-document batches in gate admission order.
//!
//! Uses `tokio::sync::broadcast`; a subscriber that falls more than
//! `capacity` batches behind skips the overflow and keeps going.

use crate::domain::entities::{OrderedTransaction, TransactionBatch};
use crate::ports::outbound::BatchProcessor;
use async_trait::async_trait;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Batches buffered per subscriber before the oldest are dropped.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The coordinator was dropped.
    #[error("Broadcast coordinator closed")]
    Closed,
}

pub struct BroadcastCoordinator<T> {
    sender: broadcast::Sender<Arc<TransactionBatch<T>>>,
    batches_broadcast: AtomicU64,
    capacity: usize,
}

impl<T: Send + Sync + 'static> BroadcastCoordinator<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            batches_broadcast: AtomicU64::new(0),
            capacity,
        }
    }

    /// Receive every batch broadcast from now on.
    #[must_use]
    pub fn subscribe(&self) -> BatchSubscription<T> {
        BatchSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn batches_broadcast(&self) -> u64 {
        self.batches_broadcast.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Send + Sync + 'static> Default for BroadcastCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: OrderedTransaction> BatchProcessor<T> for BroadcastCoordinator<T> {
    /// Number of subscribers the batch was delivered to
    type Output = usize;
    type Error = Infallible;

    async fn process(&self, batch: TransactionBatch<T>) -> Result<usize, Infallible> {
        let batch_id = batch.id();
        let len = batch.len();
        self.batches_broadcast.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(Arc::new(batch)) {
            Ok(receivers) => {
                debug!(batch_id = %batch_id, transactions = len, receivers, "Batch broadcast");
                Ok(receivers)
            }
            Err(_) => {
                debug!(batch_id = %batch_id, transactions = len, "Batch dropped (no subscribers)");
                Ok(0)
            }
        }
    }
}

/// A subscription handle for receiving released batches.
pub struct BatchSubscription<T> {
    receiver: broadcast::Receiver<Arc<TransactionBatch<T>>>,
}

impl<T: Send + Sync + 'static> BatchSubscription<T> {
    /// Receive the next batch, or `None` once the coordinator is gone.
    pub async fn recv(&mut self) -> Option<Arc<TransactionBatch<T>>> {
        loop {
            match self.receiver.recv().await {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some batches dropped");
                }
            }
        }
    }

    /// `Ok(None)` if nothing is buffered right now.
    pub fn try_recv(&mut self) -> Result<Option<Arc<TransactionBatch<T>>>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(batch) => return Ok(Some(batch)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Convert into a stream that silently skips lagged batches.
    pub fn into_stream(self) -> impl Stream<Item = Arc<TransactionBatch<T>>> {
        BroadcastStream::new(self.receiver).filter_map(Result::ok)
    }
}
