//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::TransactionBatch;
use async_trait::async_trait;

/// Admission API used by transaction producers.
#[async_trait]
pub trait OrderingGateApi<T>: Send + Sync {
    /// Downstream's success value, returned unchanged
    type Output: Send;
    /// Downstream's error, returned unchanged
    type Error: Send;

    /// Admit a batch and run it downstream once every earlier batch touching
    /// the same documents has finished.
    ///
    /// Callers must submit in the order documents should observe. The gate
    /// never reorders by timestamp.
    async fn submit(&self, batch: TransactionBatch<T>) -> Result<Self::Output, Self::Error>;
}
