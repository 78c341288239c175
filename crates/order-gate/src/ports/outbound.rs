//! Outbound Ports (Driven Ports / SPI)

use crate::domain::entities::TransactionBatch;
use crate::domain::value_objects::DocumentId;
use async_trait::async_trait;

/// Downstream processing stage, ultimately ending in broadcast.
///
/// Implementations must settle every call exactly once; a call that never
/// returns blocks its documents forever.
#[async_trait]
pub trait BatchProcessor<T>: Send + Sync {
    type Output: Send;
    type Error: Send;

    async fn process(&self, batch: TransactionBatch<T>) -> Result<Self::Output, Self::Error>;
}

/// Maps a transaction to the document it mutates.
///
/// Must be pure: the same transaction always resolves to the same document.
pub trait DocumentIdResolver<T>: Send + Sync {
    fn document_id(&self, transaction: &T) -> Option<DocumentId>;
}

impl<T, F> DocumentIdResolver<T> for F
where
    F: Fn(&T) -> Option<DocumentId> + Send + Sync,
{
    fn document_id(&self, transaction: &T) -> Option<DocumentId> {
        self(transaction)
    }
}
