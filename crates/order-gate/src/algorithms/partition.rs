//! Batch partitioning
//!
//! Splits a batch into one [`DocumentGroup`] per target document. Only the
//! bookkeeping is split: the batch itself is always released downstream whole.

use crate::domain::entities::{DocumentGroup, OrderedTransaction, TransactionBatch};
use crate::domain::value_objects::{DocumentId, TransactionId};
use crate::ports::outbound::DocumentIdResolver;
use std::collections::BTreeMap;

/// Per-document view of one batch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchPartition {
    /// Groups keyed by document, in document order
    pub groups: BTreeMap<DocumentId, DocumentGroup>,
    /// Transactions with no resolvable document
    pub bypassed: Vec<TransactionId>,
}

impl BatchPartition {
    /// True if nothing in the batch needs to be serialized.
    pub fn is_unordered(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.groups.len()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.groups.keys()
    }
}

/// Group a batch's transactions by the document they target.
///
/// Member order inside each group follows batch order.
pub fn partition_batch<T, R>(batch: &TransactionBatch<T>, resolver: &R) -> BatchPartition
where
    T: OrderedTransaction,
    R: DocumentIdResolver<T> + ?Sized,
{
    let mut partition = BatchPartition::default();

    for tx in batch {
        match resolver.document_id(tx) {
            Some(document_id) => partition
                .groups
                .entry(document_id.clone())
                .or_insert_with(|| DocumentGroup::new(document_id))
                .push(tx.transaction_id(), tx.logical_timestamp()),
            None => partition.bypassed.push(tx.transaction_id()),
        }
    }

    partition
}
