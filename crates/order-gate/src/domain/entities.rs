//! Core entities: transactions and batches

use super::value_objects::{BatchId, DocumentId, LogicalTimestamp, TransactionId};
use serde::{Deserialize, Serialize};

/// What the gate needs to know about any transaction type.
///
/// The document target is deliberately absent: it is supplied by a
/// [`DocumentIdResolver`](crate::ports::outbound::DocumentIdResolver).
pub trait OrderedTransaction: Send + Sync + 'static {
    fn transaction_id(&self) -> TransactionId;
    fn logical_timestamp(&self) -> LogicalTimestamp;
}

/// Immutable mutation record targeting (at most) one document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction<P> {
    /// Unique id
    pub id: TransactionId,
    /// Target document, `None` if the mutation has nothing to serialize against
    pub document_id: Option<DocumentId>,
    /// Writer-side modification counter (`modifiedOn`)
    pub logical_timestamp: LogicalTimestamp,
    /// Opaque to the gate
    pub payload: P,
}

impl<P> Transaction<P> {
    pub fn new(
        document_id: impl Into<DocumentId>,
        logical_timestamp: LogicalTimestamp,
        payload: P,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            document_id: Some(document_id.into()),
            logical_timestamp,
            payload,
        }
    }

    /// A transaction without a document target.
    pub fn unrouted(logical_timestamp: LogicalTimestamp, payload: P) -> Self {
        Self {
            id: TransactionId::new(),
            document_id: None,
            logical_timestamp,
            payload,
        }
    }

    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = id;
        self
    }
}

impl<P: Send + Sync + 'static> OrderedTransaction for Transaction<P> {
    fn transaction_id(&self) -> TransactionId {
        self.id
    }

    fn logical_timestamp(&self) -> LogicalTimestamp {
        self.logical_timestamp
    }
}

/// One unit of admission: an ordered list of transactions, possibly
/// spanning several documents.
#[derive(Clone, Debug)]
pub struct TransactionBatch<T> {
    id: BatchId,
    transactions: Vec<T>,
}

impl<T> TransactionBatch<T> {
    pub fn new(transactions: Vec<T>) -> Self {
        Self {
            id: BatchId::new(),
            transactions,
        }
    }

    pub fn single(transaction: T) -> Self {
        Self::new(vec![transaction])
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn transactions(&self) -> &[T] {
        &self.transactions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn into_transactions(self) -> Vec<T> {
        self.transactions
    }
}

impl<T> FromIterator<T> for TransactionBatch<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a TransactionBatch<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

/// The members of one batch that touch one document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentGroup {
    pub document_id: DocumentId,
    pub member_transaction_ids: Vec<TransactionId>,
    /// Diagnostics only, never used for gating
    pub min_logical_timestamp: LogicalTimestamp,
}

impl DocumentGroup {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            member_transaction_ids: Vec::new(),
            min_logical_timestamp: LogicalTimestamp::MAX,
        }
    }

    pub fn push(&mut self, id: TransactionId, timestamp: LogicalTimestamp) {
        self.member_transaction_ids.push(id);
        self.min_logical_timestamp = self.min_logical_timestamp.min(timestamp);
    }

    pub fn len(&self) -> usize {
        self.member_transaction_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_transaction_ids.is_empty()
    }
}
