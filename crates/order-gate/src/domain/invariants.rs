//! Ordering invariants
//!
//! Pure checks over recorded downstream activity. Used by tests and by
//! anything that audits a processing log after the fact.

use super::entities::{OrderedTransaction, TransactionBatch};
use super::value_objects::{DocumentId, TransactionId};
use std::collections::HashMap;
use std::time::Instant;

/// One batch's stay in downstream processing.
#[derive(Clone, Debug)]
pub struct ProcessingSpan {
    /// Position of the batch's `submit` call in arrival order
    pub admission: usize,
    pub documents: Vec<DocumentId>,
    pub started: Instant,
    pub finished: Instant,
}

/// INVARIANT-1: Per-document FIFO
///
/// For every document, a batch admitted later starts downstream only after
/// every earlier batch on that document has finished.
pub fn invariant_per_document_fifo(spans: &[ProcessingSpan]) -> bool {
    let mut by_document: HashMap<&DocumentId, Vec<&ProcessingSpan>> = HashMap::new();
    for span in spans {
        for document in &span.documents {
            by_document.entry(document).or_default().push(span);
        }
    }

    by_document.values_mut().all(|spans| {
        spans.sort_by_key(|span| span.admission);
        spans
            .windows(2)
            .all(|pair| pair[1].started >= pair[0].finished)
    })
}

/// INVARIANT-2: Batch atomicity
///
/// The batch that reached downstream holds exactly the submitted
/// transactions, in submission order.
pub fn invariant_batch_atomicity<T: OrderedTransaction>(
    released: &TransactionBatch<T>,
    submitted: &[TransactionId],
) -> bool {
    released.len() == submitted.len()
        && released
            .iter()
            .zip(submitted)
            .all(|(tx, id)| tx.transaction_id() == *id)
}

/// INVARIANT-3: Call order, not timestamp order
///
/// Downstream completion order for one document equals admission order,
/// whatever the timestamps say.
pub fn invariant_completion_follows_admission(completions: &[usize]) -> bool {
    completions.windows(2).all(|pair| pair[0] < pair[1])
}
