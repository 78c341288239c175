//! Shared fixtures for the integration tests.

use async_trait::async_trait;
use order_gate::domain::invariants::ProcessingSpan;
use order_gate::{
    BatchProcessor, DocumentId, EmbeddedDocumentResolver, OrderingGate, OrderingGateApi,
    Transaction, TransactionBatch, TransactionId,
};
use std::collections::BTreeSet;
use parking_lot::Mutex;
use std::sync::Arc;
use std::task::Poll;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Test payload: how downstream should treat the transaction.
#[derive(Clone, Debug, Default)]
pub struct Step {
    /// Position of the owning batch's `submit` call
    pub admission: usize,
    pub delay_ms: u64,
    pub fail: bool,
}

pub type Tx = Transaction<Step>;
pub type TestGate = OrderingGate<Tx, SpanRecorder, EmbeddedDocumentResolver>;

pub fn tx(document: &str, logical_timestamp: u64, step: Step) -> Tx {
    Transaction::new(document, logical_timestamp, step)
}

/// A one-transaction batch on `document`.
pub fn single(document: &str, admission: usize, delay_ms: u64) -> TransactionBatch<Tx> {
    TransactionBatch::single(tx(
        document,
        admission as u64,
        Step {
            admission,
            delay_ms,
            fail: false,
        },
    ))
}

/// Downstream stand-in. Sleeps for the batch's longest delay and records
/// a [`ProcessingSpan`] plus the released transaction ids.
#[derive(Clone, Default)]
pub struct SpanRecorder {
    spans: Arc<Mutex<Vec<ProcessingSpan>>>,
    released: Arc<Mutex<Vec<Vec<TransactionId>>>>,
}

impl SpanRecorder {
    pub fn spans(&self) -> Vec<ProcessingSpan> {
        self.spans.lock().clone()
    }

    pub fn released(&self) -> Vec<Vec<TransactionId>> {
        self.released.lock().clone()
    }

    /// Admission indexes in the order downstream finished them.
    pub fn completion_order(&self) -> Vec<usize> {
        let mut spans = self.spans();
        spans.sort_by_key(|span| span.finished);
        spans.into_iter().map(|span| span.admission).collect()
    }
}

#[async_trait]
impl BatchProcessor<Tx> for SpanRecorder {
    type Output = Vec<TransactionId>;
    type Error = String;

    async fn process(&self, batch: TransactionBatch<Tx>) -> Result<Vec<TransactionId>, String> {
        let started = Instant::now();
        let ids: Vec<_> = batch.iter().map(|tx| tx.id).collect();
        self.released.lock().push(ids.clone());

        let delay = batch.iter().map(|tx| tx.payload.delay_ms).max().unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let documents: BTreeSet<DocumentId> =
            batch.iter().filter_map(|tx| tx.document_id.clone()).collect();
        self.spans.lock().push(ProcessingSpan {
            admission: batch.iter().map(|tx| tx.payload.admission).min().unwrap_or(0),
            documents: documents.into_iter().collect(),
            started,
            finished: Instant::now(),
        });

        if batch.iter().any(|tx| tx.payload.fail) {
            return Err("boom".to_string());
        }
        Ok(ids)
    }
}

pub fn gate() -> (Arc<TestGate>, SpanRecorder) {
    let recorder = SpanRecorder::default();
    let gate = Arc::new(OrderingGate::new(recorder.clone(), EmbeddedDocumentResolver));
    (gate, recorder)
}

/// Start `submit(batch)` and return once the batch has been admitted.
///
/// The first poll of `submit` registers the batch's tickets, so driving it
/// once here fixes the admission order to the order of `admit` calls.
pub async fn admit(
    gate: &Arc<TestGate>,
    batch: TransactionBatch<Tx>,
) -> JoinHandle<Result<Vec<TransactionId>, String>> {
    let gate = Arc::clone(gate);
    let mut submission = Box::pin(async move { gate.submit(batch).await });
    match futures::poll!(submission.as_mut()) {
        Poll::Ready(result) => tokio::spawn(async move { result }),
        Poll::Pending => tokio::spawn(submission),
    }
}

/// Await a submission, failing the test instead of hanging.
pub async fn settle(
    handle: JoinHandle<Result<Vec<TransactionId>, String>>,
) -> Result<Vec<TransactionId>, String> {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("submission hung")
        .expect("submission task panicked")
}
