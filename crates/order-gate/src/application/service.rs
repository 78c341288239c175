//! Ordering Gate Service
//!
//! Admission control in front of downstream processing:
//! 1. Partition the batch by document
//! 2. Register a ticket per document, capturing the previous ticket
//! 3. Wait for every previous ticket to settle
//! 4. Release the whole batch downstream
//! 5. Resolve the tickets whatever happens (see `guard`)
//! 6. Return downstream's result unchanged

use super::guard::TicketGuard;
use crate::adapters::resolver::EmbeddedDocumentResolver;
use crate::algorithms::partition_batch;
use crate::config::GateConfig;
use crate::domain::entities::{OrderedTransaction, TransactionBatch};
use crate::domain::tracker::{DocumentOrderTracker, Registration};
use crate::domain::value_objects::TicketOutcome;
use crate::metrics::GateMetrics;
use crate::ports::inbound::OrderingGateApi;
use crate::ports::outbound::{BatchProcessor, DocumentIdResolver};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Per-document ordering gate.
///
/// For any document, a batch whose `submit` call arrives later never starts
/// downstream before an earlier batch on that document has finished.
/// Batches on disjoint documents never wait on each other.
pub struct OrderingGate<T, D, R = EmbeddedDocumentResolver> {
    tracker: DocumentOrderTracker,
    processor: D,
    resolver: R,
    config: GateConfig,
    metrics: Arc<GateMetrics>,
    _transactions: PhantomData<fn(T)>,
}

impl<T, D, R> OrderingGate<T, D, R> {
    /// Create a gate with default config
    pub fn new(processor: D, resolver: R) -> Self {
        Self::with_config(processor, resolver, GateConfig::default())
    }

    /// Create a gate with custom config
    pub fn with_config(processor: D, resolver: R, config: GateConfig) -> Self {
        Self {
            tracker: DocumentOrderTracker::with_shards(config.shard_count),
            processor,
            resolver,
            config,
            metrics: Arc::new(GateMetrics::new()),
            _transactions: PhantomData,
        }
    }

    pub fn tracker(&self) -> &DocumentOrderTracker {
        &self.tracker
    }

    pub fn processor(&self) -> &D {
        &self.processor
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Shared handle to the gate's counters
    pub fn metrics(&self) -> Arc<GateMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl<T, D, R> OrderingGateApi<T> for OrderingGate<T, D, R>
where
    T: OrderedTransaction,
    D: BatchProcessor<T>,
    R: DocumentIdResolver<T>,
{
    type Output = D::Output;
    type Error = D::Error;

    async fn submit(&self, batch: TransactionBatch<T>) -> Result<D::Output, D::Error> {
        let batch_id = batch.id();

        // 1. Partition
        let partition = partition_batch(&batch, &self.resolver);
        self.metrics
            .record_submitted(batch.len(), partition.bypassed.len());

        // 2. Register every document in one step
        let registrations = self
            .tracker
            .register_batch(batch_id, partition.groups.values());

        let mut wait_set = Vec::new();
        let mut tickets = Vec::with_capacity(registrations.len());
        for Registration { previous, ticket } in registrations {
            if let Some(previous) = previous {
                if ticket.min_logical_timestamp() < previous.min_logical_timestamp() {
                    debug!(
                        document_id = %ticket.document_id(),
                        ticket_seq = ticket.seq(),
                        previous_seq = previous.seq(),
                        min_timestamp = ticket.min_logical_timestamp(),
                        previous_min_timestamp = previous.min_logical_timestamp(),
                        "Batch admitted behind a newer timestamp; keeping call order"
                    );
                }
                wait_set.push(previous);
            }
            tickets.push(ticket);
        }
        let mut guard = TicketGuard::new(&self.tracker, &self.metrics, batch_id, tickets);

        // 3. Wait for predecessors
        if !wait_set.is_empty() {
            let started = Instant::now();
            for previous in &wait_set {
                previous.wait_settled().await;
            }
            let waited = started.elapsed();
            self.metrics.record_wait(waited);

            if waited >= self.config.slow_wait_threshold() {
                warn!(
                    batch_id = %batch_id,
                    predecessors = wait_set.len(),
                    waited_ms = waited.as_millis() as u64,
                    "Slow wait for earlier batches on the same documents"
                );
            } else {
                debug!(
                    batch_id = %batch_id,
                    predecessors = wait_set.len(),
                    waited_ms = waited.as_millis() as u64,
                    "Earlier batches settled"
                );
            }
        }
        drop(wait_set);

        // 4. Release
        guard.release();
        debug!(
            batch_id = %batch_id,
            transactions = batch.len(),
            documents = partition.document_count(),
            bypassed = partition.bypassed.len(),
            "Batch released downstream"
        );
        let result = self.processor.process(batch).await;

        // 5. Resolve, 6. propagate unchanged
        let outcome = match &result {
            Ok(_) => TicketOutcome::Completed,
            Err(_) => TicketOutcome::Failed,
        };
        guard.finish(outcome);
        result
    }
}
