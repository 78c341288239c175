//! Structured cleanup for admitted batches
//!
//! Every ticket a batch registers is resolved when its guard drops, whether
//! `submit` returned, downstream returned an error, downstream panicked, or
//! the `submit` future was dropped part-way through.

use crate::domain::ticket::OrderTicket;
use crate::domain::tracker::DocumentOrderTracker;
use crate::domain::value_objects::{BatchId, TicketOutcome};
use crate::metrics::GateMetrics;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct TicketGuard<'a> {
    tracker: &'a DocumentOrderTracker,
    metrics: &'a GateMetrics,
    batch_id: BatchId,
    tickets: Vec<Arc<OrderTicket>>,
    released: bool,
    outcome: Option<TicketOutcome>,
}

impl<'a> TicketGuard<'a> {
    pub(crate) fn new(
        tracker: &'a DocumentOrderTracker,
        metrics: &'a GateMetrics,
        batch_id: BatchId,
        tickets: Vec<Arc<OrderTicket>>,
    ) -> Self {
        Self {
            tracker,
            metrics,
            batch_id,
            tickets,
            released: false,
            outcome: None,
        }
    }

    /// Mark the batch as handed to downstream.
    pub(crate) fn release(&mut self) {
        self.released = true;
        for ticket in &self.tickets {
            ticket.detach_predecessor();
        }
    }

    /// Record how downstream finished and resolve the tickets.
    pub(crate) fn finish(mut self, outcome: TicketOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        let outcome = match (self.released, self.outcome) {
            (false, _) => TicketOutcome::Abandoned,
            (true, Some(outcome)) => outcome,
            (true, None) => TicketOutcome::Failed,
        };

        for ticket in self.tickets.drain(..) {
            self.tracker.resolve(&ticket, outcome);
        }
        self.metrics.record_outcome(outcome);

        match (self.released, self.outcome) {
            (false, _) => debug!(
                batch_id = %self.batch_id,
                "Batch dropped before release; successors fall through to its predecessors"
            ),
            (true, None) => warn!(
                batch_id = %self.batch_id,
                "Downstream processing did not return; releasing documents"
            ),
            _ => {}
        }
    }
}
