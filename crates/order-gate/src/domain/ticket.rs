//! Order tickets
//!
//! A ticket is the tracker's bookkeeping for "a batch is in flight for this
//! document". It is created `Pending`, settled exactly once, and never reused.
//!
//! The completion signal is a `watch` channel holding `Option<TicketOutcome>`:
//! any number of tasks may wait on it concurrently and none of them consume
//! the value.

use super::entities::DocumentGroup;
use super::value_objects::{BatchId, DocumentId, LogicalTimestamp, TicketOutcome, TransactionId};
use std::fmt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

pub struct OrderTicket {
    seq: u64,
    batch_id: BatchId,
    document_id: DocumentId,
    member_transaction_ids: Vec<TransactionId>,
    min_logical_timestamp: LogicalTimestamp,
    /// Ticket this one was chained behind. Dropped once the batch is released
    /// so settled tickets do not form an unbounded chain.
    predecessor: Mutex<Option<Arc<OrderTicket>>>,
    signal: watch::Sender<Option<TicketOutcome>>,
}

impl OrderTicket {
    pub(crate) fn new(
        seq: u64,
        batch_id: BatchId,
        group: &DocumentGroup,
        predecessor: Option<Arc<OrderTicket>>,
    ) -> Self {
        let (signal, _) = watch::channel(None);
        Self {
            seq,
            batch_id,
            document_id: group.document_id.clone(),
            member_transaction_ids: group.member_transaction_ids.clone(),
            min_logical_timestamp: group.min_logical_timestamp,
            predecessor: Mutex::new(predecessor),
            signal,
        }
    }

    /// Tracker-wide registration sequence number
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn member_transaction_ids(&self) -> &[TransactionId] {
        &self.member_transaction_ids
    }

    pub fn min_logical_timestamp(&self) -> LogicalTimestamp {
        self.min_logical_timestamp
    }

    /// `None` while pending.
    pub fn outcome(&self) -> Option<TicketOutcome> {
        *self.signal.borrow()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn predecessor(&self) -> Option<Arc<OrderTicket>> {
        self.predecessor.lock().clone()
    }

    /// Settle the ticket and wake every waiter.
    ///
    /// Returns `false` if it was already settled; the first outcome sticks.
    pub(crate) fn settle(&self, outcome: TicketOutcome) -> bool {
        let settled = self.signal.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(outcome);
            true
        });

        // An abandoned ticket keeps its predecessor: its waiters fall through to it.
        if settled && outcome.reached_downstream() {
            self.detach_predecessor();
        }
        settled
    }

    /// Forget the predecessor. Called once the batch has been released downstream.
    pub(crate) fn detach_predecessor(&self) {
        self.predecessor.lock().take();
    }

    /// Nearest ancestor that is still pending, skipping abandoned links.
    pub(crate) fn pending_ancestor(&self) -> Option<Arc<OrderTicket>> {
        let mut next = self.predecessor();
        while let Some(ticket) = next {
            match ticket.outcome() {
                None => return Some(ticket),
                Some(TicketOutcome::Abandoned) => next = ticket.predecessor(),
                Some(_) => return None,
            }
        }
        None
    }

    /// Wait until every batch admitted ahead of this ticket's successor has
    /// left downstream processing.
    ///
    /// Completed and failed tickets end the wait. An abandoned ticket never ran,
    /// so the wait continues on whatever it was itself waiting on.
    pub async fn wait_settled(self: &Arc<Self>) {
        let mut current = Some(Arc::clone(self));
        while let Some(ticket) = current.take() {
            let mut receiver = ticket.signal.subscribe();
            // The sender lives inside `ticket`, which we hold, so the channel cannot close.
            let outcome = receiver
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|state| *state);

            if outcome == Some(TicketOutcome::Abandoned) {
                current = ticket.predecessor();
            }
        }
    }
}

impl fmt::Debug for OrderTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderTicket")
            .field("seq", &self.seq)
            .field("batch_id", &self.batch_id)
            .field("document_id", &self.document_id)
            .field("members", &self.member_transaction_ids.len())
            .field("min_logical_timestamp", &self.min_logical_timestamp)
            .field("outcome", &self.outcome())
            .finish()
    }
}
