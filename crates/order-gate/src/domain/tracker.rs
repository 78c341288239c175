//! Document order tracker
//!
//! Maps each document to its most recently admitted, still-pending ticket.
//! The map is split into independently locked shards; locks are held only for
//! the read/swap, never across an `.await`.

use super::entities::DocumentGroup;
use super::ticket::OrderTicket;
use super::value_objects::{BatchId, DocumentId, TicketOutcome};
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::trace;

/// Shard count used by [`DocumentOrderTracker::new`]
pub const DEFAULT_SHARD_COUNT: usize = 64;

type Shard = HashMap<DocumentId, Arc<OrderTicket>>;

/// Result of registering one document for one batch.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Ticket that was current before the swap; the new batch must wait on it
    pub previous: Option<Arc<OrderTicket>>,
    /// Freshly registered pending ticket
    pub ticket: Arc<OrderTicket>,
}

#[derive(Debug)]
pub struct DocumentOrderTracker {
    shards: Box<[Mutex<Shard>]>,
    hasher: RandomState,
    next_seq: AtomicU64,
}

impl DocumentOrderTracker {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    /// A shard count of zero is treated as one.
    pub fn with_shards(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(Shard::new()))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, document_id: &DocumentId) -> usize {
        (self.hasher.hash_one(document_id) % self.shards.len() as u64) as usize
    }

    fn lock_shard(&self, index: usize) -> MutexGuard<'_, Shard> {
        self.shards[index].lock()
    }

    fn swap_locked(&self, shard: &mut Shard, batch_id: BatchId, group: &DocumentGroup) -> Registration {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let previous = shard.get(&group.document_id).cloned();
        let ticket = Arc::new(OrderTicket::new(seq, batch_id, group, previous.clone()));
        shard.insert(group.document_id.clone(), Arc::clone(&ticket));

        trace!(
            document_id = %group.document_id,
            ticket_seq = seq,
            chained = previous.is_some(),
            "Registered order ticket"
        );

        Registration { previous, ticket }
    }

    /// Atomically replace the current ticket for one document with a fresh
    /// pending one, returning what was there before.
    pub fn register_and_swap(&self, batch_id: BatchId, group: &DocumentGroup) -> Registration {
        let mut shard = self.lock_shard(self.shard_index(&group.document_id));
        self.swap_locked(&mut shard, batch_id, group)
    }

    /// Register every document of one batch as a single atomic step.
    ///
    /// All involved shards are locked in ascending index order before any
    /// swap. Two batches that share more than one document therefore observe
    /// each other in the same order on every document, which rules out a
    /// wait cycle between them.
    pub fn register_batch<'a, I>(&self, batch_id: BatchId, groups: I) -> Vec<Registration>
    where
        I: IntoIterator<Item = &'a DocumentGroup>,
    {
        let placed: Vec<(usize, &DocumentGroup)> = groups
            .into_iter()
            .map(|group| (self.shard_index(&group.document_id), group))
            .collect();

        let mut locked: BTreeMap<usize, MutexGuard<'_, Shard>> = BTreeMap::new();
        let mut indexes: Vec<usize> = placed.iter().map(|(index, _)| *index).collect();
        indexes.sort_unstable();
        indexes.dedup();
        for index in indexes {
            locked.insert(index, self.lock_shard(index));
        }

        placed
            .into_iter()
            .filter_map(|(index, group)| {
                let shard = locked.get_mut(&index)?;
                Some(self.swap_locked(shard, batch_id, group))
            })
            .collect()
    }

    /// Settle `ticket` and evict it if it is still the current entry.
    ///
    /// Eviction compares identity, so a superseded ticket can never remove its
    /// successor. A current ticket that was abandoned hands the entry back to
    /// its nearest pending ancestor, which is still in flight.
    ///
    /// Returns `false` (and does nothing) if the ticket was already settled.
    pub fn resolve(&self, ticket: &Arc<OrderTicket>, outcome: TicketOutcome) -> bool {
        if !ticket.settle(outcome) {
            trace!(
                document_id = %ticket.document_id(),
                ticket_seq = ticket.seq(),
                "Ignoring repeated resolve"
            );
            return false;
        }

        let document_id = ticket.document_id();
        let mut shard = self.lock_shard(self.shard_index(document_id));
        let is_current = shard
            .get(document_id)
            .is_some_and(|current| Arc::ptr_eq(current, ticket));
        if !is_current {
            return true;
        }

        let ancestor = match outcome {
            TicketOutcome::Abandoned => ticket.pending_ancestor(),
            _ => None,
        };
        match ancestor {
            Some(ancestor) => {
                trace!(
                    document_id = %document_id,
                    ticket_seq = ticket.seq(),
                    restored_seq = ancestor.seq(),
                    "Abandoned ticket handed entry back to ancestor"
                );
                shard.insert(document_id.clone(), ancestor);
            }
            None => {
                shard.remove(document_id);
            }
        }
        true
    }

    /// Current entry for a document, if any.
    pub fn current(&self, document_id: &DocumentId) -> Option<Arc<OrderTicket>> {
        self.lock_shard(self.shard_index(document_id))
            .get(document_id)
            .cloned()
    }

    /// Number of documents that currently have an entry.
    pub fn pending_documents(&self) -> usize {
        (0..self.shards.len())
            .map(|index| self.lock_shard(index).len())
            .sum()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_documents() == 0
    }
}

impl Default for DocumentOrderTracker {
    fn default() -> Self {
        Self::new()
    }
}
