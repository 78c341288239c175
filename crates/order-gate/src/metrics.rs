//! Gate metrics
//!
//! Thread-safe counters updated on the submit path. Export is left to the
//! caller (see the `gate-telemetry` crate); this module only counts.

use crate::domain::value_objects::TicketOutcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct GateMetrics {
    /// Batches passed to `submit`
    pub batches_submitted: AtomicU64,
    /// Transactions across all submitted batches
    pub transactions_submitted: AtomicU64,
    /// Transactions with no document target
    pub transactions_bypassed: AtomicU64,
    /// Batches that had to wait on at least one earlier batch
    pub batches_waited: AtomicU64,
    /// Cumulative wait time in nanoseconds
    pub wait_time_ns: AtomicU64,
    /// Batches whose downstream call returned `Ok`
    pub batches_completed: AtomicU64,
    /// Batches whose downstream call returned `Err`, panicked or was dropped
    pub batches_failed: AtomicU64,
    /// Batches dropped before reaching downstream
    pub batches_abandoned: AtomicU64,
}

impl GateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self, transactions: usize, bypassed: usize) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.transactions_submitted
            .fetch_add(transactions as u64, Ordering::Relaxed);
        self.transactions_bypassed
            .fetch_add(bypassed as u64, Ordering::Relaxed);
    }

    pub fn record_wait(&self, waited: Duration) {
        self.batches_waited.fetch_add(1, Ordering::Relaxed);
        self.wait_time_ns
            .fetch_add(waited.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: TicketOutcome) {
        let counter = match outcome {
            TicketOutcome::Completed => &self.batches_completed,
            TicketOutcome::Failed => &self.batches_failed,
            TicketOutcome::Abandoned => &self.batches_abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GateMetricsSnapshot {
        GateMetricsSnapshot {
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            transactions_submitted: self.transactions_submitted.load(Ordering::Relaxed),
            transactions_bypassed: self.transactions_bypassed.load(Ordering::Relaxed),
            batches_waited: self.batches_waited.load(Ordering::Relaxed),
            wait_time_ns: self.wait_time_ns.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            batches_abandoned: self.batches_abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`GateMetrics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateMetricsSnapshot {
    pub batches_submitted: u64,
    pub transactions_submitted: u64,
    pub transactions_bypassed: u64,
    pub batches_waited: u64,
    pub wait_time_ns: u64,
    pub batches_completed: u64,
    pub batches_failed: u64,
    pub batches_abandoned: u64,
}

impl GateMetricsSnapshot {
    /// Batches admitted but not yet settled
    pub fn batches_in_flight(&self) -> u64 {
        self.batches_submitted.saturating_sub(
            self.batches_completed + self.batches_failed + self.batches_abandoned,
        )
    }

    /// Mean wait among batches that waited at all
    pub fn average_wait(&self) -> Duration {
        if self.batches_waited == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.wait_time_ns / self.batches_waited)
    }
}
