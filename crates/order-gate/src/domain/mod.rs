//! Domain module for the ordering gate
//!
//! Contains value objects, transactions and batches, order tickets, the
//! document order tracker, and the checkable ordering invariants.

pub mod entities;
pub mod invariants;
pub mod ticket;
pub mod tracker;
pub mod value_objects;

pub use entities::*;
pub use ticket::OrderTicket;
pub use tracker::{DocumentOrderTracker, Registration, DEFAULT_SHARD_COUNT};
pub use value_objects::*;
