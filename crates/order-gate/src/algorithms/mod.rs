//! Algorithms module for the ordering gate
//!
//! Contains:
//! - Batch partitioning by document

pub mod partition;

pub use partition::{partition_batch, BatchPartition};
