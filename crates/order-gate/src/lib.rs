//! # Order Gate: Per-Document Transaction Ordering
//!
//! Admission control in the mutation pipeline. Transactions finish
//! asynchronous processing with variable latency; without a gate, two batches
//! for the same document can reach broadcast in the wrong order and clients
//! that check "is this update newer than mine" re-fetch needlessly.
//!
//! The gate keeps a pending ticket per document. A new batch registers a
//! ticket for each document it touches, waits for the previous tickets to
//! settle, runs downstream, then settles its own tickets, even on error,
//! panic or cancellation.
//!
//! ## Architecture
//!
//! - **Domain**: value objects, transactions/batches, `OrderTicket`, `DocumentOrderTracker`
//! - **Algorithms**: batch partitioning by document
//! - **Ports**: Inbound (`OrderingGateApi`) and Outbound (`BatchProcessor`, `DocumentIdResolver`)
//! - **Application**: `OrderingGate` service and its ticket guard
//! - **Adapters**: embedded document resolver, in-memory `BroadcastCoordinator`
//!
//! ## Guarantees
//!
//! - Per-document FIFO by `submit` call order (never by timestamp)
//! - No ordering across documents; disjoint batches run in parallel
//! - A batch's transactions are released together as one batch

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;

pub use adapters::{BatchSubscription, BroadcastCoordinator, EmbeddedDocumentResolver};
pub use application::service::OrderingGate;
pub use config::{ConfigError, GateConfig};
pub use domain::entities::*;
pub use domain::ticket::OrderTicket;
pub use domain::tracker::{DocumentOrderTracker, Registration};
pub use domain::value_objects::*;
pub use metrics::{GateMetrics, GateMetricsSnapshot};
pub use ports::inbound::OrderingGateApi;
pub use ports::outbound::{BatchProcessor, DocumentIdResolver};
