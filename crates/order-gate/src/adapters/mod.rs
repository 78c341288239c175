//! Adapters for the ordering gate
//!
//! - `resolver`: document resolution for the built-in [`Transaction`](crate::Transaction)
//! - `broadcast`: in-memory fan-out of released batches to subscribers

pub mod broadcast;
pub mod resolver;

pub use broadcast::{BatchSubscription, BroadcastCoordinator, SubscriptionError};
pub use resolver::EmbeddedDocumentResolver;
