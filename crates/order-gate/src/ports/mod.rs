//! Ports module for the ordering gate
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::OrderingGateApi;
pub use outbound::{BatchProcessor, DocumentIdResolver};
