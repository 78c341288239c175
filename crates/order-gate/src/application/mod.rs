//! Application layer: the ordering gate service

mod guard;
pub mod service;

pub use service::OrderingGate;
