//! Cross-component tests for the order gate.

mod properties;
pub mod support;
