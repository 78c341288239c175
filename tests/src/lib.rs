//! # Order Gate Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs    # Interleavings on one and several documents
//!     ├── properties.rs   # Randomized load checked against the ordering invariants
//!     └── broadcast.rs    # Gate + BroadcastCoordinator + telemetry end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gate-tests
//! cargo test -p gate-tests integration::scenarios::
//! ```

#![allow(dead_code)]

pub mod integration;
