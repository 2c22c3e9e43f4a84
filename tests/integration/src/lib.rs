//! End-to-end helpers for the hydra API
//!
//! Tests run against an in-process server on an ephemeral port, backed by the
//! in-memory stores, so no database or Redis is needed.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
