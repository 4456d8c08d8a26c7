//! Shared helpers for integration tests.

pub mod live_harness;
