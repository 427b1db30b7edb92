//! Shared test utilities for scanmerge integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories and an on-disk store
//! - Builders for configurations and work-list rows

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
