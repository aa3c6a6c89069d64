//! Shared test utilities for recordkeeper integration tests.
//!
//! This module provides:
//! - `TestHarness` with a seeded, file-backed database in a temp directory
//! - Builders for records and disposal requests

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
