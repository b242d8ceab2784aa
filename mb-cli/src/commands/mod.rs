//! CLI command implementations.

pub mod run_test;
pub mod wait;
