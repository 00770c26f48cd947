//! Tests that run the querydock binary.

mod common;
pub mod run_test;
