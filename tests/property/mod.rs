//! Property-based tests.
//!
//! These use proptest to generate call sequences and verify that breaker
//! counting and endpoint selection hold for every input.

pub mod selection;
