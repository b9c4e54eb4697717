//! Tests for the sluice-engine crate.

mod helpers;

mod concurrency;
mod edge_cases;
