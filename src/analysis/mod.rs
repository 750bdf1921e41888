//! Offline analysis of persisted response records.

pub mod aggregator;

pub use aggregator::{aggregate_store, collect};
