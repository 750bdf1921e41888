//! Table rendering and parsing.
//!
//! Response records and aggregate tables share one CSV layout.

pub mod csv;

pub use csv::{parse_table, render_aggregate, render_response_record};
