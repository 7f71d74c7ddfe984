//! Table transformations: rollup, metric derivation, filtering and joins.
//!
//! Every stage takes a table by reference and returns a new one. The
//! [`pipeline`] module wires them to the file store and the data source.

pub mod filter;
pub mod histogram;
pub mod join;
pub mod metrics;
pub mod pipeline;
pub mod rollup;
pub mod types;
