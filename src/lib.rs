pub mod acs;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod geometry;
pub mod infra;
pub mod ingest;
pub mod output;
pub mod parser;
pub mod services;
pub mod table;
pub mod transform;
