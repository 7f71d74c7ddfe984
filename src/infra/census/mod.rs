mod client;

pub use client::CensusClient;
