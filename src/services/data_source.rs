//! Trait for the remote source of tract-level survey rows.

use anyhow::Result;

use crate::parser::RawResponse;

/// Abstraction over a provider of survey estimates (e.g. the Census Data API).
#[async_trait::async_trait]
pub trait DataSource {
    /// Returns every tract of `state` with the requested variables.
    ///
    /// `Ok(None)` means the provider has no data for that scope (non-success
    /// status); the caller skips it and carries on with the next one.
    async fn fetch_state(&self, state: &str, variables: &[&str]) -> Result<Option<RawResponse>>;
}
