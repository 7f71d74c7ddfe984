use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::parser::{RawResponse, parse_response};
use crate::services::data_source::DataSource;

const BASE_URL: &str = "https://api.census.gov/data";

/// Client for the ACS 5-year subject tables of the Census Data API.
pub struct CensusClient<C> {
    http: C,
    year: u16,
}

impl<C: HttpClient> CensusClient<C> {
    pub fn new(http: C, year: u16) -> Self {
        Self { http, year }
    }

    /// `…/{year}/acs/acs5/subject?get=A,B&for=tract:*&in=state:SS`
    pub fn query_url(&self, state: &str, variables: &[&str]) -> Result<reqwest::Url> {
        let endpoint = format!("{BASE_URL}/{}/acs/acs5/subject", self.year);
        let url = reqwest::Url::parse_with_params(
            &endpoint,
            &[
                ("get", variables.join(",")),
                ("for", "tract:*".to_string()),
                ("in", format!("state:{state}")),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> DataSource for CensusClient<C> {
    #[tracing::instrument(skip(self, variables), fields(year = self.year, variables = variables.len()))]
    async fn fetch_state(&self, state: &str, variables: &[&str]) -> Result<Option<RawResponse>> {
        let url = self.query_url(state, variables)?;
        info!(url = %url, "Contacting census API");

        let (status, body) = fetch_bytes(&self.http, url.as_str())
            .await
            .with_context(|| format!("census request for state {state} failed"))?;
        info!(status = status.as_u16(), bytes = body.len(), "Census API response");

        if !status.is_success() || body.is_empty() {
            warn!(
                state,
                status = status.as_u16(),
                "No data for state scope, skipping"
            );
            return Ok(None);
        }

        let raw = parse_response(&body)
            .with_context(|| format!("decoding census response for state {state}"))?;
        Ok(Some(raw))
    }
}
