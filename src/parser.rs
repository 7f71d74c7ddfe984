//! JSON parser for Census Data API responses.

use anyhow::{Result, bail};
use serde_json::Value as Json;

/// Header plus rows of raw string cells, exactly as returned by the API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Decodes an API body: a JSON array of arrays whose first row is the header.
///
/// Cells may be strings, numbers or `null`; numbers keep their JSON text and
/// `null` becomes an empty string.
///
/// # Errors
///
/// Returns an error if the body is not JSON, not an array of arrays, or
/// has no header row.
pub fn parse_response(bytes: &[u8]) -> Result<RawResponse> {
    let json: Vec<Vec<Json>> = serde_json::from_slice(bytes)?;
    let mut rows = json.into_iter();

    let Some(header) = rows.next() else {
        bail!("response has no header row");
    };

    let header = header.iter().map(cell).collect();
    let rows = rows.map(|r| r.iter().map(cell).collect()).collect();

    Ok(RawResponse { header, rows })
}

fn cell(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}
