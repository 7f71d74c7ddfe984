use std::collections::{HashMap, HashSet};

use polars::prelude::{BooleanChunked, NamedFrom, Series};
use tracing::debug;

use crate::config::MetroArea;
use crate::error::Result;
use crate::geo;
use crate::table::Table;

pub const COUNTY_NAME: &str = "COUNTY_NAME";

/// Keeps rows whose `STATECOUNTY` key is in `allow`, in their original order.
///
/// The key is derived from `STATE` and `COUNTY` when the table has none.
pub fn retain_keys(table: &Table, allow: &HashSet<String>) -> Result<Table> {
    let keyed = geo::with_state_county_key(table)?;
    keyed.require(geo::STATE_COUNTY, "membership filter")?;

    let mask: BooleanChunked = keyed
        .df()
        .column(geo::STATE_COUNTY)?
        .str()?
        .into_iter()
        .map(|k| k.is_some_and(|k| allow.contains(k)))
        .collect();
    let out: Table = keyed.df().filter(&mask)?.into();

    debug!(rows_in = table.len(), rows_out = out.len(), "Filtered by key");
    Ok(out)
}

/// Adds `COUNTY_NAME` looked up from each row's `STATECOUNTY` key.
pub fn label_counties(table: &Table, names: &HashMap<String, String>) -> Result<Table> {
    let keyed = geo::with_state_county_key(table)?;
    keyed.require(geo::STATE_COUNTY, "county labels")?;

    let labels: Vec<Option<String>> = keyed
        .df()
        .column(geo::STATE_COUNTY)?
        .str()?
        .into_iter()
        .map(|k| k.and_then(|k| names.get(k)).cloned())
        .collect();

    keyed.with_series(Series::new(COUNTY_NAME.into(), labels))
}

/// Restricts `table` to the counties of `metro` and labels each row.
pub fn filter_to_metro(table: &Table, metro: &MetroArea) -> Result<Table> {
    let filtered = retain_keys(table, &metro.keys())?;
    label_counties(&filtered, &metro.names())
}
