//! Canonical fixed-width geographic identifiers.

use polars::prelude::{DataType, NamedFrom, Series, col, concat_str};

use crate::error::{Result, TableError};
use crate::table::Table;

pub const STATE: &str = "STATE";
pub const COUNTY: &str = "COUNTY";
pub const TRACT: &str = "TRACT";
pub const STATE_COUNTY: &str = "STATECOUNTY";

pub const STATE_WIDTH: usize = 2;
pub const COUNTY_WIDTH: usize = 3;
pub const TRACT_WIDTH: usize = 6;

/// Left-pads a numeric identifier with zeros to exactly `width` digits.
///
/// Leading zeros already present are not counted against the width, so
/// `"0017"` still fits a 2-digit state code. Anything that is not a plain
/// run of digits, or needs more than `width` significant digits, is a
/// [`TableError::Format`].
pub fn pad_code(field: &str, raw: &str, width: usize) -> Result<String> {
    let trimmed = raw.trim();
    let fail = || TableError::Format {
        field: field.to_string(),
        value: raw.to_string(),
        width,
    };

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail());
    }

    let significant = trimmed.trim_start_matches('0');
    if significant.len() > width {
        return Err(fail());
    }

    Ok(format!("{significant:0>width$}"))
}

pub fn state_code(raw: &str) -> Result<String> {
    pad_code(STATE, raw, STATE_WIDTH)
}

pub fn county_code(raw: &str) -> Result<String> {
    pad_code(COUNTY, raw, COUNTY_WIDTH)
}

pub fn tract_code(raw: &str) -> Result<String> {
    pad_code(TRACT, raw, TRACT_WIDTH)
}

fn pad_column(table: Table, name: &str, width: usize) -> Result<Table> {
    let text = table.df().column(name)?.cast(&DataType::String)?;
    let padded = text
        .str()?
        .into_iter()
        .map(|raw| raw.map(|raw| pad_code(name, raw, width)).transpose())
        .collect::<Result<Vec<Option<String>>>>()?;
    table.with_series(Series::new(name.into(), padded))
}

/// Re-pads every geography column present in `table` into a text column.
///
/// Columns that are absent are skipped; null identifiers stay null.
pub fn normalize_columns(table: &Table) -> Result<Table> {
    let mut out = table.clone();
    for (name, width) in [
        (STATE, STATE_WIDTH),
        (COUNTY, COUNTY_WIDTH),
        (TRACT, TRACT_WIDTH),
    ] {
        if out.has_column(name) {
            out = pad_column(out, name, width)?;
        }
    }
    Ok(out)
}

/// Adds `STATECOUNTY` built from `STATE` and `COUNTY` when it is missing.
///
/// A row with either part null gets a null key.
pub fn with_state_county_key(table: &Table) -> Result<Table> {
    if table.has_column(STATE_COUNTY) {
        return Ok(table.clone());
    }
    table.require(STATE, "state-county key")?;
    table.require(COUNTY, "state-county key")?;

    let padded = pad_column(pad_column(table.clone(), STATE, STATE_WIDTH)?, COUNTY, COUNTY_WIDTH)?;
    let keyed = padded
        .lazy()
        .with_column(concat_str([col(STATE), col(COUNTY)], "", false).alias(STATE_COUNTY))
        .collect()?;
    Ok(keyed.into())
}
