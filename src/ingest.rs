//! Conversion of raw string cells into a typed [`Table`].
//!
//! This is the only place sentinel tokens are recognised: once a table has
//! been built, missing data is always [`Value::Null`].

use polars::prelude::{NamedFrom, Series};
use tracing::{debug, warn};

use crate::acs;
use crate::error::{Result, TableError};
use crate::geo;
use crate::parser::RawResponse;
use crate::table::{Column, Table, Value};

/// Whether a raw cell means "no value".
pub fn is_null_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || acs::NULL_TOKENS.contains(&trimmed)
}

/// Converts string rows into values of the declared column types.
///
/// # Errors
///
/// - [`TableError::SchemaMismatch`] for a row of the wrong width.
/// - [`TableError::InvalidValue`] for a numeric cell that does not parse.
pub fn convert_rows<I>(columns: &[Column], rows: I) -> Result<Vec<Vec<Value>>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    rows.into_iter()
        .enumerate()
        .map(|(r, cells)| {
            if cells.len() != columns.len() {
                return Err(TableError::SchemaMismatch {
                    row: r,
                    expected: columns.len(),
                    found: cells.len(),
                });
            }
            cells
                .iter()
                .zip(columns)
                .map(|(raw, column)| convert_cell(raw, column, r))
                .collect()
        })
        .collect()
}

fn convert_cell(raw: &str, column: &Column, row: usize) -> Result<Value> {
    if is_null_token(raw) {
        return Ok(Value::Null);
    }
    Value::parse(raw, column.kind).ok_or_else(|| TableError::InvalidValue {
        column: column.name.clone(),
        row,
        value: raw.to_string(),
        expected: column.kind.label(),
    })
}

fn geography_rank(name: &str) -> usize {
    match name {
        geo::STATE => 0,
        geo::COUNTY => 1,
        geo::TRACT => 2,
        _ => 3,
    }
}

/// Builds the tract-level table for one API response.
///
/// Variable codes are renamed to catalog names, the API's lowercase
/// `state`/`county`/`tract` columns become `STATE`/`COUNTY`/`TRACT` padded
/// to 2/3/6 digits and placed first, and a `Year` column is prepended.
/// Unknown columns are kept as text.
pub fn ingest(raw: &RawResponse, year: u16) -> Result<Table> {
    let mut picked: Vec<(usize, Column)> = Vec::new();

    for (i, code) in raw.header.iter().enumerate() {
        let column = match code.as_str() {
            "state" | "STATE" => Column::text(geo::STATE),
            "county" | "COUNTY" => Column::text(geo::COUNTY),
            "tract" | "TRACT" => Column::text(geo::TRACT),
            other => match acs::variable_by_code(other) {
                Some(v) => Column::new(v.name, v.kind),
                None => {
                    debug!(column = other, "Keeping unrecognised column as text");
                    Column::text(other)
                }
            },
        };
        if picked.iter().any(|(_, c)| c.name == column.name) {
            warn!(column = %column.name, "Duplicate column in response, keeping first");
            continue;
        }
        picked.push((i, column));
    }

    picked.sort_by_key(|(_, c)| geography_rank(&c.name));

    let columns: Vec<Column> = picked.iter().map(|(_, c)| c.clone()).collect();
    let width = raw.header.len();

    let cells = raw
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            if row.len() != width {
                return Err(TableError::SchemaMismatch {
                    row: r,
                    expected: width,
                    found: row.len(),
                });
            }
            Ok(picked.iter().map(|(i, _)| row[*i].clone()).collect())
        })
        .collect::<Result<Vec<Vec<String>>>>()?;

    let rows = convert_rows(&columns, cells)?;
    let table = geo::normalize_columns(&Table::from_rows(columns, rows)?)?;

    let years = Series::new(acs::YEAR.into(), vec![i64::from(year); table.len()]);
    table.with_series_at(0, years)
}
