use polars::prelude::*;
use tracing::debug;

use crate::error::{Result, TableError};
use crate::geo;
use crate::table::{ColumnType, Table};
use crate::transform::types::{Aggregation, AggregationPolicy};

/// Collapses `table` to one row per distinct value of the policy key.
///
/// Groups appear in first-appearance order of their key, and the key is
/// the first output column. SUM columns keep their declared type, MEAN
/// columns become floats, FIRST columns keep the first value seen and DROP
/// columns are omitted. Null cells are skipped; a group whose cells are
/// all null aggregates to null rather than zero.
///
/// When the key is `STATECOUNTY` and the table has none yet it is derived
/// from `STATE` and `COUNTY`.
///
/// # Errors
///
/// - [`TableError::MissingColumn`] if the policy names a column the table lacks.
/// - [`TableError::AggregationPolicyGap`] if a numeric column has no policy entry.
/// - [`TableError::AggregationType`] if SUM or MEAN is asked of a text column.
pub fn rollup(table: &Table, policy: &AggregationPolicy) -> Result<Table> {
    let key = policy.key();
    let table = if !table.has_column(key) && key == geo::STATE_COUNTY {
        geo::with_state_county_key(table)?
    } else {
        table.clone()
    };

    table.require(key, "rollup key")?;
    for column in policy.columns() {
        table.require(column, "aggregation policy")?;
    }

    let mut aggs: Vec<Expr> = Vec::new();
    for column in table.columns() {
        if column.name == key {
            continue;
        }
        let aggregation = match policy.get(&column.name) {
            Some(a) => a,
            None if column.kind.is_numeric() => {
                return Err(TableError::AggregationPolicyGap {
                    column: column.name.clone(),
                });
            }
            None => Aggregation::Drop,
        };
        if matches!(aggregation, Aggregation::Sum | Aggregation::Mean) && !column.kind.is_numeric()
        {
            return Err(TableError::AggregationType {
                column: column.name.clone(),
                aggregation: aggregation.label(),
                kind: column.kind.label(),
            });
        }

        let name = column.name.as_str();
        let expr = match aggregation {
            Aggregation::Drop => continue,
            Aggregation::First => col(name).first(),
            // polars sums an all-null group to zero
            Aggregation::Sum => when(col(name).count().gt(lit(0)))
                .then(col(name).sum())
                .otherwise(lit(NULL))
                .cast(column.kind.dtype()),
            Aggregation::Mean => col(name).mean().cast(ColumnType::Float.dtype()),
        };
        aggs.push(expr.alias(name));
    }

    debug!(rows = table.len(), columns = aggs.len(), key, "Rolling up table");

    let out = table
        .lazy()
        .group_by_stable([col(key)])
        .agg(aggs)
        .collect()?;
    Ok(out.into())
}
