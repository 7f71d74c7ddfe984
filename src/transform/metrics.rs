use polars::prelude::*;
use tracing::debug;

use crate::acs;
use crate::error::Result;
use crate::table::Table;
use crate::transform::histogram::{INCOME_EDGES, with_buckets};
use crate::transform::types::{MetricDef, MetricOp};

/// The demographic ratio metrics derived for every exported table.
pub fn acs_metrics() -> Vec<MetricDef> {
    vec![
        MetricDef::passthrough("N_BLACK", acs::N_RACE_BLACK),
        MetricDef::ratio("PCT_BLACK", &[acs::N_RACE_BLACK], &[acs::N_RACE_TOTAL_POP]),
        MetricDef::difference("N_NOT_WHITE", acs::N_RACE_TOTAL_POP, acs::N_RACE_WHITE),
        MetricDef::ratio_of_difference(
            "PCT_NOT_WHITE",
            acs::N_RACE_TOTAL_POP,
            acs::N_RACE_WHITE,
            &[acs::N_RACE_TOTAL_POP],
        ),
        MetricDef::difference("N_UNINSURED", acs::N_TOTAL_POP, acs::N_INSURED_NON_INST),
        MetricDef::ratio_of_difference(
            "PCT_UNINSURED",
            acs::N_TOTAL_POP,
            acs::N_INSURED_NON_INST,
            &[acs::N_TOTAL_POP],
        ),
        MetricDef::passthrough("N_POVERTY_STAT", acs::N_POVERTY_BELOW_100),
        MetricDef::ratio(
            "PCT_POVERTY_STAT",
            &[acs::N_POVERTY_BELOW_100],
            &[acs::N_POVERTY_STAT],
        ),
        MetricDef::passthrough("N_DISABIL_STAT", acs::N_DISABIL_Y),
        MetricDef::ratio(
            "PCT_DISABIL_STAT",
            &[acs::N_DISABIL_Y],
            &[acs::N_DISABIL_Y, acs::N_DISABIL_N],
        ),
    ]
}

/// Appends one column per definition.
///
/// All input columns are checked before anything is computed, so a
/// missing column never yields a half-derived table. Any null operand, and
/// any zero denominator, gives a null cell. Every metric reads the input
/// table, never another metric.
pub fn derive_metrics(table: &Table, defs: &[MetricDef]) -> Result<Table> {
    for def in defs {
        for input in def.op.inputs() {
            table.require(input, &format!("metric {}", def.name))?;
        }
    }

    let kind_of = |name: &str| table.column(name).map(|c| c.kind);
    let exprs: Vec<Expr> = defs
        .iter()
        .map(|def| {
            let kind = def.op.output_kind(kind_of);
            expression(&def.op).cast(kind.dtype()).alias(def.name.as_str())
        })
        .collect();

    let out = table.lazy().with_columns(exprs).collect()?;

    debug!(metrics = defs.len(), rows = table.len(), "Derived metrics");
    Ok(out.into())
}

/// Applies [`acs_metrics`] and the income histogram.
pub fn derive_acs(table: &Table) -> Result<Table> {
    let out = derive_metrics(table, &acs_metrics())?;
    with_buckets(&out, acs::MED_INCOME, &INCOME_EDGES)
}

fn num(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

// null if any addend is null
fn total(names: &[String]) -> Expr {
    names
        .iter()
        .map(|n| num(n))
        .reduce(|acc, e| acc + e)
        .unwrap_or_else(|| lit(NULL).cast(DataType::Float64))
}

fn ratio(numerator: Expr, denominator: Expr) -> Expr {
    when(denominator.clone().eq(lit(0.0)))
        .then(lit(NULL))
        .otherwise(numerator / denominator)
}

fn expression(op: &MetricOp) -> Expr {
    match op {
        MetricOp::Passthrough(column) => col(column.as_str()),
        MetricOp::Ratio {
            numerator,
            denominator,
        } => ratio(total(numerator), total(denominator)),
        MetricOp::Difference {
            minuend,
            subtrahend,
        } => num(minuend) - num(subtrahend),
        MetricOp::RatioOfDifference {
            minuend,
            subtrahend,
            denominator,
        } => ratio(num(minuend) - num(subtrahend), total(denominator)),
    }
}
