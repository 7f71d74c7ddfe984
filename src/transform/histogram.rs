use polars::prelude::{DataType, NamedFrom, Series};

use crate::error::Result;
use crate::table::Table;

/// Income bin edges: 4,000 to 88,000 in steps of 7,000 (12 intervals).
pub const INCOME_EDGES: [f64; 13] = [
    4000.0, 11000.0, 18000.0, 25000.0, 32000.0, 39000.0, 46000.0, 53000.0, 60000.0, 67000.0,
    74000.0, 81000.0, 88000.0,
];

pub const BUCKET: &str = "bucket";
pub const BUCKET_IDX: &str = "bucket_idx";
pub const MIDPOINT: &str = "midpoint";

/// The interval a value falls into.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// 1-based ordinal of the interval.
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Bucket {
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Interval label in `(lower, upper]` form.
    pub fn label(&self) -> String {
        format!("({}, {}]", self.lower, self.upper)
    }
}

/// Places `value` into the right-closed interval `(edges[i-1], edges[i]]`.
///
/// | value               | result     |
/// |---------------------|------------|
/// | `<= edges[0]`       | `None`     |
/// | `> edges[last]`     | `None`     |
/// | `(e[i-1], e[i]]`    | index `i`  |
pub fn assign(value: f64, edges: &[f64]) -> Option<Bucket> {
    if !value.is_finite() {
        return None;
    }
    edges
        .windows(2)
        .position(|w| value > w[0] && value <= w[1])
        .map(|i| Bucket {
            index: i + 1,
            lower: edges[i],
            upper: edges[i + 1],
        })
}

/// Appends `bucket`, `bucket_idx` and `midpoint` columns computed from
/// `column`. Rows with a null or out-of-range value get nulls.
pub fn with_buckets(table: &Table, column: &str, edges: &[f64]) -> Result<Table> {
    table.require(column, "histogram")?;

    let values = table.df().column(column)?.cast(&DataType::Float64)?;
    let buckets: Vec<Option<Bucket>> = values
        .f64()?
        .into_iter()
        .map(|v| v.and_then(|v| assign(v, edges)))
        .collect();

    let labels: Vec<Option<String>> = buckets.iter().map(|b| b.as_ref().map(Bucket::label)).collect();
    let indices: Vec<Option<i64>> = buckets
        .iter()
        .map(|b| b.as_ref().map(|b| b.index as i64))
        .collect();
    let midpoints: Vec<Option<f64>> = buckets.iter().map(|b| b.as_ref().map(Bucket::midpoint)).collect();

    table
        .clone()
        .with_series(Series::new(BUCKET.into(), labels))?
        .with_series(Series::new(BUCKET_IDX.into(), indices))?
        .with_series(Series::new(MIDPOINT.into(), midpoints))
}
