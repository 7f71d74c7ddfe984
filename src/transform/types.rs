//! Declarations consumed by the transformation stages.

use crate::table::ColumnType;

/// How a column is combined when rows are rolled up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Drop,
    First,
}

impl Aggregation {
    pub fn label(self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Mean => "MEAN",
            Aggregation::Drop => "DROP",
            Aggregation::First => "FIRST",
        }
    }
}

/// Per-column aggregation policy for a rollup, plus the grouping key.
///
/// Every numeric column of a rolled-up table must have an entry. Text
/// columns without one are dropped.
#[derive(Debug, Clone)]
pub struct AggregationPolicy {
    pub(crate) key: String,
    pub(crate) entries: Vec<(String, Aggregation)>,
}

impl AggregationPolicy {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, column: impl Into<String>, aggregation: Aggregation) -> Self {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = aggregation,
            None => self.entries.push((column, aggregation)),
        }
        self
    }

    pub fn with_all<'a>(
        mut self,
        columns: impl IntoIterator<Item = &'a str>,
        aggregation: Aggregation,
    ) -> Self {
        for column in columns {
            self = self.with(column, aggregation);
        }
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self, column: &str) -> Option<Aggregation> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, a)| *a)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }
}

/// Arithmetic used to derive one metric column.
///
/// Column lists are summed before the operation is applied, so
/// `Ratio { numerator: [a], denominator: [a, b] }` is `a / (a + b)`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOp {
    Passthrough(String),
    Ratio {
        numerator: Vec<String>,
        denominator: Vec<String>,
    },
    Difference {
        minuend: String,
        subtrahend: String,
    },
    RatioOfDifference {
        minuend: String,
        subtrahend: String,
        denominator: Vec<String>,
    },
}

impl MetricOp {
    /// Every input column the operation reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            MetricOp::Passthrough(c) => vec![c.as_str()],
            MetricOp::Ratio {
                numerator,
                denominator,
            } => numerator
                .iter()
                .chain(denominator)
                .map(String::as_str)
                .collect(),
            MetricOp::Difference {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
            MetricOp::RatioOfDifference {
                minuend,
                subtrahend,
                denominator,
            } => [minuend, subtrahend]
                .into_iter()
                .chain(denominator)
                .map(String::as_str)
                .collect(),
        }
    }

    /// Output type given the types of the input columns.
    pub fn output_kind<F>(&self, kind_of: F) -> ColumnType
    where
        F: Fn(&str) -> Option<ColumnType>,
    {
        let all_integer = || {
            self.inputs()
                .into_iter()
                .all(|c| kind_of(c) == Some(ColumnType::Integer))
        };
        match self {
            MetricOp::Passthrough(c) => kind_of(c).unwrap_or(ColumnType::Float),
            MetricOp::Difference { .. } if all_integer() => ColumnType::Integer,
            _ => ColumnType::Float,
        }
    }
}

/// A derived column: output name plus how to compute it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDef {
    pub name: String,
    pub op: MetricOp,
}

impl MetricDef {
    pub fn passthrough(name: &str, column: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MetricOp::Passthrough(column.to_string()),
        }
    }

    pub fn ratio(name: &str, numerator: &[&str], denominator: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            op: MetricOp::Ratio {
                numerator: numerator.iter().map(|c| c.to_string()).collect(),
                denominator: denominator.iter().map(|c| c.to_string()).collect(),
            },
        }
    }

    pub fn difference(name: &str, minuend: &str, subtrahend: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MetricOp::Difference {
                minuend: minuend.to_string(),
                subtrahend: subtrahend.to_string(),
            },
        }
    }

    pub fn ratio_of_difference(
        name: &str,
        minuend: &str,
        subtrahend: &str,
        denominator: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            op: MetricOp::RatioOfDifference {
                minuend: minuend.to_string(),
                subtrahend: subtrahend.to_string(),
                denominator: denominator.iter().map(|c| c.to_string()).collect(),
            },
        }
    }
}
