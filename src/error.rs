//! Error types for table transformations.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Failure raised by a transformation stage.
///
/// Every variant names the column (or field) that caused it so the caller
/// can report it without inspecting the table.
#[derive(Error, Debug)]
pub enum TableError {
    /// A geographic identifier does not fit its fixed width.
    #[error("{field} value '{value}' does not fit in {width} digits")]
    Format {
        field: String,
        value: String,
        width: usize,
    },

    /// A policy, metric or join references a column the table does not have.
    #[error("column '{column}' required by {context} is missing")]
    MissingColumn { column: String, context: String },

    /// A numeric column has no entry in the aggregation policy.
    #[error("numeric column '{column}' has no aggregation policy")]
    AggregationPolicyGap { column: String },

    /// The policy asks for a numeric aggregation of a non-numeric column.
    #[error("cannot apply {aggregation} to {kind} column '{column}'")]
    AggregationType {
        column: String,
        aggregation: &'static str,
        kind: &'static str,
    },

    /// A value could not be parsed into its declared column type.
    #[error("row {row}: column '{column}' expected {expected}, found '{value}'")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    /// A row does not have as many cells as the header.
    #[error("row {row}: expected {expected} cells, found {found}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A new column does not have one value per row.
    #[error("column '{column}' has {found} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl TableError {
    pub fn missing(column: &str, context: impl Into<String>) -> Self {
        TableError::MissingColumn {
            column: column.to_string(),
            context: context.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TableError>;
