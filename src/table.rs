//! Record table backed by a polars [`DataFrame`].
//!
//! Column types are declared once (see [`crate::acs::schema`]) and values
//! are converted at ingestion, so transformation stages only ever see
//! nulls for missing data, never a sentinel token. [`Value`] is the owned
//! view of a single cell, used at the edges (tests, logging, lookups).

use std::collections::HashMap;
use std::fmt;

use polars::prelude::{AnyValue, DataFrame, DataType, IntoLazy, LazyFrame, NamedFrom, Series};
use serde::Serialize;

use crate::error::{Result, TableError};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
        }
    }

    /// Storage type of the column.
    pub fn dtype(self) -> DataType {
        match self {
            ColumnType::Text => DataType::String,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
        }
    }

    pub fn from_dtype(dtype: &DataType) -> Self {
        if dtype.is_integer() {
            ColumnType::Integer
        } else if dtype.is_float() {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Text and null cells have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Parses a raw (already null-substituted) string into `kind`.
    ///
    /// Integer columns accept `"12.0"` since upstream exports write whole
    /// numbers with a trailing fraction, but never a value outside `i64`.
    pub fn parse(raw: &str, kind: ColumnType) -> Option<Value> {
        match kind {
            ColumnType::Text => Some(Value::Text(raw.to_string())),
            ColumnType::Integer => {
                let raw = raw.trim();
                if let Ok(v) = raw.parse::<i64>() {
                    return Some(Value::Int(v));
                }
                match raw.parse::<f64>() {
                    Ok(v) if v.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&v) => {
                        Some(Value::Int(v as i64))
                    }
                    _ => None,
                }
            }
            ColumnType::Float => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Some(Value::Float(v)),
                _ => None,
            },
        }
    }

    fn from_any(value: AnyValue<'_>) -> Value {
        match value {
            AnyValue::Null => Value::Null,
            AnyValue::String(s) => Value::Text(s.to_string()),
            AnyValue::StringOwned(s) => Value::Text(s.to_string()),
            other => match ColumnType::from_dtype(&other.dtype()) {
                ColumnType::Integer => other.extract::<i64>().map_or(Value::Null, Value::Int),
                ColumnType::Float => other.extract::<f64>().map_or(Value::Null, Value::Float),
                ColumnType::Text => Value::Text(other.to_string()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(v) => f.write_str(v),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Null => Ok(()),
        }
    }
}

/// Column name plus declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float)
    }

    /// Builds the typed series for this column from owned cells.
    ///
    /// Cells must match the declared type; nulls are allowed anywhere.
    pub fn series(&self, values: Vec<Value>) -> Result<Series> {
        let mismatch = |row: usize, value: &Value| TableError::InvalidValue {
            column: self.name.clone(),
            row,
            value: value.to_string(),
            expected: self.kind.label(),
        };
        let name = self.name.as_str().into();

        let series = match self.kind {
            ColumnType::Text => Series::new(
                name,
                values
                    .into_iter()
                    .enumerate()
                    .map(|(r, v)| match v {
                        Value::Text(s) => Ok(Some(s)),
                        Value::Null => Ok(None),
                        other => Err(mismatch(r, &other)),
                    })
                    .collect::<Result<Vec<Option<String>>>>()?,
            ),
            ColumnType::Integer => Series::new(
                name,
                values
                    .iter()
                    .enumerate()
                    .map(|(r, v)| match v {
                        Value::Int(i) => Ok(Some(*i)),
                        Value::Null => Ok(None),
                        other => Err(mismatch(r, other)),
                    })
                    .collect::<Result<Vec<Option<i64>>>>()?,
            ),
            ColumnType::Float => Series::new(
                name,
                values
                    .iter()
                    .enumerate()
                    .map(|(r, v)| match v {
                        Value::Null => Ok(None),
                        Value::Float(_) | Value::Int(_) => Ok(v.as_f64()),
                        other => Err(mismatch(r, other)),
                    })
                    .collect::<Result<Vec<Option<f64>>>>()?,
            ),
        };
        Ok(series)
    }
}

/// Declared column types, consulted whenever text is turned into a table.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    kinds: HashMap<String, ColumnType>,
}

impl Schema {
    pub fn declare(&mut self, name: impl Into<String>, kind: ColumnType) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnType> {
        self.kinds.get(name).copied()
    }

    /// Declared type, falling back to text for undeclared columns.
    pub fn kind_or_text(&self, name: &str) -> ColumnType {
        self.kind_of(name).unwrap_or(ColumnType::Text)
    }

    /// Typed columns for a header, in header order.
    pub fn columns<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<Column> {
        names
            .into_iter()
            .map(|name| Column::new(name, self.kind_or_text(name)))
            .collect()
    }
}

/// Ordered rows over a fixed, typed column set.
#[derive(Debug, Clone, Default)]
pub struct Table(DataFrame);

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals_missing(&other.0)
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Table(df)
    }
}

impl Table {
    /// Builds a table from row-major cells, rejecting ragged rows.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::SchemaMismatch {
                    row: r,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            for (c, value) in row.into_iter().enumerate() {
                cells[c].push(value);
            }
        }

        let series = columns
            .iter()
            .zip(cells)
            .map(|(column, values)| column.series(values).map(Into::into))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table(DataFrame::new(series)?))
    }

    pub fn df(&self) -> &DataFrame {
        &self.0
    }

    pub fn into_df(self) -> DataFrame {
        self.0
    }

    pub fn lazy(&self) -> LazyFrame {
        self.0.clone().lazy()
    }

    pub fn columns(&self) -> Vec<Column> {
        self.0
            .get_columns()
            .iter()
            .map(|c| Column::new(c.name().as_str(), ColumnType::from_dtype(c.dtype())))
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.0
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<Column> {
        self.0
            .column(name)
            .ok()
            .map(|c| Column::new(name, ColumnType::from_dtype(c.dtype())))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.0.get_column_index(name).is_some()
    }

    /// Fails with [`TableError::MissingColumn`] naming `context` when `name` is absent.
    pub fn require(&self, name: &str, context: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(TableError::missing(name, context))
        }
    }

    pub fn len(&self) -> usize {
        self.0.height()
    }

    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }

    /// Owned copy of one cell.
    pub fn get(&self, row: usize, column: &str) -> Option<Value> {
        if row >= self.len() {
            return None;
        }
        let column = self.0.column(column).ok()?;
        column.get(row).ok().map(Value::from_any)
    }

    /// Returns a new table with `series` set.
    ///
    /// An existing column of the same name is replaced in place; otherwise
    /// the column is appended.
    pub fn with_series(mut self, series: Series) -> Result<Self> {
        self.check_length(&series)?;
        self.0.with_column(series)?;
        Ok(self)
    }

    /// Returns a new table with `series` inserted at `position`, or
    /// replacing the column of the same name where it stands.
    pub fn with_series_at(mut self, position: usize, series: Series) -> Result<Self> {
        if self.has_column(series.name().as_str()) {
            return self.with_series(series);
        }
        self.check_length(&series)?;
        let position = position.min(self.0.width());
        self.0.insert_column(position, series)?;
        Ok(self)
    }

    fn check_length(&self, series: &Series) -> Result<()> {
        if self.0.width() > 0 && series.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: series.name().to_string(),
                expected: self.len(),
                found: series.len(),
            });
        }
        Ok(())
    }

    /// Stacks tables vertically, aligning columns by name to the first table.
    pub fn concat(tables: &[Table]) -> Result<Self> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };
        let names = first.column_names();
        let mut out = first.0.clone();
        for table in &tables[1..] {
            for name in &names {
                table.require(name, "concat")?;
            }
            out.vstack_mut(&table.0.select(names.iter().map(String::as_str))?)?;
        }
        Ok(Table(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec![Column::text("STATE"), Column::integer("N")],
            vec![
                vec![Value::Text("17".into()), Value::Int(1)],
                vec![Value::Text("29".into()), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_integer_accepts_trailing_fraction() {
        assert_eq!(Value::parse("12.0", ColumnType::Integer), Some(Value::Int(12)));
        assert_eq!(Value::parse("12", ColumnType::Integer), Some(Value::Int(12)));
        assert_eq!(Value::parse("12.5", ColumnType::Integer), None);
        assert_eq!(Value::parse("abc", ColumnType::Float), None);
    }

    #[test]
    fn test_parse_integer_rejects_out_of_range() {
        assert_eq!(Value::parse("1e30", ColumnType::Integer), None);
        assert_eq!(Value::parse("-1e19", ColumnType::Integer), None);
        assert_eq!(Value::parse("9223372036854775808.0", ColumnType::Integer), None);
        assert_eq!(Value::parse("1e3", ColumnType::Integer), Some(Value::Int(1000)));
    }

    #[test]
    fn test_from_rows_rejects_ragged_row() {
        let err = Table::from_rows(
            vec![Column::text("STATE"), Column::integer("N")],
            vec![vec![Value::Null]],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::SchemaMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_from_rows_rejects_wrong_cell_type() {
        let err = Table::from_rows(
            vec![Column::integer("N")],
            vec![vec![Value::Text("x".into())]],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn test_columns_report_declared_types() {
        assert_eq!(
            sample().columns(),
            vec![Column::text("STATE"), Column::integer("N")]
        );
    }

    #[test]
    fn test_with_series_replaces_existing() {
        let table = sample()
            .with_series(Column::integer("N").series(vec![Value::Int(5), Value::Int(6)]).unwrap())
            .unwrap();
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.get(1, "N"), Some(Value::Int(6)));
    }

    #[test]
    fn test_with_series_at_inserts() {
        let table = sample()
            .with_series_at(0, Column::integer("Year").series(vec![Value::Int(2018); 2]).unwrap())
            .unwrap();
        assert_eq!(table.column_names(), vec!["Year", "STATE", "N"]);
    }

    #[test]
    fn test_with_series_length_mismatch() {
        let err = sample()
            .with_series(Column::integer("M").series(vec![Value::Int(1)]).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::LengthMismatch { ref column, expected: 2, found: 1 } if column == "M"
        ));
        assert_eq!(
            err.to_string(),
            "column 'M' has 1 values but the table has 2 rows"
        );
    }

    #[test]
    fn test_concat_aligns_columns_by_name() {
        let a = sample();
        let b = Table::from_rows(
            vec![Column::integer("N"), Column::text("STATE")],
            vec![vec![Value::Int(9), Value::Text("18".into())]],
        )
        .unwrap();

        let joined = Table::concat(&[a, b]).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.get(2, "STATE"), Some(Value::Text("18".into())));
        assert_eq!(joined.get(2, "N"), Some(Value::Int(9)));
    }

    #[test]
    fn test_concat_missing_column() {
        let a = sample();
        let b = Table::from_rows(vec![Column::text("STATE")], vec![]).unwrap();
        let err = Table::concat(&[a, b]).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { ref column, .. } if column == "N"));
    }

    #[test]
    fn test_get_out_of_range() {
        assert_eq!(sample().get(0, "N"), Some(Value::Int(1)));
        assert_eq!(sample().get(1, "N"), Some(Value::Null));
        assert_eq!(sample().get(2, "N"), None);
        assert_eq!(sample().get(0, "X"), None);
    }

    #[test]
    fn test_null_displays_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float(0.2).to_string(), "0.2");
    }
}
