//! Delimited flat-file persistence for record tables.
//!
//! Tables are written as CSV with a header row; null cells are empty
//! fields. Paths ending in `.gz` are gzip-compressed on write and
//! decompressed on read.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use polars::prelude::{CsvWriter, SerWriter};
use serde::Serialize;
use tracing::{debug, info};

use crate::geo;
use crate::ingest::convert_rows;
use crate::table::{Column, Schema, Table};

/// Shape of a table, for logs.
#[derive(Debug, Serialize)]
pub struct TableSummary {
    pub generated_at: DateTime<Utc>,
    pub rows: usize,
    pub columns: Vec<Column>,
}

impl TableSummary {
    pub fn of(table: &Table) -> Self {
        Self {
            generated_at: Utc::now(),
            rows: table.len(),
            columns: table.columns(),
        }
    }
}

/// Logs a table's shape using Rust's debug pretty-print format.
pub fn print_pretty(table: &Table) {
    debug!("{:#?}", TableSummary::of(table));
}

/// Logs a table's shape as pretty-printed JSON.
pub fn print_json(table: &Table) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(&TableSummary::of(table))?);
    Ok(())
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn source(file: File, path: &Path) -> Box<dyn Read> {
    // appended .gz files hold one gzip member per write
    if is_gzip(path) {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    }
}

fn write_csv(file: File, path: &Path, table: &Table, header: bool) -> Result<()> {
    let mut df = table.df().clone();
    let mut out = BufWriter::new(file);
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(out, Compression::default());
        CsvWriter::new(&mut encoder)
            .include_header(header)
            .finish(&mut df)?;
        encoder.finish()?.flush()?;
    } else {
        CsvWriter::new(&mut out).include_header(header).finish(&mut df)?;
        out.flush()?;
    }
    Ok(())
}

/// Writes `table` to `path`, replacing any existing file.
pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(file, path, table, true).with_context(|| format!("writing {}", path.display()))?;

    debug!(path = %path.display(), rows = table.len(), "Wrote table");
    Ok(())
}

/// Appends the rows of `table` to `path`.
///
/// A missing file is created with a header. An existing file must have
/// exactly the same columns, in the same order.
pub fn append_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return write_table(path, table);
    }

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(source(file, path));
    let existing: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if existing != table.column_names() {
        bail!(
            "cannot append to {}: columns {:?} differ from the file's {:?}",
            path.display(),
            table.column_names(),
            existing
        );
    }

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("opening {} for append", path.display()))?;
    write_csv(file, path, table, false).with_context(|| format!("appending to {}", path.display()))?;

    debug!(path = %path.display(), rows = table.len(), "Appended table");
    Ok(())
}

/// Reads a CSV written by [`write_table`] (or any tool with a header row).
///
/// Column types come from `schema`; undeclared columns are text. Columns
/// with an empty header (row-index columns added by dataframe tools) are
/// skipped. Geography columns are re-padded, since other tools tend to
/// strip their leading zeros.
pub fn read_table(path: impl AsRef<Path>, schema: &Schema) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(source(file, path));
    let headers = reader.headers()?.clone();

    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    let columns: Vec<Column> = keep
        .iter()
        .map(|&i| {
            let name = headers[i].trim();
            Column::new(name, schema.kind_or_text(name))
        })
        .collect();

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        cells.push(
            keep.iter()
                .map(|&i| record.get(i).unwrap_or_default().to_string())
                .collect::<Vec<_>>(),
        );
    }

    let rows = convert_rows(&columns, cells)
        .with_context(|| format!("reading {}", path.display()))?;
    let table = geo::normalize_columns(&Table::from_rows(columns, rows)?)?;

    debug!(path = %path.display(), rows = table.len(), "Read table");
    Ok(table)
}

/// Stacks several exported tables into one.
pub fn concat_files(paths: &[PathBuf], schema: &Schema) -> Result<Table> {
    let tables = paths
        .iter()
        .map(|p| read_table(p, schema))
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::concat(&tables)?)
}

/// Deletes the given files, ignoring ones that are already gone.
pub fn remove_files(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        if path.exists() {
            fs::remove_file(path)?;
            debug!(path = %path.display(), "Removed file");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, Value};
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample() -> Table {
        Table::from_rows(
            vec![
                Column::text("STATE"),
                Column::text("COUNTY"),
                Column::integer("N"),
                Column::float("PCT"),
            ],
            vec![
                vec![
                    Value::Text("17".into()),
                    Value::Text("005".into()),
                    Value::Int(12),
                    Value::Float(0.25),
                ],
                vec![
                    Value::Text("29".into()),
                    Value::Text("510".into()),
                    Value::Null,
                    Value::Null,
                ],
            ],
        )
        .unwrap()
    }

    fn schema() -> Schema {
        let mut schema = Schema::default();
        schema.declare("N", ColumnType::Integer);
        schema.declare("PCT", ColumnType::Float);
        schema
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&sample());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample()).unwrap();
    }

    #[test]
    fn test_write_table_header_and_nulls() {
        let path = temp_path("acs_rollup_test_write.csv");
        let _ = fs::remove_file(&path);

        write_table(&path, &sample()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["STATE,COUNTY,N,PCT", "17,005,12,0.25", "29,510,,"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_table_restores_types_and_padding() {
        let path = temp_path("acs_rollup_test_read.csv");
        fs::write(&path, ",STATE,COUNTY,N,PCT\n0,17,5,12,0.25\n1,29,510,,\n").unwrap();

        let table = read_table(&path, &schema()).unwrap();
        assert_eq!(table.column_names(), vec!["STATE", "COUNTY", "N", "PCT"]);
        assert_eq!(table, sample());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_gzip_files_read_back() {
        let path = temp_path("acs_rollup_test_gzip.csv.gz");
        let _ = fs::remove_file(&path);

        write_table(&path, &sample()).unwrap();
        let table = read_table(&path, &schema()).unwrap();
        assert_eq!(table, sample());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_table_writes_header_once() {
        let path = temp_path("acs_rollup_test_append.csv.gz");
        let _ = fs::remove_file(&path);

        append_table(&path, &sample()).unwrap();
        append_table(&path, &sample()).unwrap();

        let table = read_table(&path, &schema()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(2, "COUNTY"), Some(Value::Text("005".into())));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_table_rejects_other_columns() {
        let path = temp_path("acs_rollup_test_append_mismatch.csv");
        fs::write(&path, "STATE,N\n17,1\n").unwrap();

        assert!(append_table(&path, &sample()).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_gzip_write_is_one_finished_member() {
        let path = temp_path("acs_rollup_test_gzip_member.csv.gz");
        let _ = fs::remove_file(&path);

        write_table(&path, &sample()).unwrap();

        let bytes = fs::read(&path).unwrap();
        let mut text = String::new();
        flate2::read::GzDecoder::new(&bytes[..])
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "STATE,COUNTY,N,PCT\n17,005,12,0.25\n29,510,,\n");

        // the trailer records the uncompressed length
        let trailer_len = u32::from_le_bytes(bytes[bytes.len() - 4..].try_into().unwrap());
        assert_eq!(trailer_len as usize, text.len());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_concat_and_remove_state_files() {
        let dir = temp_path("acs_rollup_test_concat");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let files = vec![dir.join("census_state_17.csv"), dir.join("census_state_29.csv")];
        for file in &files {
            write_table(file, &sample()).unwrap();
        }
        write_table(dir.join("census_tracts.csv"), &sample()).unwrap();

        let all = concat_files(&files, &schema()).unwrap();
        assert_eq!(all.len(), 4);

        remove_files(&files).unwrap();
        let left: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec!["census_tracts.csv"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
