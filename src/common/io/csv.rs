use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, io::SerWriter, prelude::{CsvReadOptions, CsvWriter}};

use crate::common::PendingWrite;

/// Reads a CSV with a header row, every column as a string.
///
/// Cell codes and ids must keep their exact text (leading zeros, hex), so no
/// schema inference is done.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Trimmed values of a string column; blank cells come back as `None`.
pub(crate) fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] Missing column {name:?}"))?;
    let values = column.as_materialized_series().str()
        .with_context(|| format!("[io::csv::read] Column {name:?} is not a string column"))?;
    Ok(values.into_iter()
        .map(|value| value.map(str::trim).filter(|s| !s.is_empty()))
        .collect())
}

/// Like [`string_column`], `None` when the column is absent.
pub(crate) fn optional_string_column<'a>(df: &'a DataFrame, name: &str) -> Result<Option<Vec<Option<&'a str>>>> {
    if df.column(name).is_err() {
        return Ok(None);
    }
    string_column(df, name).map(Some)
}

/// Write a DataFrame to a CSV file, atomically replacing any previous file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut pending = PendingWrite::open(path)?;
    CsvWriter::new(&mut pending)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))?;
    pending.finalize()
}
