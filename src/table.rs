//! DataFrame plumbing shared by the loaders and the report writer.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::AnalysisError;

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names. Invalid UTF-8 (the ABS extracts are
/// Latin-1) is replaced rather than rejected.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, AnalysisError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .with_parse_options(CsvParseOptions::default().with_encoding(CsvEncoding::LossyUtf8))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    trim_column_names(df)
}

fn trim_column_names(mut df: DataFrame) -> Result<DataFrame, AnalysisError> {
    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed)?;
    Ok(df)
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), AnalysisError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(AnalysisError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Owned string values of a String column; nulls become `None`.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, AnalysisError> {
    let ca = df
        .column(name)
        .map_err(|_| AnalysisError::MissingColumn(name.to_string()))?
        .str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Values of any numeric column as nullable f64.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, AnalysisError> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Values of an integer key column; null keys are an input-shape error.
pub fn key_values(df: &DataFrame, name: &str) -> Result<Vec<i64>, AnalysisError> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::MissingColumn(name.to_string()))?
        .cast(&DataType::Int64)?;
    column
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| AnalysisError::InvalidData(format!("Null '{name}' at row {row}")))
        })
        .collect()
}

/// Dtypes the CSV readers and the aggregations can produce for a metric.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
    )
}

/// Parse an optional numeric cell. Empty cells and `null_marker` are missing;
/// anything else that fails to parse is an input error.
pub fn parse_optional_f64(
    raw: Option<&str>,
    null_marker: &str,
    context: &str,
) -> Result<Option<f64>, AnalysisError> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some(s) if s.is_empty() || s == null_marker => Ok(None),
        Some(s) => s.parse::<f64>().map(Some).map_err(|_| {
            AnalysisError::InvalidData(format!("{context}: '{s}' is not a number"))
        }),
    }
}

/// Cells read as missing in the published extracts, matching the pandas
/// defaults the data was prepared with.
const NA_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_marker(cell: &str) -> bool {
    cell.is_empty() || NA_MARKERS.contains(&cell)
}

/// `Some(None)` for a missing cell, `None` for a cell that is not a number.
fn parse_cell(raw: Option<&str>) -> Option<Option<f64>> {
    match raw.map(str::trim) {
        None => Some(None),
        Some(s) if is_na_marker(s) => Some(None),
        Some(s) => s.parse::<f64>().ok().map(Some),
    }
}

/// Turn every String column whose present cells all parse as numbers into a
/// nullable Float64 column. Columns with any text cell stay String.
pub fn coerce_numeric_columns(mut df: DataFrame) -> Result<DataFrame, AnalysisError> {
    let names: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.to_string())
        .collect();
    for name in names {
        let column = df.column(&name)?;
        if column.dtype() != &DataType::String {
            continue;
        }
        let parsed: Option<Vec<Option<f64>>> = column.str()?.into_iter().map(parse_cell).collect();
        match parsed {
            Some(values) => {
                df.with_column(Column::new(name.as_str().into(), values))?;
            }
            None => debug!(column = %name, "keeping text column"),
        }
    }
    Ok(df)
}

/// Stable ascending sort on the given columns.
pub fn sort_by(df: DataFrame, columns: &[&str]) -> Result<DataFrame, AnalysisError> {
    let by: Vec<Expr> = columns.iter().map(|c| col(*c)).collect();
    Ok(df
        .lazy()
        .sort_by_exprs(by, SortMultipleOptions::default().with_maintain_order(true))
        .collect()?)
}

/// Write a DataFrame as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), AnalysisError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
