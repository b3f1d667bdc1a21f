use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::region::normalize_region_code;
use crate::schema::{income, region};
use crate::table::{parse_optional_f64, read_csv_as_strings, require_columns, string_values};

/// Load the median weekly household income per SA2.
///
/// The file is read as strings so the literal `null` marker survives; income
/// becomes a nullable Float64 and the 9-digit main code is collapsed to the
/// 5-digit SA2 code.
pub fn load_income(path: &Path) -> Result<DataFrame, AnalysisError> {
    let raw = read_csv_as_strings(path)?;
    require_columns(&raw, &[income::RAW_SA2_CODE, income::RAW_WEEKLY_INCOME])?;

    let codes = string_values(&raw, income::RAW_SA2_CODE)?;
    let incomes = string_values(&raw, income::RAW_WEEKLY_INCOME)?;

    let mut keys = Vec::with_capacity(codes.len());
    let mut values = Vec::with_capacity(codes.len());
    for (row, (code, value)) in codes.iter().zip(&incomes).enumerate() {
        let code = code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AnalysisError::InvalidData(format!("Null {} at row {row}", income::RAW_SA2_CODE))
            })?;
        let code: i64 = code.parse().map_err(|_| {
            AnalysisError::InvalidData(format!("SA2 code '{code}' at row {row} is not an integer"))
        })?;
        keys.push(normalize_region_code(code)?);
        values.push(parse_optional_f64(
            value.as_deref(),
            income::NULL_MARKER,
            income::WEEKLY_INCOME,
        )?);
    }

    let missing = values.iter().filter(|v| v.is_none()).count();
    debug!(file = %path.display(), missing, "parsed income rows");

    let df = DataFrame::new(vec![
        Column::new(region::SA2_CODE.into(), keys),
        Column::new(income::WEEKLY_INCOME.into(), values),
    ])?;
    let df = crate::table::sort_by(df, &[region::SA2_CODE])?;
    info!(file = %path.display(), regions = df.height(), "loaded income");
    Ok(df)
}
