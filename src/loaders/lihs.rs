//! LIHS indicator tables: AURIN family/community extracts and the AEDC
//! domain files, both described by metadata sidecars.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, CorrelationYear};
use crate::error::AnalysisError;
use crate::metadata::load_with_metadata;
use crate::region::normalize_all;
use crate::schema::{aedc, lihs, region};
use crate::table::{float_values, key_values, sort_by, string_values};

fn inner_join_on_key(left: DataFrame, right: DataFrame) -> Result<DataFrame, AnalysisError> {
    let joined = left
        .lazy()
        .join(
            right.lazy(),
            [col(region::SA2_CODE)],
            [col(region::SA2_CODE)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;
    sort_by(joined, &[region::SA2_CODE])
}

/// Load and inner-join one or more metadata-described LIHS CSVs.
/// Regions missing from any file are dropped.
pub fn load_lihs_files(datasets_dir: &Path, files: &[String]) -> Result<DataFrame, AnalysisError> {
    let mut merged: Option<DataFrame> = None;
    for file in files {
        let df = load_with_metadata(&datasets_dir.join(file))?;
        merged = Some(match merged {
            None => df,
            Some(acc) => inner_join_on_key(acc, df)?,
        });
    }
    merged.ok_or_else(|| AnalysisError::Config("no LIHS files configured".into()))
}

/// Split `"Developmentally vulnerable (%) 2015"` into status and year.
fn split_status_year(header: &str) -> (String, String) {
    let mut tokens: Vec<&str> = header.split_whitespace().collect();
    let year = tokens.pop().unwrap_or_default().to_string();
    (tokens.join(" "), year)
}

fn domain_label(csv_path: &Path) -> String {
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().replace('_', " "))
        .unwrap_or_default();
    format!("{}{stem}", lihs::DOMAIN_PREFIX)
}

fn csv_files_in(dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    Ok(files)
}

/// Stack every AEDC domain file into long form:
/// `SA2 Main Code, Status, Year, Percentage, Domain`.
///
/// Only percentage columns are kept; missing percentages are dropped.
pub fn load_aedc_long(aedc_dir: &Path) -> Result<DataFrame, AnalysisError> {
    let mut keys: Vec<i64> = Vec::new();
    let mut statuses: Vec<String> = Vec::new();
    let mut years: Vec<String> = Vec::new();
    let mut percentages: Vec<f64> = Vec::new();
    let mut domains: Vec<String> = Vec::new();

    let files = csv_files_in(aedc_dir)?;
    for file in &files {
        let domain = domain_label(file);
        let df = load_with_metadata(file)?;
        let row_keys = key_values(&df, region::SA2_CODE)?;

        let percent_cols: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .filter(|c| c.contains(lihs::PERCENT_MARKER))
            .map(str::to_string)
            .collect();
        debug!(file = %file.display(), domain, columns = percent_cols.len(), "stacking AEDC domain");

        for name in &percent_cols {
            let (status, year) = split_status_year(name);
            for (key, value) in row_keys.iter().zip(float_values(&df, name)?) {
                if let Some(value) = value {
                    keys.push(*key);
                    statuses.push(status.clone());
                    years.push(year.clone());
                    percentages.push(value);
                    domains.push(domain.clone());
                }
            }
        }
    }

    info!(files = files.len(), records = keys.len(), "loaded AEDC domains");
    Ok(DataFrame::new(vec![
        Column::new(aedc::SA2_MAIN_CODE.into(), keys),
        Column::new(aedc::STATUS.into(), statuses),
        Column::new(aedc::YEAR.into(), years),
        Column::new(aedc::PERCENTAGE.into(), percentages),
        Column::new(aedc::DOMAIN.into(), domains),
    ])?)
}

/// Pivot the long AEDC table to one row per region for a single year,
/// with columns named `"{Domain} - {Status}"`.
pub fn aedc_for_year(long: &DataFrame, year: i32) -> Result<DataFrame, AnalysisError> {
    let year = year.to_string();
    let keys = key_values(long, aedc::SA2_MAIN_CODE)?;
    let statuses = string_values(long, aedc::STATUS)?;
    let years = string_values(long, aedc::YEAR)?;
    let domains = string_values(long, aedc::DOMAIN)?;
    let values = float_values(long, aedc::PERCENTAGE)?;

    let mut regions: BTreeSet<i64> = BTreeSet::new();
    let mut cells: BTreeMap<(String, String), BTreeMap<i64, f64>> = BTreeMap::new();
    for i in 0..keys.len() {
        if years[i].as_deref() != Some(year.as_str()) {
            continue;
        }
        let (Some(domain), Some(status), Some(value)) = (&domains[i], &statuses[i], values[i])
        else {
            continue;
        };
        regions.insert(keys[i]);
        let column = cells.entry((domain.clone(), status.clone())).or_default();
        if column.insert(keys[i], value).is_some() {
            return Err(AnalysisError::InvalidData(format!(
                "Duplicate AEDC entry for region {} in '{domain} - {status}' ({year})",
                keys[i]
            )));
        }
    }

    let mut columns = vec![Column::new(
        region::SA2_CODE.into(),
        regions.iter().copied().collect::<Vec<i64>>(),
    )];
    for ((domain, status), by_region) in &cells {
        let values: Vec<Option<f64>> = regions.iter().map(|r| by_region.get(r).copied()).collect();
        columns.push(Column::new(format!("{domain} - {status}").into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

/// AEDC metrics (for the paired AEDC year) joined with the normalized LIHS
/// extracts for one income census year.
pub fn load_lihs_data(
    config: &AnalysisConfig,
    year: &CorrelationYear,
) -> Result<DataFrame, AnalysisError> {
    let aedc_dir = config.dataset(&config.correlations.aedc_dir);
    let aedc_wide = aedc_for_year(&load_aedc_long(&aedc_dir)?, year.aedc_year)?;

    let mut aurin = load_lihs_files(&config.paths.datasets_dir, &year.lihs_files)?;
    let normalized = normalize_all(&key_values(&aurin, region::SA2_CODE)?)?;
    aurin.with_column(Column::new(region::SA2_CODE.into(), normalized))?;

    let data = inner_join_on_key(aedc_wide, aurin)?;
    info!(
        year = year.year,
        aedc_year = year.aedc_year,
        regions = data.height(),
        metrics = data.width() - 1,
        "assembled LIHS data"
    );
    Ok(data)
}
