//! ABS rent and dwelling-structure extracts, plus the CPI housing series.
//!
//! Categorical cells are parsed once here: sentinel categories such as
//! `Total` or `Not stated` become `None` and their rows are dropped, so no
//! downstream code compares against sentinel strings.

use std::path::Path;
use std::sync::OnceLock;

use polars::prelude::*;
use regex::Regex;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::schema::{cpi, housing};
use crate::table::{parse_optional_f64, read_csv_as_strings, require_columns, string_values};

/// A usable category value, or `None` for empty cells and sentinels.
pub fn parse_category(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    if value.is_empty() || housing::SENTINELS.contains(&value) {
        None
    } else {
        Some(value)
    }
}

/// `"Three bedrooms"` → 3. Only `One`..`Six` followed by at least one more
/// word is accepted.
pub fn bedroom_count(label: &str) -> Result<i32, AnalysisError> {
    let words: Vec<&str> = label.split_whitespace().collect();
    if words.len() < 2 {
        return Err(AnalysisError::Invariant(format!(
            "bedroom label '{label}' should have at least two words"
        )));
    }
    match words[0] {
        "One" => Ok(1),
        "Two" => Ok(2),
        "Three" => Ok(3),
        "Four" => Ok(4),
        "Five" => Ok(5),
        "Six" => Ok(6),
        other => Err(AnalysisError::Invariant(format!(
            "unknown bedroom count word '{other}' in '{label}'"
        ))),
    }
}

fn digits() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern compiles"))
}

/// The only open-ended rent bracket in the ABS extracts (`$950 and over`).
pub const OPEN_RENT_BRACKET: f64 = 950.0;

/// `"$300-$399"` → 349.5; `"$950 and over"` → 950.
pub fn rent_midpoint(range: &str) -> Result<f64, AnalysisError> {
    let bounds: Vec<f64> = digits()
        .find_iter(range)
        .map(|m| m.as_str().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| AnalysisError::InvalidData(format!("rent range '{range}'")))?;

    match bounds.as_slice() {
        [single] if *single == OPEN_RENT_BRACKET => Ok(*single),
        [single] => Err(AnalysisError::Invariant(format!(
            "single-bound rent range '{range}' is {single}, expected {OPEN_RENT_BRACKET}"
        ))),
        [low, high] => Ok((low + high) / 2.0),
        _ => Err(AnalysisError::Invariant(format!(
            "rent range '{range}' has {} bounds, expected 1 or 2",
            bounds.len()
        ))),
    }
}

fn parse_year(raw: &str, row: usize) -> Result<i32, AnalysisError> {
    raw.parse::<i32>().map_err(|_| {
        AnalysisError::InvalidData(format!(
            "{} '{raw}' at row {row} is not a year",
            housing::CENSUS_YEAR
        ))
    })
}

/// Rows of an ABS census extract with every categorical field usable.
struct CensusRows {
    regions: Vec<String>,
    structures: Vec<String>,
    years: Vec<i32>,
    buckets: Vec<f64>,
    values: Vec<f64>,
    dropped: usize,
}

/// Shared reader for the ABS extracts: `bucket_column` is the per-file
/// category (bedrooms or rent bracket) turned into a number by `to_number`.
fn read_census_rows(
    path: &Path,
    bucket_column: &str,
    to_number: impl Fn(&str) -> Result<f64, AnalysisError>,
) -> Result<CensusRows, AnalysisError> {
    let raw = read_csv_as_strings(path)?;
    require_columns(
        &raw,
        &[
            bucket_column,
            housing::DWELLING_STRUCTURE,
            housing::REGION,
            housing::CENSUS_YEAR,
            housing::VALUE,
        ],
    )?;

    let buckets_raw = string_values(&raw, bucket_column)?;
    let structures_raw = string_values(&raw, housing::DWELLING_STRUCTURE)?;
    let regions_raw = string_values(&raw, housing::REGION)?;
    let years_raw = string_values(&raw, housing::CENSUS_YEAR)?;
    let values_raw = string_values(&raw, housing::VALUE)?;

    let mut rows = CensusRows {
        regions: Vec::with_capacity(raw.height()),
        structures: Vec::with_capacity(raw.height()),
        years: Vec::with_capacity(raw.height()),
        buckets: Vec::with_capacity(raw.height()),
        values: Vec::with_capacity(raw.height()),
        dropped: 0,
    };

    for row in 0..raw.height() {
        let fields = (
            parse_category(buckets_raw[row].as_deref()),
            parse_category(structures_raw[row].as_deref()),
            parse_category(regions_raw[row].as_deref()),
            parse_category(years_raw[row].as_deref()),
            parse_optional_f64(values_raw[row].as_deref(), "", housing::VALUE)?,
        );
        let (Some(bucket), Some(structure), Some(region), Some(year), Some(value)) = fields else {
            rows.dropped += 1;
            continue;
        };
        rows.buckets.push(to_number(bucket)?);
        rows.structures.push(structure.to_string());
        rows.regions.push(region.to_string());
        rows.years.push(parse_year(year, row)?);
        rows.values.push(value);
    }
    Ok(rows)
}

fn census_frame(rows: CensusRows, bucket_column: &str) -> Result<DataFrame, AnalysisError> {
    Ok(DataFrame::new(vec![
        Column::new(housing::REGION.into(), rows.regions),
        Column::new(housing::DWELLING_STRUCTURE.into(), rows.structures),
        Column::new(housing::CENSUS_YEAR.into(), rows.years),
        Column::new(bucket_column.into(), rows.buckets),
        Column::new(housing::VALUE.into(), rows.values),
    ])?)
}

/// Dwelling counts by region, structure, census year and bedroom count.
pub fn load_dwellings(path: &Path) -> Result<DataFrame, AnalysisError> {
    let rows = read_census_rows(path, housing::BEDROOMS, |label| {
        bedroom_count(label).map(f64::from)
    })?;
    info!(file = %path.display(), rows = rows.values.len(), dropped = rows.dropped, "loaded dwellings");
    census_frame(rows, housing::BEDROOMS)
}

/// Rental counts by region, structure, census year and rent-bracket midpoint.
pub fn load_rent(path: &Path) -> Result<DataFrame, AnalysisError> {
    let rows = read_census_rows(path, housing::WEEKLY_RENT, rent_midpoint)?;
    info!(file = %path.display(), rows = rows.values.len(), dropped = rows.dropped, "loaded weekly rent");
    census_frame(rows, housing::WEEKLY_RENT)
}

/// Quarterly CPI housing increases (percent), in file order.
pub fn load_cpi_increases(path: &Path) -> Result<Vec<f64>, AnalysisError> {
    let raw = read_csv_as_strings(path)?;
    require_columns(&raw, &[cpi::PERCENTAGE_INCREASE])?;
    let increases = string_values(&raw, cpi::PERCENTAGE_INCREASE)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            parse_optional_f64(v.as_deref(), "", cpi::PERCENTAGE_INCREASE)?.ok_or_else(|| {
                AnalysisError::InvalidData(format!(
                    "missing {} at row {row}",
                    cpi::PERCENTAGE_INCREASE
                ))
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;
    debug!(file = %path.display(), quarters = increases.len(), "loaded CPI increases");
    Ok(increases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sentinels_and_blanks_are_not_categories() {
        for s in housing::SENTINELS {
            assert_eq!(parse_category(Some(s)), None);
        }
        assert_eq!(parse_category(Some("  ")), None);
        assert_eq!(parse_category(None), None);
        assert_eq!(parse_category(Some(" Flat ")), Some("Flat"));
    }

    #[test]
    fn bedroom_words_map_to_counts() {
        assert_eq!(bedroom_count("One bedroom").unwrap(), 1);
        assert_eq!(bedroom_count("Six bedrooms or more").unwrap(), 6);
    }

    #[test]
    fn unexpected_bedroom_labels_violate_invariant() {
        assert!(matches!(
            bedroom_count("Seven bedrooms"),
            Err(AnalysisError::Invariant(_))
        ));
        assert!(matches!(bedroom_count("Three"), Err(AnalysisError::Invariant(_))));
    }

    #[test]
    fn rent_ranges_become_midpoints() {
        assert_eq!(rent_midpoint("$300-$399").unwrap(), 349.5);
        assert_eq!(rent_midpoint("$1-$74").unwrap(), 37.5);
        assert_eq!(rent_midpoint("$950 and over").unwrap(), 950.0);
    }

    #[test]
    fn unexpected_rent_ranges_violate_invariant() {
        assert!(matches!(
            rent_midpoint("$1000 and over"),
            Err(AnalysisError::Invariant(_))
        ));
        assert!(matches!(
            rent_midpoint("$1-$2-$3"),
            Err(AnalysisError::Invariant(_))
        ));
        assert!(matches!(rent_midpoint("unknown"), Err(AnalysisError::Invariant(_))));
    }

    #[test]
    fn dwelling_loader_drops_sentinel_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dwellings.csv");
        std::fs::write(
            &path,
            "Number of Bedrooms,Dwelling Structure,Region,Census year,Value,Flag\n\
             One bedroom,Flat,Carlton,2016,10,\n\
             Two bedrooms,Flat,Carlton,2016,5,\n\
             Not stated,Flat,Carlton,2016,3,\n\
             Total,Flat,Carlton,2016,18,\n\
             None (includes bedsitters),Flat,Carlton,2016,1,\n\
             Three bedrooms,Total,Carlton,2016,7,\n",
        )
        .unwrap();

        let df = load_dwellings(&path).unwrap();
        assert_eq!(df.height(), 2);
        let bedrooms: Vec<Option<f64>> = crate::table::float_values(&df, housing::BEDROOMS).unwrap();
        assert_eq!(bedrooms, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn rent_loader_surfaces_bad_brackets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rent.csv");
        std::fs::write(
            &path,
            "Dwelling Structure,Rent (weekly),Region,Census year,Value\n\
             Flat,$300-$399,Carlton,2016,4\n\
             Flat,Nil payments,Carlton,2016,2\n\
             Flat,$1200 and over,Carlton,2016,1\n",
        )
        .unwrap();
        assert!(matches!(load_rent(&path), Err(AnalysisError::Invariant(_))));
    }

    #[test]
    fn cpi_increases_keep_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpi.csv");
        std::fs::write(&path, "Quarter,Percentage increase\nSep-2016,0.5\nDec-2016,-0.2\n")
            .unwrap();
        assert_eq!(load_cpi_increases(&path).unwrap(), vec![0.5, -0.2]);
    }
}
