//! Cost-of-living proportions and the CPI rent projection.
//!
//! A proportion is `(weekly rent per person + weekly living costs)` over half
//! of the fortnightly allowance income. Values at or above 1 mean the
//! allowance does not cover rent and basic costs.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{AllowanceRates, ProjectionConfig};
use crate::error::AnalysisError;
use crate::schema::{cost_of_living, housing};
use crate::table::{float_values, key_values, require_columns, sort_by, string_values};

pub fn cost_proportion(rent: f64, cost_of_living: f64, income_half: f64) -> f64 {
    (rent + cost_of_living) / income_half
}

fn proportion_expr(rent: Expr, cost_of_living: f64, income_half: f64) -> Expr {
    (rent + lit(cost_of_living)) / lit(income_half)
}

const OUTPUT_COLUMNS: [&str; 5] = [
    housing::REGION,
    housing::CENSUS_YEAR,
    housing::MEAN_RENT_PER_PERSON,
    cost_of_living::YOUTH_ALLOWANCE,
    cost_of_living::NEWSTART,
];

/// Both proportions for every (Region, Census year) whose year has allowance
/// rates. Years without rates are left out.
pub fn cost_of_living_table(
    rent_per_person: &DataFrame,
    allowances: &[AllowanceRates],
) -> Result<DataFrame, AnalysisError> {
    require_columns(
        rent_per_person,
        &[
            housing::REGION,
            housing::CENSUS_YEAR,
            housing::MEAN_RENT_PER_PERSON,
        ],
    )?;

    let years: BTreeSet<i64> = key_values(rent_per_person, housing::CENSUS_YEAR)?
        .into_iter()
        .collect();

    let mut table: Option<DataFrame> = None;
    for year in years {
        let Some(rates) = allowances.iter().find(|a| i64::from(a.year) == year) else {
            warn!(year, "no allowance rates, census year excluded");
            continue;
        };
        let rent = col(housing::MEAN_RENT_PER_PERSON);
        let frame = rent_per_person
            .clone()
            .lazy()
            .filter(col(housing::CENSUS_YEAR).eq(lit(rates.year)))
            .with_columns([
                proportion_expr(rent.clone(), rates.cost_of_living, rates.youth_allowance)
                    .alias(cost_of_living::YOUTH_ALLOWANCE),
                proportion_expr(rent, rates.cost_of_living, rates.newstart)
                    .alias(cost_of_living::NEWSTART),
            ])
            .select(OUTPUT_COLUMNS.map(col))
            .collect()?;
        debug!(year, regions = frame.height(), "cost of living");
        table = Some(match table {
            None => frame,
            Some(mut acc) => {
                acc.vstack_mut(&frame)?;
                acc
            }
        });
    }

    let table = table.ok_or_else(|| {
        AnalysisError::InvalidData("no census year in the rent data has allowance rates".into())
    })?;
    sort_by(table, &[housing::REGION, housing::CENSUS_YEAR])
}

/// Compound quarterly percentage increases onto `base`, in order.
pub fn project_rent(base: f64, increases: &[f64]) -> f64 {
    increases
        .iter()
        .fold(base, |rent, pct| rent * (1.0 + pct / 100.0))
}

/// Append a projected row per region for `projection.target_year`, built
/// from the base-year rent and `rates`.
pub fn project_cost_of_living(
    table: &DataFrame,
    increases: &[f64],
    projection: &ProjectionConfig,
    rates: &AllowanceRates,
) -> Result<DataFrame, AnalysisError> {
    require_columns(table, &OUTPUT_COLUMNS)?;
    let regions = string_values(table, housing::REGION)?;
    let years = key_values(table, housing::CENSUS_YEAR)?;
    let rents = float_values(table, housing::MEAN_RENT_PER_PERSON)?;

    let mut out_regions: Vec<Option<String>> = Vec::new();
    let mut out_rents: Vec<Option<f64>> = Vec::new();
    let mut youth: Vec<Option<f64>> = Vec::new();
    let mut newstart: Vec<Option<f64>> = Vec::new();
    for ((region, year), rent) in regions.into_iter().zip(years).zip(rents) {
        if year != i64::from(projection.base_year) {
            continue;
        }
        let projected = rent.map(|r| project_rent(r, increases));
        out_regions.push(region);
        out_rents.push(projected);
        youth.push(projected.map(|r| cost_proportion(r, rates.cost_of_living, rates.youth_allowance)));
        newstart.push(projected.map(|r| cost_proportion(r, rates.cost_of_living, rates.newstart)));
    }

    if out_regions.is_empty() {
        warn!(base_year = projection.base_year, "no base-year rows to project");
    }
    info!(
        base_year = projection.base_year,
        target_year = projection.target_year,
        regions = out_regions.len(),
        quarters = increases.len(),
        "projected rent"
    );

    let target_years = vec![projection.target_year; out_regions.len()];
    let projected = DataFrame::new(vec![
        Column::new(housing::REGION.into(), out_regions),
        Column::new(housing::CENSUS_YEAR.into(), target_years),
        Column::new(housing::MEAN_RENT_PER_PERSON.into(), out_rents),
        Column::new(cost_of_living::YOUTH_ALLOWANCE.into(), youth),
        Column::new(cost_of_living::NEWSTART.into(), newstart),
    ])?;

    // The census year column must line up with the table's for vstack.
    let year_dtype = table.column(housing::CENSUS_YEAR)?.dtype().clone();
    let projected = projected
        .lazy()
        .with_column(col(housing::CENSUS_YEAR).strict_cast(year_dtype))
        .collect()?;

    let mut combined = table.select(OUTPUT_COLUMNS)?;
    combined.vstack_mut(&projected)?;
    sort_by(combined, &[housing::REGION, housing::CENSUS_YEAR])
}

/// Share of regions in one census year whose proportion is at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct AffordabilitySummary {
    pub year: i32,
    pub regions: usize,
    pub youth_allowance_share: f64,
    pub newstart_share: f64,
}

pub fn affordability_by_year(table: &DataFrame) -> Result<Vec<AffordabilitySummary>, AnalysisError> {
    let years = key_values(table, housing::CENSUS_YEAR)?;
    let youth = float_values(table, cost_of_living::YOUTH_ALLOWANCE)?;
    let newstart = float_values(table, cost_of_living::NEWSTART)?;

    // year -> (regions, youth >= 1, newstart >= 1)
    let mut counts: BTreeMap<i64, (usize, usize, usize)> = BTreeMap::new();
    for ((year, y), n) in years.into_iter().zip(youth).zip(newstart) {
        let entry = counts.entry(year).or_default();
        entry.0 += 1;
        entry.1 += usize::from(y.is_some_and(|v| v >= 1.0));
        entry.2 += usize::from(n.is_some_and(|v| v >= 1.0));
    }

    counts
        .into_iter()
        .map(|(year, (regions, youth_over, newstart_over))| {
            let year = i32::try_from(year)
                .map_err(|_| AnalysisError::InvalidData(format!("census year {year}")))?;
            Ok(AffordabilitySummary {
                year,
                regions,
                youth_allowance_share: youth_over as f64 / regions as f64,
                newstart_share: newstart_over as f64 / regions as f64,
            })
        })
        .collect()
}

/// Mean of the per-region rent per person, by census year.
pub fn average_rent_by_year(table: &DataFrame) -> Result<DataFrame, AnalysisError> {
    require_columns(table, &[housing::CENSUS_YEAR, housing::MEAN_RENT_PER_PERSON])?;
    let averaged = table
        .clone()
        .lazy()
        .group_by([col(housing::CENSUS_YEAR)])
        .agg([col(housing::MEAN_RENT_PER_PERSON).mean()])
        .collect()?;
    sort_by(averaged, &[housing::CENSUS_YEAR])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rent_table() -> DataFrame {
        DataFrame::new(vec![
            Column::new(housing::REGION.into(), ["Carlton", "Carlton", "Carlton", "Parkville"]),
            Column::new(housing::CENSUS_YEAR.into(), [2006i32, 2011, 2016, 2016]),
            Column::new(
                housing::MEAN_RENT_PER_PERSON.into(),
                [150.0f64, 200.0, 400.0, 100.0],
            ),
            Column::new(housing::TOTAL.into(), [1.0f64, 1.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    fn defaults() -> Vec<AllowanceRates> {
        crate::config::AnalysisConfig::default().housing.allowances
    }

    #[test]
    fn proportion_matches_worked_example() {
        assert!((cost_proportion(400.0, 130.0, 260.135) - 2.0374).abs() < 1e-4);
    }

    #[test]
    fn table_excludes_years_without_rates() {
        let table = cost_of_living_table(&rent_table(), &defaults()).unwrap();
        assert_eq!(table.get_column_names_str(), OUTPUT_COLUMNS.to_vec());
        assert_eq!(table.height(), 3);
        let years = key_values(&table, housing::CENSUS_YEAR).unwrap();
        assert_eq!(years, vec![2011, 2016, 2016]);

        let youth = float_values(&table, cost_of_living::YOUTH_ALLOWANCE).unwrap();
        assert!((youth[1].unwrap() - 530.0 / 260.135).abs() < 1e-12);
    }

    #[test]
    fn compounding_is_sequential() {
        assert!((project_rent(100.0, &[10.0, 20.0]) - 132.0).abs() < 1e-9);
        assert!((project_rent(100.0, &[10.0, -50.0]) - 55.0).abs() < 1e-9);
        assert!((project_rent(100.0, &[-50.0, 10.0]) - 55.0).abs() < 1e-9);
        assert_eq!(project_rent(100.0, &[]), 100.0);
    }

    #[test]
    fn projection_appends_target_year_rows() {
        let config = crate::config::AnalysisConfig::default();
        let table = cost_of_living_table(&rent_table(), &config.housing.allowances).unwrap();
        let rates = config.allowance_for(2021).unwrap();
        let predicted =
            project_cost_of_living(&table, &[10.0, 20.0], &config.housing.projection, rates)
                .unwrap();

        assert_eq!(predicted.height(), 5);
        let regions = string_values(&predicted, housing::REGION).unwrap();
        let years = key_values(&predicted, housing::CENSUS_YEAR).unwrap();
        assert_eq!(years, vec![2011, 2016, 2021, 2016, 2021]);
        assert_eq!(regions[4].as_deref(), Some("Parkville"));

        let rents = float_values(&predicted, housing::MEAN_RENT_PER_PERSON).unwrap();
        assert!((rents[2].unwrap() - 528.0).abs() < 1e-9);
        let newstart = float_values(&predicted, cost_of_living::NEWSTART).unwrap();
        assert!((newstart[4].unwrap() - (132.0 + 150.0) / 357.335).abs() < 1e-9);
    }

    #[test]
    fn affordability_counts_proportions_at_or_above_one() {
        let table = DataFrame::new(vec![
            Column::new(housing::CENSUS_YEAR.into(), [2016i32, 2016, 2016, 2016]),
            Column::new(cost_of_living::YOUTH_ALLOWANCE.into(), [1.0f64, 0.5, 2.0, 0.9]),
            Column::new(cost_of_living::NEWSTART.into(), [0.8f64, 0.5, 1.5, 0.9]),
        ])
        .unwrap();
        let summary = affordability_by_year(&table).unwrap();
        assert_eq!(
            summary,
            vec![AffordabilitySummary {
                year: 2016,
                regions: 4,
                youth_allowance_share: 0.5,
                newstart_share: 0.25,
            }]
        );
    }

    #[test]
    fn average_rent_is_per_year() {
        let averaged = average_rent_by_year(&rent_table()).unwrap();
        assert_eq!(
            float_values(&averaged, housing::MEAN_RENT_PER_PERSON).unwrap(),
            vec![Some(150.0), Some(200.0), Some(250.0)]
        );
    }
}
