//! End-to-end runs. `run_*` load and derive every table in memory;
//! `write_*` persist a finished run.

use std::path::PathBuf;

use polars::prelude::DataFrame;
use tracing::info;

use crate::aggregation::{average_bedrooms, mean_rent_per_dwelling, mean_rent_per_person};
use crate::config::AnalysisConfig;
use crate::correlation::{combine_years, find_correlations, CorrelationTable, YearCorrelations};
use crate::cost_of_living::{
    affordability_by_year, average_rent_by_year, cost_of_living_table, project_cost_of_living,
    AffordabilitySummary,
};
use crate::error::AnalysisError;
use crate::loaders::{load_cpi_increases, load_dwellings, load_income, load_lihs_data, load_rent};
use crate::report::{
    render_plots, write_table, AVERAGE_BEDROOMS_CSV, COST_OF_LIVING_CSV,
    PREDICTED_COST_OF_LIVING_CSV, RENT_PER_PERSON_CSV,
};
use crate::schema::housing;
use crate::table::{float_values, key_values};
use crate::visualization::{correlation_plot, cost_of_living_plots, Plotter, ScatterPlot};

#[derive(Debug, Clone)]
pub struct CorrelationRun {
    pub per_year: Vec<YearCorrelations>,
    pub table: CorrelationTable,
}

/// Correlate income with the LIHS metrics for every configured year.
pub fn run_correlations(config: &AnalysisConfig) -> Result<CorrelationRun, AnalysisError> {
    let mut per_year = Vec::with_capacity(config.correlations.years.len());
    for year in &config.correlations.years {
        let data = load_lihs_data(config, year)?;
        let income = load_income(&config.income_file(year.year))?;
        per_year.push(find_correlations(
            &data,
            &income,
            year.year,
            config.correlations.plot_threshold,
        )?);
    }
    let table = combine_years(&per_year);
    info!(
        years = table.years.len(),
        metrics = table.rows.len(),
        "correlation table ready"
    );
    Ok(CorrelationRun { per_year, table })
}

pub fn write_correlations(
    run: &CorrelationRun,
    config: &AnalysisConfig,
    plotter: Option<&dyn Plotter>,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut written = vec![write_table(
        &run.table.to_dataframe()?,
        &config.paths.output_csv_dir,
        &run.table.report_file_name(),
    )?];
    if let Some(plotter) = plotter {
        let plots: Vec<ScatterPlot> = run
            .per_year
            .iter()
            .flat_map(|year| year.plots.iter().map(correlation_plot))
            .collect();
        written.extend(render_plots(plotter, &plots, &config.paths.plots_dir)?);
    }
    Ok(written)
}

#[derive(Debug, Clone)]
pub struct CostOfLivingRun {
    pub average_bedrooms: DataFrame,
    pub rent_per_person: DataFrame,
    /// Census years with allowance rates.
    pub actual: DataFrame,
    /// `actual` plus the projected target year.
    pub predicted: DataFrame,
    pub affordability: Vec<AffordabilitySummary>,
}

/// Derive rent per person and cost-of-living proportions from the ABS
/// extracts, then project the target year from CPI.
pub fn run_cost_of_living(config: &AnalysisConfig) -> Result<CostOfLivingRun, AnalysisError> {
    let housing_config = &config.housing;
    let dwellings = load_dwellings(&config.dataset(&housing_config.dwelling_file))?;
    let rent = load_rent(&config.dataset(&housing_config.rent_file))?;

    let average_bedrooms = average_bedrooms(&dwellings)?;
    let per_dwelling = mean_rent_per_dwelling(&rent, &average_bedrooms)?;
    let rent_per_person = mean_rent_per_person(&per_dwelling)?;
    let actual = cost_of_living_table(&rent_per_person, &housing_config.allowances)?;

    let yearly = average_rent_by_year(&actual)?;
    for (year, mean) in key_values(&yearly, housing::CENSUS_YEAR)?
        .into_iter()
        .zip(float_values(&yearly, housing::MEAN_RENT_PER_PERSON)?)
    {
        info!(year, mean_rent_per_person = mean, "average rent");
    }

    let projection = &housing_config.projection;
    let rates = config.allowance_for(projection.target_year).ok_or_else(|| {
        AnalysisError::Config(format!(
            "no allowance rates for projection target year {}",
            projection.target_year
        ))
    })?;
    let increases = load_cpi_increases(&config.dataset(&projection.cpi_file))?;
    let predicted = project_cost_of_living(&actual, &increases, projection, rates)?;

    let affordability = affordability_by_year(&predicted)?;
    for summary in &affordability {
        info!(
            year = summary.year,
            regions = summary.regions,
            youth_allowance_share = summary.youth_allowance_share,
            newstart_share = summary.newstart_share,
            "regions with proportion >= 1"
        );
    }

    Ok(CostOfLivingRun {
        average_bedrooms,
        rent_per_person,
        actual,
        predicted,
        affordability,
    })
}

pub fn write_cost_of_living(
    run: &CostOfLivingRun,
    config: &AnalysisConfig,
    plotter: Option<&dyn Plotter>,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let dir = &config.paths.output_csv_dir;
    let mut written = vec![
        write_table(&run.average_bedrooms, dir, AVERAGE_BEDROOMS_CSV)?,
        write_table(&run.rent_per_person, dir, RENT_PER_PERSON_CSV)?,
        write_table(&run.actual, dir, COST_OF_LIVING_CSV)?,
        write_table(&run.predicted, dir, PREDICTED_COST_OF_LIVING_CSV)?,
    ];
    if let Some(plotter) = plotter {
        let plots = cost_of_living_plots(&run.predicted, config.housing.projection.target_year)?;
        written.extend(render_plots(plotter, &plots, &config.paths.plots_dir)?);
    }
    Ok(written)
}
