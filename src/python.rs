use std::path::PathBuf;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::config::AnalysisConfig;
use crate::schema;

/// A config file is resolved against its own directory; without one the
/// defaults are resolved against the working directory.
fn resolve_config(config_path: Option<PathBuf>) -> PyResult<AnalysisConfig> {
    Ok(match config_path {
        Some(path) => {
            let root = path.parent().map(PathBuf::from).unwrap_or_default();
            AnalysisConfig::load(&path)?.rooted_at(&root)
        }
        None => AnalysisConfig::default(),
    })
}

#[pyfunction]
fn normalize_region_key(code: &str) -> PyResult<i64> {
    Ok(crate::region::normalize_region_key(code)?)
}

#[pyfunction]
fn load_income(path: PathBuf) -> PyResult<PyDataFrame> {
    Ok(PyDataFrame(crate::loaders::load_income(&path)?))
}

#[pyfunction]
#[pyo3(signature = (year, config_path=None))]
fn load_lihs_data(year: i32, config_path: Option<PathBuf>) -> PyResult<PyDataFrame> {
    let config = resolve_config(config_path)?;
    let entry = config
        .correlations
        .years
        .iter()
        .find(|y| y.year == year)
        .ok_or_else(|| PyValueError::new_err(format!("No correlation year {year} configured")))?;
    Ok(PyDataFrame(crate::loaders::load_lihs_data(&config, entry)?))
}

#[pyfunction]
#[pyo3(signature = (config_path=None))]
fn find_correlations_multiyear(config_path: Option<PathBuf>) -> PyResult<PyDataFrame> {
    let config = resolve_config(config_path)?;
    let run = crate::pipeline::run_correlations(&config)?;
    Ok(PyDataFrame(run.table.to_dataframe()?))
}

#[pyfunction]
#[pyo3(signature = (config_path=None))]
fn predict_cost_of_living(config_path: Option<PathBuf>) -> PyResult<PyDataFrame> {
    let config = resolve_config(config_path)?;
    let run = crate::pipeline::run_cost_of_living(&config)?;
    Ok(PyDataFrame(run.predicted))
}

/// Export column names as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let region = PyModule::new(m.py(), "region")?;
    region.add("SA2_CODE", schema::region::SA2_CODE)?;
    m.add_submodule(&region)?;

    let income = PyModule::new(m.py(), "income")?;
    income.add("WEEKLY_INCOME", schema::income::WEEKLY_INCOME)?;
    m.add_submodule(&income)?;

    let housing = PyModule::new(m.py(), "housing")?;
    housing.add("REGION", schema::housing::REGION)?;
    housing.add("CENSUS_YEAR", schema::housing::CENSUS_YEAR)?;
    housing.add(
        "MEAN_RENT_PER_PERSON",
        schema::housing::MEAN_RENT_PER_PERSON,
    )?;
    m.add_submodule(&housing)?;

    let cost_of_living = PyModule::new(m.py(), "cost_of_living")?;
    cost_of_living.add("YOUTH_ALLOWANCE", schema::cost_of_living::YOUTH_ALLOWANCE)?;
    cost_of_living.add("NEWSTART", schema::cost_of_living::NEWSTART)?;
    m.add_submodule(&cost_of_living)?;

    let correlation = PyModule::new(m.py(), "correlation")?;
    correlation.add("METRIC", schema::correlation::METRIC)?;
    correlation.add("STRENGTH", schema::correlation::STRENGTH)?;
    m.add_submodule(&correlation)?;

    Ok(())
}

#[pymodule]
fn sa2_livability(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize_region_key, m)?)?;
    m.add_function(wrap_pyfunction!(load_income, m)?)?;
    m.add_function(wrap_pyfunction!(load_lihs_data, m)?)?;
    m.add_function(wrap_pyfunction!(find_correlations_multiyear, m)?)?;
    m.add_function(wrap_pyfunction!(predict_cost_of_living, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
