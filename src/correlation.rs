//! Pearson correlation of household income against every LIHS metric.

use std::cmp::Ordering;
use std::collections::HashMap;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::schema::{correlation, income, lihs, region};
use crate::table::{float_values, is_numeric, key_values};

/// Correlation of one metric with income. `None` when undefined (fewer than
/// two complete pairs, or a constant series).
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub metric: String,
    pub coefficient: Option<f64>,
}

impl Correlation {
    pub fn new(metric: impl Into<String>, coefficient: Option<f64>) -> Self {
        Self {
            metric: metric.into(),
            coefficient,
        }
    }
}

/// Pearson correlation over pairwise complete observations.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|pair| match pair {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Descending by signed value; undefined coefficients go last. Stable.
fn descending_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn rank(mut correlations: Vec<Correlation>) -> Vec<Correlation> {
    correlations.sort_by(|a, b| descending_none_last(a.coefficient, b.coefficient));
    correlations
}

/// Metrics whose absolute correlation is strictly above `threshold`.
pub fn select_for_plot(ranked: &[Correlation], threshold: f64) -> Vec<&Correlation> {
    ranked
        .iter()
        .filter(|c| c.coefficient.is_some_and(|r| r.abs() > threshold))
        .collect()
}

/// Points for one income-versus-metric scatter plot.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub metric: String,
    pub year: i32,
    pub coefficient: f64,
    /// (income, metric value) for regions present in both tables.
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct YearCorrelations {
    pub year: i32,
    pub ranked: Vec<Correlation>,
    pub plots: Vec<PlotRequest>,
}

/// Correlate every numeric metric in `data` with the income series for one
/// year, and collect plot points for metrics above `threshold`.
pub fn find_correlations(
    data: &DataFrame,
    income_df: &DataFrame,
    year: i32,
    threshold: f64,
) -> Result<YearCorrelations, AnalysisError> {
    let income_by_region: HashMap<i64, Option<f64>> = key_values(income_df, region::SA2_CODE)?
        .into_iter()
        .zip(float_values(income_df, income::WEEKLY_INCOME)?)
        .collect();

    let keys = key_values(data, region::SA2_CODE)?;
    let aligned_income: Vec<Option<f64>> = keys
        .iter()
        .map(|k| income_by_region.get(k).copied().flatten())
        .collect();

    let mut correlations = Vec::new();
    let mut metric_values: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    for column in data.get_columns() {
        let name = column.name().as_str();
        if name == region::SA2_CODE || name == lihs::YEAR || !is_numeric(column.dtype()) {
            continue;
        }
        let values = float_values(data, name)?;
        correlations.push(Correlation::new(name, pearson(&values, &aligned_income)));
        metric_values.insert(name.to_string(), values);
    }

    let ranked = rank(correlations);
    let plots: Vec<PlotRequest> = select_for_plot(&ranked, threshold)
        .into_iter()
        .filter_map(|c| {
            let values = metric_values.get(&c.metric)?;
            let points = keys
                .iter()
                .zip(values)
                .filter_map(|(k, v)| {
                    let income = income_by_region.get(k).copied().flatten()?;
                    Some((income, (*v)?))
                })
                .collect();
            Some(PlotRequest {
                metric: c.metric.clone(),
                year,
                coefficient: c.coefficient?,
                points,
            })
        })
        .collect();

    debug!(
        year,
        undefined = ranked.iter().filter(|c| c.coefficient.is_none()).count(),
        "correlation detail"
    );
    info!(year, metrics = ranked.len(), plotted = plots.len(), "computed correlations");
    Ok(YearCorrelations {
        year,
        ranked,
        plots,
    })
}

/// Per-year correlations outer-joined on the metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTable {
    pub years: Vec<i32>,
    /// Metric and one coefficient per entry of `years`.
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

/// Join per-year results and sort by the last year's coefficient
/// (descending, missing last). Earlier years do not affect the order.
pub fn combine_years(results: &[YearCorrelations]) -> CorrelationTable {
    let years: Vec<i32> = results.iter().map(|r| r.year).collect();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<(String, Vec<Option<f64>>)> = Vec::new();

    for (slot, result) in results.iter().enumerate() {
        for c in &result.ranked {
            let row = *index.entry(c.metric.clone()).or_insert_with(|| {
                rows.push((c.metric.clone(), vec![None; years.len()]));
                rows.len() - 1
            });
            rows[row].1[slot] = c.coefficient;
        }
    }

    if !years.is_empty() {
        let last = years.len() - 1;
        rows.sort_by(|a, b| descending_none_last(a.1[last], b.1[last]));
    }
    CorrelationTable { years, rows }
}

impl CorrelationTable {
    pub fn column_name(year: i32) -> String {
        format!("{} {year}", correlation::STRENGTH)
    }

    /// `Income-LIHS Correlations (2011, 2016).csv`
    pub fn report_file_name(&self) -> String {
        let years: Vec<String> = self.years.iter().map(i32::to_string).collect();
        format!("Income-LIHS Correlations ({}).csv", years.join(", "))
    }

    pub fn to_dataframe(&self) -> Result<DataFrame, AnalysisError> {
        let mut columns = vec![Column::new(
            correlation::METRIC.into(),
            self.rows.iter().map(|r| r.0.as_str()).collect::<Vec<_>>(),
        )];
        for (slot, year) in self.years.iter().enumerate() {
            let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.1[slot]).collect();
            columns.push(Column::new(Self::column_name(*year).into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}
