//! Income, early-childhood development and rent analysis over Australian SA2
//! regions.
//!
//! Datasets are joined on a normalized region key, correlated against
//! household income, and turned into cost-of-living proportions for students
//! on allowance incomes. See [`pipeline`] for the two end-to-end runs.

pub mod aggregation;
pub mod config;
pub mod correlation;
pub mod cost_of_living;
pub mod error;
pub mod loaders;
pub mod metadata;
pub mod pipeline;
pub mod region;
pub mod report;
pub mod schema;
pub mod table;
pub mod visualization;

#[cfg(feature = "python")]
mod python;

pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use pipeline::{
    run_correlations, run_cost_of_living, write_correlations, write_cost_of_living,
    CorrelationRun, CostOfLivingRun,
};
pub use region::normalize_region_key;
