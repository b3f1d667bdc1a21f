//! Run configuration.
//!
//! Every constant the analysis depends on lives here so the pipeline can be
//! driven from a TOML file. `Default` reproduces the published analysis.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub paths: PathsConfig,
    pub correlations: CorrelationConfig,
    pub housing: HousingConfig,
    pub plots: PlotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub datasets_dir: PathBuf,
    pub output_csv_dir: PathBuf,
    pub plots_dir: PathBuf,
}

/// One income census year and the datasets correlated against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationYear {
    pub year: i32,
    /// AEDC collection paired with this census year.
    pub aedc_year: i32,
    /// LIHS CSVs (relative to the datasets dir), inner-joined on the key.
    pub lihs_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub years: Vec<CorrelationYear>,
    /// `{year}` is substituted with the census year.
    pub income_file_pattern: String,
    pub aedc_dir: String,
    /// Metrics with |r| strictly above this are plotted.
    pub plot_threshold: f64,
}

/// Allowance constants for one census year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceRates {
    pub year: i32,
    /// Weekly groceries plus bills and transport.
    pub cost_of_living: f64,
    /// Half of the fortnightly Youth Allowance income.
    pub youth_allowance: f64,
    /// Half of the fortnightly Newstart income.
    pub newstart: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub base_year: i32,
    pub target_year: i32,
    pub cpi_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingConfig {
    pub dwelling_file: String,
    pub rent_file: String,
    pub allowances: Vec<AllowanceRates>,
    pub projection: ProjectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    /// TrueType font for titles and labels. When unset, common system
    /// locations are tried; without a font plots are drawn without text.
    pub font_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            datasets_dir: PathBuf::from("Datasets"),
            output_csv_dir: PathBuf::from("OutputCSV"),
            plots_dir: PathBuf::from("Plots"),
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            years: vec![
                CorrelationYear {
                    year: 2011,
                    aedc_year: 2012,
                    lihs_files: vec!["Family-and-Community-2011.csv".to_string()],
                },
                CorrelationYear {
                    year: 2016,
                    aedc_year: 2015,
                    lihs_files: vec!["Family-and-Community-2016.csv".to_string()],
                },
            ],
            income_file_pattern: "income_{year}.csv".to_string(),
            aedc_dir: "AEDC".to_string(),
            plot_threshold: 0.4,
        }
    }
}

impl Default for HousingConfig {
    fn default() -> Self {
        Self {
            dwelling_file:
                "Dwelling-Structure-And-Number-Of-Bedrooms-By-SA2-2006-2011-2016.csv"
                    .to_string(),
            rent_file: "Rent-Weekly-By-SA2-Melbourne-2006-2011-2016.csv".to_string(),
            allowances: vec![
                // 75 groceries + 35 misc; (388.70 + 79.60) / 2 and (486.60 + 79.60) / 2
                AllowanceRates {
                    year: 2011,
                    cost_of_living: 110.0,
                    youth_allowance: 234.15,
                    newstart: 283.1,
                },
                // 87.5 groceries + 42.5 misc; (433.20 + 87.07) / 2 and (528.70 + 87.07) / 2
                AllowanceRates {
                    year: 2016,
                    cost_of_living: 130.0,
                    youth_allowance: 260.135,
                    newstart: 307.89,
                },
                // 100 groceries + 50 misc; (512.50 + 93.87) / 2 and (620.80 + 93.87) / 2
                AllowanceRates {
                    year: 2021,
                    cost_of_living: 150.0,
                    youth_allowance: 303.185,
                    newstart: 357.335,
                },
            ],
            projection: ProjectionConfig::default(),
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            base_year: 2016,
            target_year: 2021,
            cpi_file: "CPI-Housing-Since-2016.csv".to_string(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            font_path: None,
        }
    }
}

impl AnalysisConfig {
    /// Read a TOML config. Keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, AnalysisError> {
        let config: Self =
            toml::from_str(text).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.correlations.years.is_empty() {
            return Err(AnalysisError::Config(
                "correlations.years must list at least one year".into(),
            ));
        }
        if !self.correlations.income_file_pattern.contains("{year}") {
            return Err(AnalysisError::Config(
                "correlations.income_file_pattern must contain '{year}'".into(),
            ));
        }
        for rates in &self.housing.allowances {
            if rates.youth_allowance == 0.0 || rates.newstart == 0.0 {
                return Err(AnalysisError::Config(format!(
                    "allowance income for {} must be non-zero",
                    rates.year
                )));
            }
        }
        if self.allowance_for(self.housing.projection.target_year).is_none() {
            return Err(AnalysisError::Config(format!(
                "no allowance rates for projection target year {}",
                self.housing.projection.target_year
            )));
        }
        Ok(())
    }

    /// Resolve relative paths against `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let paths = &mut self.paths;
        for p in [
            &mut paths.datasets_dir,
            &mut paths.output_csv_dir,
            &mut paths.plots_dir,
        ] {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        }
        if let Some(font) = self.plots.font_path.as_mut() {
            if font.is_relative() {
                *font = root.join(&*font);
            }
        }
        self
    }

    pub fn dataset(&self, relative: &str) -> PathBuf {
        self.paths.datasets_dir.join(relative)
    }

    pub fn income_file(&self, year: i32) -> PathBuf {
        self.dataset(
            &self
                .correlations
                .income_file_pattern
                .replace("{year}", &year.to_string()),
        )
    }

    pub fn allowance_for(&self, year: i32) -> Option<&AllowanceRates> {
        self.housing.allowances.iter().find(|a| a.year == year)
    }
}
