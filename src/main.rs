use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sa2_livability::visualization::{PngPlotter, Plotter};
use sa2_livability::{
    run_correlations, run_cost_of_living, write_correlations, write_cost_of_living,
    AnalysisConfig,
};

#[derive(Parser)]
#[command(
    name = "sa2-livability",
    version,
    about = "Income, LIHS and cost-of-living analysis over SA2 regions"
)]
struct Cli {
    /// TOML config; relative paths inside it resolve against its directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root for the default relative paths when no config is given
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Write CSV reports only
    #[arg(long, global = true)]
    no_plots: bool,
    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate household income with every LIHS metric
    Correlations,
    /// Cost-of-living proportions and the CPI projection
    CostOfLiving,
    /// Both analyses
    All,
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    match &cli.config {
        Some(path) => {
            let config = AnalysisConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            let root = path.parent().map(PathBuf::from).unwrap_or_default();
            Ok(config.rooted_at(&root))
        }
        None => {
            let root = match &cli.data_dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()?,
            };
            Ok(AnalysisConfig::default().rooted_at(&root))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "sa2_livability=debug" } else { "sa2_livability=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&cli)?;
    let png = (!cli.no_plots).then(|| PngPlotter::new(&config.plots));
    let plotter = png.as_ref().map(|p| p as &dyn Plotter);

    let mut written = Vec::new();
    if matches!(cli.command, Commands::Correlations | Commands::All) {
        let run = run_correlations(&config).context("correlation analysis failed")?;
        written.extend(write_correlations(&run, &config, plotter)?);
    }
    if matches!(cli.command, Commands::CostOfLiving | Commands::All) {
        let run = run_cost_of_living(&config).context("cost-of-living analysis failed")?;
        written.extend(write_cost_of_living(&run, &config, plotter)?);
    }

    tracing::info!(files = written.len(), "done");
    Ok(())
}
