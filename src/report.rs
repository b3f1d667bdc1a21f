//! Output files: CSV reports and rendered plots.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::info;

use crate::error::AnalysisError;
use crate::table::write_csv;
use crate::visualization::{Plotter, ScatterPlot};

pub const AVERAGE_BEDROOMS_CSV: &str = "Average-Number-of-Bedrooms-Per-Dwelling-Structure.csv";
pub const RENT_PER_PERSON_CSV: &str = "Average-Weekly-Rent-Per-Person.csv";
pub const COST_OF_LIVING_CSV: &str = "Cost-of-Living-By-SA2-Year.csv";
pub const PREDICTED_COST_OF_LIVING_CSV: &str = "Predicted-Cost-of-Living-By-SA2-Year.csv";

/// Write `df` to `dir/name`, replacing any previous run's file.
pub fn write_table(df: &DataFrame, dir: &Path, name: &str) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(name);
    let mut df = df.clone();
    write_csv(&mut df, &path)?;
    info!(file = %path.display(), rows = df.height(), "wrote report");
    Ok(path)
}

/// Render each plot under `plots_dir`, returning the written paths.
pub fn render_plots(
    plotter: &dyn Plotter,
    plots: &[ScatterPlot],
    plots_dir: &Path,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut written = Vec::with_capacity(plots.len());
    for plot in plots {
        let path = plots_dir.join(&plot.file_name);
        plotter.render(plot, &path)?;
        written.push(path);
    }
    if !plots.is_empty() {
        info!(dir = %plots_dir.display(), plots = written.len(), "rendered plots");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Recorder(RefCell<Vec<PathBuf>>);

    impl Plotter for Recorder {
        fn render(&self, _plot: &ScatterPlot, path: &Path) -> Result<(), AnalysisError> {
            self.0.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn tables_overwrite_previous_output() {
        let dir = TempDir::new().unwrap();
        let first = DataFrame::new(vec![Column::new("a".into(), &[1i64, 2, 3])]).unwrap();
        let second = DataFrame::new(vec![Column::new("a".into(), &[9i64])]).unwrap();

        write_table(&first, dir.path(), "out.csv").unwrap();
        let path = write_table(&second, dir.path(), "out.csv").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a\n9\n");
    }

    #[test]
    fn plots_land_under_plot_dir() {
        let recorder = Recorder(RefCell::new(Vec::new()));
        let plot = ScatterPlot {
            file_name: "Corrs/x.png".to_string(),
            title: vec![],
            x_label: String::new(),
            y_label: String::new(),
            annotation: None,
            series: vec![],
            hide_x_ticks: false,
        };
        let written = render_plots(&recorder, &[plot], Path::new("/tmp/plots")).unwrap();
        assert_eq!(written, vec![PathBuf::from("/tmp/plots/Corrs/x.png")]);
        assert_eq!(recorder.0.borrow().len(), 1);
    }
}
