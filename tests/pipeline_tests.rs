use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use sa2_livability::report::{COST_OF_LIVING_CSV, PREDICTED_COST_OF_LIVING_CSV};
use sa2_livability::visualization::{Plotter, ScatterPlot};
use sa2_livability::{
    run_correlations, run_cost_of_living, write_correlations, write_cost_of_living,
    AnalysisConfig, AnalysisError,
};
use tempfile::TempDir;

struct Recorder(RefCell<Vec<String>>);

impl Plotter for Recorder {
    fn render(&self, plot: &ScatterPlot, _path: &Path) -> Result<(), AnalysisError> {
        self.0.borrow_mut().push(plot.file_name.clone());
        Ok(())
    }
}

fn write(path: PathBuf, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const AEDC_METADATA: &str = r#"{"selectedAttributes": [
    {"name": "sa2_code16", "title": "SA2 Code (ASGS 2016)."},
    {"name": "vuln_pc_2012", "title": "Developmentally vulnerable (%) 2012"},
    {"name": "vuln_pc_2015", "title": "Developmentally vulnerable (%) 2015"}
]}"#;

const FAMILY_METADATA: &str = r#"{"selectedAttributes": [
    {"name": "sa2_main16", "title": "SA2 Code (ASGS 2016)."},
    {"name": "jobless", "title": "Children in jobless families (%)"},
    {"name": "yr", "title": "Year"}
]}"#;

const INCOME_HEADER: &str =
    "sa2_maincode_2016,equivalised_total_household_income_census_median_weekly\n";

/// Three regions where vulnerability rises with income in 2011 and falls in
/// 2016, plus housing data for two suburbs.
fn fixture() -> (TempDir, AnalysisConfig) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("Datasets");

    write(
        data.join("AEDC/Physical_health.csv"),
        "sa2_code16,vuln_pc_2012,vuln_pc_2015\n21117,10,20\n21122,20,15\n21123,30,10\n",
    );
    write(data.join("AEDC/Physical_health-metadata.json"), AEDC_METADATA);

    write(
        data.join("Family-and-Community-2011.csv"),
        "sa2_main16,jobless,yr\n206041117,5,2011\n206041122,10,2011\n206041123,15,2011\n",
    );
    write(
        data.join("Family-and-Community-2016.csv"),
        "sa2_main16,jobless,yr\n206041117,8,2016\n206041122,12,2016\n206041123,11,2016\n",
    );
    write(data.join("Family-and-Community-2011-metadata.json"), FAMILY_METADATA);
    write(data.join("Family-and-Community-2016-metadata.json"), FAMILY_METADATA);

    write(
        data.join("income_2011.csv"),
        &format!("{INCOME_HEADER}206041117,500\n206041122,700\n206041123,900\n"),
    );
    write(
        data.join("income_2016.csv"),
        &format!("{INCOME_HEADER}206041117,600\n206041122,800\n206041123,1000\n206041124,null\n"),
    );

    let config = AnalysisConfig::default();
    write(
        data.join(&config.housing.dwelling_file),
        "Number of Bedrooms,Dwelling Structure,Region,Census year,Value\n\
         One bedroom,Flat,Carlton,2011,10\n\
         Two bedrooms,Flat,Carlton,2011,10\n\
         Total,Flat,Carlton,2011,20\n\
         Two bedrooms,Flat,Carlton,2016,5\n\
         Not stated,Flat,Carlton,2016,1\n",
    );
    write(
        data.join(&config.housing.rent_file),
        "Dwelling Structure,Rent (weekly),Region,Census year,Value\n\
         Flat,$300-$399,Carlton,2006,3\n\
         Flat,$300-$399,Carlton,2011,4\n\
         Flat,$400-$499,Carlton,2016,2\n\
         Flat,Nil payments,Carlton,2016,7\n\
         Flat,$950 and over,Parkville,2016,1\n",
    );
    write(
        data.join(&config.housing.projection.cpi_file),
        "Quarter,Percentage increase\nSep-2016,10\nDec-2016,20\n",
    );

    let config = config.rooted_at(dir.path());
    (dir, config)
}

#[test]
fn correlations_end_to_end() {
    let (_dir, config) = fixture();
    let run = run_correlations(&config).unwrap();

    assert_eq!(run.table.years, vec![2011, 2016]);
    let metrics: Vec<&str> = run.table.rows.iter().map(|r| r.0.as_str()).collect();
    // ordered by 2016, where vulnerability falls with income
    assert_eq!(
        metrics,
        vec![
            "Children in jobless families (%)",
            "AEDC - Physical health - Developmentally vulnerable (%)",
        ]
    );
    let physical = &run.table.rows[1].1;
    assert!((physical[0].unwrap() - 1.0).abs() < 1e-9);
    assert!((physical[1].unwrap() + 1.0).abs() < 1e-9);

    let recorder = Recorder(RefCell::new(Vec::new()));
    let written = write_correlations(&run, &config, Some(&recorder as &dyn Plotter)).unwrap();
    let csv = fs::read_to_string(&written[0]).unwrap();
    assert!(written[0].ends_with("OutputCSV/Income-LIHS Correlations (2011, 2016).csv"));
    assert!(csv.starts_with(
        "LIHS Metric,Correlation Strength 2011,Correlation Strength 2016\n"
    ));

    let plots = recorder.0.borrow();
    assert_eq!(plots.len(), 4);
    assert!(plots.iter().all(|p| p.starts_with("Corrs/")));
    assert!(plots.iter().any(|p| p.contains("_2016_")));
}

#[test]
fn cost_of_living_end_to_end() {
    let (_dir, config) = fixture();
    let run = run_cost_of_living(&config).unwrap();

    // 2006 has no allowance rates
    assert_eq!(run.actual.height(), 3);
    assert_eq!(run.predicted.height(), 5);
    let years: Vec<i32> = run.affordability.iter().map(|a| a.year).collect();
    assert_eq!(years, vec![2011, 2016, 2021]);

    let recorder = Recorder(RefCell::new(Vec::new()));
    let written = write_cost_of_living(&run, &config, Some(&recorder as &dyn Plotter)).unwrap();
    assert_eq!(written.len(), 4 + 3);
    assert!(written.iter().any(|p| p.ends_with(COST_OF_LIVING_CSV)));

    let predicted = fs::read_to_string(
        config.paths.output_csv_dir.join(PREDICTED_COST_OF_LIVING_CSV),
    )
    .unwrap();
    let lines: Vec<&str> = predicted.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("Region,Census year,Mean rent per person"));
    assert!(lines[3].starts_with("Carlton,2021,"));

    assert_eq!(
        recorder.0.borrow().as_slice(),
        [
            "cost_of_living_scatter_2011.png",
            "cost_of_living_scatter_2016.png",
            "cost_of_living_scatter_2021.png",
        ]
    );
}

#[test]
fn repeated_runs_write_identical_csvs() {
    let (_dir, config) = fixture();

    let snapshot = |config: &AnalysisConfig| -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = write_correlations(&run_correlations(config).unwrap(), config, None)
            .unwrap();
        files.extend(
            write_cost_of_living(&run_cost_of_living(config).unwrap(), config, None).unwrap(),
        );
        files
            .into_iter()
            .map(|p| {
                let bytes = fs::read(&p).unwrap();
                (p, bytes)
            })
            .collect()
    };

    let first = snapshot(&config);
    let second = snapshot(&config);
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn unexpected_rent_bracket_aborts_the_run() {
    let (_dir, config) = fixture();
    fs::write(
        config.dataset(&config.housing.rent_file),
        "Dwelling Structure,Rent (weekly),Region,Census year,Value\n\
         Flat,$1000 and over,Carlton,2016,1\n",
    )
    .unwrap();

    assert!(matches!(
        run_cost_of_living(&config),
        Err(AnalysisError::Invariant(_))
    ));
}

#[test]
fn missing_metadata_title_for_key_is_reported() {
    let (_dir, config) = fixture();
    fs::write(
        config.dataset("Family-and-Community-2011-metadata.json"),
        r#"{"selectedAttributes": [{"name": "jobless", "title": "Jobless"}]}"#,
    )
    .unwrap();

    assert!(matches!(
        run_correlations(&config),
        Err(AnalysisError::MissingColumn(_))
    ));
}
