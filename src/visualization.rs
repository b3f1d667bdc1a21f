/// Visualization module: scatter plots of correlations and cost-of-living
/// proportions.
///
/// Plot content is assembled as plain `ScatterPlot` values extracted from the
/// result tables; rendering goes through the `Plotter` trait so the pipeline
/// can run without touching an image backend. `PngPlotter` draws with
/// `plotters`. Titles and labels need a TrueType font: the configured one or
/// a common system font. Without one, plots are drawn with points only.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use polars::prelude::DataFrame;
use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::config::PlotConfig;
use crate::correlation::PlotRequest;
use crate::cost_of_living::affordability_by_year;
use crate::error::AnalysisError;
use crate::schema::{cost_of_living, housing};
use crate::table::{float_values, key_values};

// ── Plot description ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesColor {
    Green,
    Red,
}

impl SeriesColor {
    fn rgb(self) -> RGBColor {
        match self {
            Self::Green => GREEN,
            Self::Red => RED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScatterSeries {
    pub label: Option<String>,
    pub color: SeriesColor,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct ScatterPlot {
    /// Path relative to the plots directory.
    pub file_name: String,
    /// Pre-wrapped title lines.
    pub title: Vec<String>,
    pub x_label: String,
    pub y_label: String,
    /// Text in the lower-right corner of the plot area.
    pub annotation: Option<String>,
    pub series: Vec<ScatterSeries>,
    pub hide_x_ticks: bool,
}

// ── Naming ──────────────────────────────────────────────────────────────────

const SLUG_LENGTH: usize = 30;
const HASH_LENGTH: usize = 5;
const TITLE_WIDTH: usize = 60;

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^\w-]").expect("slug pattern compiles"))
}

/// Replace anything outside `[\w-]` with `-` and keep the first 30 chars.
pub fn friendly_filename(metric: &str) -> String {
    unsafe_chars()
        .replace_all(metric, "-")
        .chars()
        .take(SLUG_LENGTH)
        .collect()
}

/// First five chars of the URL-safe base64 SHA-1 of the metric name; keeps
/// truncated slugs from colliding.
pub fn name_hash(metric: &str) -> String {
    let digest = Sha1::digest(metric.as_bytes());
    URL_SAFE.encode(digest).chars().take(HASH_LENGTH).collect()
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap_title(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ── Plot builders ───────────────────────────────────────────────────────────

pub fn correlation_plot(request: &PlotRequest) -> ScatterPlot {
    let metric = &request.metric;
    let last_word = metric.split_whitespace().last().unwrap_or_default();
    ScatterPlot {
        file_name: format!(
            "Corrs/{}_{}_{}.png",
            friendly_filename(metric),
            request.year,
            name_hash(metric)
        ),
        title: wrap_title(
            &format!("Income Versus {metric} ({})", request.year),
            TITLE_WIDTH,
        ),
        x_label: "Weekly Household Income ($AUD)".to_string(),
        y_label: format!("Measured Metric {last_word}"),
        annotation: Some(format!("Correlation Strength: {:.4}", request.coefficient)),
        series: vec![ScatterSeries {
            label: None,
            color: SeriesColor::Green,
            points: request.points.clone(),
        }],
        hide_x_ticks: false,
    }
}

/// One plot per census year in the cost-of-living table. Regions are placed
/// by their position within the year; `target_year` is titled as predicted.
pub fn cost_of_living_plots(
    table: &DataFrame,
    target_year: i32,
) -> Result<Vec<ScatterPlot>, AnalysisError> {
    let years = key_values(table, housing::CENSUS_YEAR)?;
    let youth = float_values(table, cost_of_living::YOUTH_ALLOWANCE)?;
    let newstart = float_values(table, cost_of_living::NEWSTART)?;

    let mut by_year: BTreeMap<i64, (Vec<(f64, f64)>, Vec<(f64, f64)>)> = BTreeMap::new();
    for ((year, y), n) in years.iter().zip(&youth).zip(&newstart) {
        let (youth_points, newstart_points) = by_year.entry(*year).or_default();
        let x = youth_points.len().max(newstart_points.len()) as f64;
        if let Some(y) = y {
            youth_points.push((x, *y));
        }
        if let Some(n) = n {
            newstart_points.push((x, *n));
        }
    }

    let summaries = affordability_by_year(table)?;
    let mut plots = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let (youth_points, newstart_points) = by_year
            .remove(&i64::from(summary.year))
            .unwrap_or_default();
        let kind = if summary.year == target_year {
            "Predicted"
        } else {
            "Actual"
        };
        plots.push(ScatterPlot {
            file_name: format!("cost_of_living_scatter_{}.png", summary.year),
            title: vec![format!(
                "{kind} Cost of Living Proportion by Suburb for {}",
                summary.year
            )],
            x_label: format!(
                "Youth Allowance Percentage > 1 = {:.2}%, Newstart Percentage > 1 = {:.2}%",
                summary.youth_allowance_share * 100.0,
                summary.newstart_share * 100.0
            ),
            y_label: "Cost of Living Proportion".to_string(),
            annotation: None,
            series: vec![
                ScatterSeries {
                    label: Some("Youth Allowance".to_string()),
                    color: SeriesColor::Green,
                    points: youth_points,
                },
                ScatterSeries {
                    label: Some("Newstart".to_string()),
                    color: SeriesColor::Red,
                    points: newstart_points,
                },
            ],
            hide_x_ticks: true,
        });
    }
    Ok(plots)
}

// ── Rendering ───────────────────────────────────────────────────────────────

pub trait Plotter {
    fn render(&self, plot: &ScatterPlot, path: &Path) -> Result<(), AnalysisError>;
}

const FONT_FAMILY: &str = "sans-serif";
const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Registers the first readable font once per process. plotters keeps fonts
/// in a global registry, so a later plotter asking for a different
/// `font_path` keeps the first registration and logs a warning.
fn text_enabled(configured: Option<&Path>) -> bool {
    static REGISTERED: OnceLock<Option<PathBuf>> = OnceLock::new();
    let registered = REGISTERED.get_or_init(|| {
        let candidates = configured
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(Path::new));
        for path in candidates {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                debug!(font = %path.display(), "registered plot font");
                return Some(path.to_path_buf());
            }
        }
        warn!("no usable font found, plots are drawn without text");
        None
    });
    if font_ignored(registered.as_deref(), configured) {
        warn!(
            requested = ?configured,
            registered = ?registered,
            "plot font already registered, keeping the first one"
        );
    }
    registered.is_some()
}

/// A configured font that differs from the one already registered.
fn font_ignored(registered: Option<&Path>, configured: Option<&Path>) -> bool {
    configured.is_some_and(|c| registered != Some(c))
}

fn plot_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Plot(e.to_string())
}

fn blank_label(_: &f64) -> String {
    String::new()
}

/// Axis range covering every point with a 5% margin.
fn axis_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad)..(max + pad)
}

/// PNG scatter renderer.
pub struct PngPlotter {
    width: u32,
    height: u32,
    text: bool,
}

impl PngPlotter {
    pub fn new(config: &PlotConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            text: text_enabled(config.font_path.as_deref()),
        }
    }
}

impl Plotter for PngPlotter {
    fn render(&self, plot: &ScatterPlot, path: &Path) -> Result<(), AnalysisError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let points = || plot.series.iter().flat_map(|s| s.points.iter());
        let x_range = axis_range(points().map(|p| p.0));
        let y_range = axis_range(points().map(|p| p.1));

        let title_height = if self.text { 10 + 24 * plot.title.len() as u32 } else { 0 };
        let (title_area, body) = root.split_vertically(title_height);
        if self.text {
            let style = TextStyle::from((FONT_FAMILY, 20).into_font())
                .pos(Pos::new(HPos::Center, VPos::Top));
            for (i, line) in plot.title.iter().enumerate() {
                let y = 6 + 24 * i as i32;
                title_area
                    .draw(&Text::new(line.as_str(), (self.width as i32 / 2, y), style.clone()))
                    .map_err(plot_error)?;
            }
        }

        let mut builder = ChartBuilder::on(&body);
        builder.margin(15);
        if self.text {
            builder.x_label_area_size(45).y_label_area_size(60);
        }
        let mut chart = builder
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_error)?;

        if self.text {
            let mut mesh = chart.configure_mesh();
            mesh.x_desc(plot.x_label.as_str())
                .y_desc(plot.y_label.as_str());
            if plot.hide_x_ticks {
                mesh.x_label_formatter(&blank_label);
            }
            mesh.draw().map_err(plot_error)?;
        }

        for series in &plot.series {
            let color = series.color.rgb();
            let drawn = chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(move |&(x, y)| Circle::new((x, y), 2, color.filled())),
                )
                .map_err(plot_error)?;
            if let Some(label) = &series.label {
                drawn
                    .label(label.as_str())
                    .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
            }
        }

        if self.text {
            if plot.series.iter().any(|s| s.label.is_some()) {
                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .draw()
                    .map_err(plot_error)?;
            }
            if let Some(annotation) = &plot.annotation {
                let (w, h) = body.dim_in_pixel();
                let style = TextStyle::from((FONT_FAMILY, 16).into_font())
                    .pos(Pos::new(HPos::Right, VPos::Bottom));
                body.draw(&Text::new(
                    annotation.as_str(),
                    (w as i32 - 30, h as i32 - 60),
                    style,
                ))
                .map_err(plot_error)?;
            }
        }

        root.present().map_err(plot_error)?;
        debug!(file = %path.display(), "rendered plot");
        Ok(())
    }
}
