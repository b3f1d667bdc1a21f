//! Attribute metadata sidecars and the column renames they imply.
//!
//! AURIN/AEDC extracts ship with `{stem}-metadata.json` describing each
//! machine column name and its human title. The lookup is built once per file
//! and applied to the raw headers with whitespace removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::schema::region;
use crate::table::{coerce_numeric_columns, read_csv_as_strings};

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct AttributeMetadata {
    #[serde(rename = "selectedAttributes")]
    selected_attributes: Vec<MetadataRecord>,
}

/// Machine name → human title. First record wins for duplicated names.
#[derive(Debug, Default, Clone)]
pub struct ColumnRenames {
    titles: HashMap<String, String>,
}

impl ColumnRenames {
    pub fn from_records(records: Vec<MetadataRecord>) -> Self {
        let mut titles = HashMap::with_capacity(records.len());
        for record in records {
            titles.entry(record.name).or_insert(record.title);
        }
        Self { titles }
    }

    pub fn from_json(json: &str, path: &Path) -> Result<Self, AnalysisError> {
        let meta: AttributeMetadata =
            serde_json::from_str(json).map_err(|source| AnalysisError::Metadata {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_records(meta.selected_attributes))
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, path)
    }

    /// Title for a raw header, matched with all whitespace removed.
    pub fn title_for(&self, raw_header: &str) -> Option<&str> {
        let compact: String = raw_header.chars().filter(|c| !c.is_whitespace()).collect();
        self.titles.get(&compact).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Rename matched columns, fix up the key header, cast the key to Int64
    /// and move it to the front.
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame, AnalysisError> {
        let mut df = df;
        let renamed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|raw| {
                let name = self.title_for(raw).unwrap_or(*raw);
                if name == region::SA2_CODE_RAW {
                    region::SA2_CODE.to_string()
                } else {
                    name.to_string()
                }
            })
            .collect();
        let matched = df
            .get_column_names_str()
            .iter()
            .filter(|raw| self.title_for(raw).is_some())
            .count();
        if matched == 0 && !self.is_empty() {
            warn!(titles = self.len(), "no column matched the metadata names");
        }
        df.set_column_names(renamed.iter().map(String::as_str))?;

        if df.column(region::SA2_CODE).is_err() {
            return Err(AnalysisError::MissingColumn(region::SA2_CODE.to_string()));
        }

        let mut order = vec![col(region::SA2_CODE).strict_cast(DataType::Int64)];
        order.extend(
            renamed
                .iter()
                .filter(|c| c.as_str() != region::SA2_CODE)
                .map(|c| col(c.as_str())),
        );
        Ok(df.lazy().select(order).collect()?)
    }
}

/// `Datasets/foo.csv` → `Datasets/foo-metadata.json`.
pub fn metadata_path_for(csv_path: &Path) -> PathBuf {
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    csv_path.with_file_name(format!("{stem}-metadata.json"))
}

/// Load a CSV and rename its columns from the sidecar metadata file.
/// Every column made of numbers and missing-value markers becomes Float64.
pub fn load_with_metadata(csv_path: &Path) -> Result<DataFrame, AnalysisError> {
    let meta_path = metadata_path_for(csv_path);
    let renames = ColumnRenames::load(&meta_path)?;
    let raw = read_csv_as_strings(csv_path)?;
    debug!(
        file = %csv_path.display(),
        columns = raw.width(),
        titles = renames.len(),
        "loaded metadata-described csv"
    );
    coerce_numeric_columns(renames.apply(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: &str = r#"{
        "selectedAttributes": [
            {"name": "sa2_main16", "title": "SA2 Code (ASGS 2016)."},
            {"name": "pc_child_vuln", "title": "Children vulnerable (%)"},
            {"name": "pc_child_vuln", "title": "Ignored duplicate"}
        ]
    }"#;

    fn renames() -> ColumnRenames {
        ColumnRenames::from_json(META, Path::new("meta.json")).unwrap()
    }

    #[test]
    fn lookup_ignores_whitespace_and_keeps_first_title() {
        let r = renames();
        assert_eq!(r.title_for(" pc_child _vuln"), Some("Children vulnerable (%)"));
        assert_eq!(r.title_for("unknown"), None);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn apply_renames_and_indexes_by_key() {
        let df = DataFrame::new(vec![
            Column::new(" pc_child_vuln".into(), &[10.5f64, 20.0]),
            Column::new("other".into(), &[1i64, 2]),
            Column::new("sa2_main16".into(), &["21122", "21123"]),
        ])
        .unwrap();

        let out = renames().apply(df).unwrap();
        assert_eq!(
            out.get_column_names_str(),
            vec![region::SA2_CODE, "Children vulnerable (%)", "other"]
        );
        assert_eq!(out.column(region::SA2_CODE).unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn missing_key_is_a_missing_column_error() {
        let df = DataFrame::new(vec![Column::new("other".into(), &[1i64])]).unwrap();
        assert!(matches!(
            renames().apply(df),
            Err(AnalysisError::MissingColumn(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_metadata_error() {
        let err = ColumnRenames::from_json("{\"selectedAttributes\": 3}", Path::new("m.json"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Metadata { .. }));
    }

    #[test]
    fn sidecar_path_sits_next_to_csv() {
        assert_eq!(
            metadata_path_for(Path::new("Datasets/AEDC/Physical_health.csv")),
            PathBuf::from("Datasets/AEDC/Physical_health-metadata.json")
        );
    }
}
