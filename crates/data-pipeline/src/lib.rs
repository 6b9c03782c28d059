#![deny(warnings)]

//! Read-only data access for the analytics engines.
//!
//! Loads the district dataset (JSON) and the engine configuration (YAML),
//! validates both at the boundary, and exposes the result as an immutable
//! [`Dataset`] behind the [`DataSource`] trait. Normalization ranges and the
//! national series are computed once at construction.

pub mod synthetic;

use serde::{Deserialize, Serialize};
use spark_core::{
    validate_district, District, DistrictId, EngineConfig, EngineError, RangeTable,
    TimeSeriesPoint,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading data or configuration.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dataset document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("duplicate district id: {0}")]
    DuplicateDistrict(String),
    #[error(transparent)]
    Invalid(#[from] EngineError),
}

/// Read-only access to districts, their migration history and the
/// population normalization ranges.
pub trait DataSource {
    fn districts(&self) -> &[District];

    fn district(&self, id: &DistrictId) -> Option<&District> {
        self.districts().iter().find(|d| &d.id == id)
    }

    /// Yearly migration series of a district, if recorded.
    fn migration_series(&self, id: &DistrictId) -> Option<&[TimeSeriesPoint]>;

    /// Sum of the district series over the years they all cover.
    fn national_series(&self) -> &[TimeSeriesPoint];

    fn ranges(&self) -> &RangeTable;
}

/// One district as it appears in the dataset document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistrictRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
    #[serde(default)]
    pub migration_rate: Option<f64>,
    #[serde(default)]
    pub migration: Vec<TimeSeriesPoint>,
}

/// Dataset document: `{ "districts": [ ... ] }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDocument {
    pub districts: Vec<DistrictRecord>,
}

/// Validated, immutable district table.
#[derive(Clone, Debug)]
pub struct Dataset {
    districts: Vec<District>,
    series: BTreeMap<DistrictId, Vec<TimeSeriesPoint>>,
    national: Vec<TimeSeriesPoint>,
    ranges: RangeTable,
}

impl Dataset {
    /// Validate records and build the table.
    pub fn from_records(records: Vec<DistrictRecord>) -> Result<Self, DataError> {
        let mut seen = BTreeSet::new();
        let mut districts = Vec::with_capacity(records.len());
        let mut series = BTreeMap::new();
        for rec in records {
            let district = District {
                id: DistrictId::new(rec.id.trim()),
                name: rec.name,
                indicators: rec.indicators,
                migration_rate: rec.migration_rate,
            };
            validate_district(&district)?;
            if !seen.insert(district.id.clone()) {
                return Err(DataError::DuplicateDistrict(district.id.0));
            }
            for (i, p) in rec.migration.iter().enumerate() {
                if !p.value.is_finite() || p.value < 0.0 {
                    return Err(EngineError::validation(
                        format!("{}.migration[{i}].value", district.id),
                        format!("must be finite and >= 0, got {}", p.value),
                    )
                    .into());
                }
            }
            if !rec.migration.is_empty() {
                series.insert(district.id.clone(), rec.migration);
            }
            districts.push(district);
        }

        let ranges = RangeTable::from_districts(&districts);
        let national = aggregate_national(&series);
        info!(
            districts = districts.len(),
            with_series = series.len(),
            national_years = national.len(),
            "dataset loaded"
        );
        Ok(Self {
            districts,
            series,
            national,
            ranges,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, DataError> {
        let doc: DatasetDocument = serde_json::from_str(text)?;
        Self::from_records(doc.districts)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Document form of the dataset, for export.
    pub fn to_document(&self) -> DatasetDocument {
        DatasetDocument {
            districts: self
                .districts
                .iter()
                .map(|d| DistrictRecord {
                    id: d.id.0.clone(),
                    name: d.name.clone(),
                    indicators: d.indicators.clone(),
                    migration_rate: d.migration_rate,
                    migration: self.series.get(&d.id).cloned().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

impl DataSource for Dataset {
    fn districts(&self) -> &[District] {
        &self.districts
    }

    fn migration_series(&self, id: &DistrictId) -> Option<&[TimeSeriesPoint]> {
        self.series.get(id).map(Vec::as_slice)
    }

    fn national_series(&self) -> &[TimeSeriesPoint] {
        &self.national
    }

    fn ranges(&self) -> &RangeTable {
        &self.ranges
    }
}

fn aggregate_national(series: &BTreeMap<DistrictId, Vec<TimeSeriesPoint>>) -> Vec<TimeSeriesPoint> {
    let mut totals: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for s in series.values() {
        // a repeated year counts once per district
        let mut years = BTreeSet::new();
        for p in s.iter().filter(|p| years.insert(p.year)) {
            let e = totals.entry(p.year).or_insert((0.0, 0));
            e.0 += p.value;
            e.1 += 1;
        }
    }
    let n = series.len();
    totals
        .into_iter()
        .filter(|(_, (_, count))| *count == n)
        .map(|(year, (total, _))| TimeSeriesPoint::new(year, total))
        .collect()
}

/// Parse and validate an engine configuration document.
pub fn parse_config(text: &str) -> Result<EngineConfig, DataError> {
    let cfg: EngineConfig = serde_yaml::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, DataError> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_core::{ErrorKind, NormalizationRange};

    const DOC: &str = r#"{
        "districts": [
            {"id": "a", "name": "District A",
             "indicators": {"economic": 0.8, "infrastructure": 0.6, "social": 0.4},
             "migration_rate": 12.5,
             "migration": [{"year": 2020, "value": 100}, {"year": 2021, "value": 110}, {"year": 2022, "value": 125}]},
            {"id": "b", "name": "District B",
             "indicators": {"economic": 0.2, "infrastructure": 0.9, "social": 0.4},
             "migration": [{"year": 2021, "value": 50}, {"year": 2022, "value": 55}, {"year": 2023, "value": 60}]},
            {"id": "c", "name": "District C",
             "indicators": {"economic": 0.5, "infrastructure": 0.3, "social": 0.4}}
        ]
    }"#;

    #[test]
    fn loads_and_computes_ranges() {
        let ds = Dataset::from_json_str(DOC).unwrap();
        assert_eq!(ds.districts().len(), 3);
        assert_eq!(
            ds.ranges().get("economic"),
            Some(NormalizationRange { min: 0.2, max: 0.8 })
        );
        assert!(ds.ranges().get("social").unwrap().is_degenerate());
        let c = ds.district(&DistrictId::new("c")).unwrap();
        assert_eq!(c.migration_rate, None);
        assert!(ds.migration_series(&c.id).is_none());
        assert_eq!(ds.migration_series(&DistrictId::new("a")).unwrap().len(), 3);
    }

    #[test]
    fn national_series_covers_shared_years() {
        let ds = Dataset::from_json_str(DOC).unwrap();
        assert_eq!(
            ds.national_series(),
            &[TimeSeriesPoint::new(2021, 160.0), TimeSeriesPoint::new(2022, 180.0)]
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = r#"{"districts": [
            {"id": "a", "name": "A", "indicators": {}},
            {"id": "a", "name": "A again", "indicators": {}}
        ]}"#;
        assert!(matches!(
            Dataset::from_json_str(doc),
            Err(DataError::DuplicateDistrict(id)) if id == "a"
        ));
    }

    #[test]
    fn negative_migration_is_rejected() {
        let doc = r#"{"districts": [
            {"id": "a", "name": "A", "migration": [{"year": 2020, "value": -1}]}
        ]}"#;
        match Dataset::from_json_str(doc) {
            Err(DataError::Invalid(e)) => assert_eq!(e.kind(), ErrorKind::Validation),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let doc = r#"{"districts": [{"id": "a", "name": "A", "population": 5}]}"#;
        assert!(matches!(Dataset::from_json_str(doc), Err(DataError::Json(_))));
    }

    #[test]
    fn empty_id_is_rejected() {
        let doc = r#"{"districts": [{"id": "  ", "name": "A"}]}"#;
        assert!(matches!(Dataset::from_json_str(doc), Err(DataError::Invalid(_))));
    }

    #[test]
    fn document_roundtrip() {
        let ds = Dataset::from_json_str(DOC).unwrap();
        let text = serde_json::to_string(&ds.to_document()).unwrap();
        let back = Dataset::from_json_str(&text).unwrap();
        assert_eq!(back.districts(), ds.districts());
        assert_eq!(back.national_series(), ds.national_series());
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg = parse_config("risk:\n  high: 0.7\n  medium: 0.5\nforecast:\n  adf_level: ten_percent\n").unwrap();
        assert_eq!(cfg.risk.high, 0.7);
        assert_eq!(cfg.simulation.envelope_max, 22.0);
        assert_eq!(cfg.forecast.adf_level, spark_core::AdfLevel::TenPercent);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let text = "weights:\n  - name: economic\n    weight: 0.5\n  - name: social\n    weight: 0.4\n";
        match parse_config(text) {
            Err(DataError::Invalid(e)) => assert_eq!(e.kind(), ErrorKind::Configuration),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn checked_in_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/config/default.yaml");
        let cfg = load_config(path).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }
}
