#![deny(warnings)]

//! Core domain models and invariants for the regional imbalance analytics
//! engines.
//!
//! This crate defines the serializable value types exchanged between the
//! scoring, forecast and simulation engines, the shared error taxonomy, the
//! engine configuration, and validation helpers for inputs that arrive from
//! outside the engines.

mod config;
mod error;

pub use config::*;
pub use error::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Allowed deviation of the lever percentage sum from 100.
pub const ALLOCATION_TOLERANCE: f64 = 0.1;

/// Unique identifier of a district, e.g. "d-017".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictId(pub String);

impl DistrictId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A district with its raw socioeconomic indicators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    /// Human-readable name, e.g. "District A".
    pub name: String,
    /// Indicator category -> raw value.
    pub indicators: BTreeMap<String, f64>,
    /// Observed out-migration rate in percent per year, when known.
    #[serde(default)]
    pub migration_rate: Option<f64>,
}

impl District {
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

/// Population range of one indicator, used for min-max scaling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRange {
    pub min: f64,
    pub max: f64,
}

impl NormalizationRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(EngineError::validation(
                "range",
                format!("expected finite min <= max, got [{min}, {max}]"),
            ));
        }
        Ok(Self { min, max })
    }

    /// Range spanned by the finite values; `None` when there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Self>, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

/// Per-indicator ranges computed over a whole district population.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable(pub BTreeMap<String, NormalizationRange>);

impl RangeTable {
    /// Compute ranges for every indicator present in at least one district.
    pub fn from_districts(districts: &[District]) -> Self {
        let mut by_name: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for d in districts {
            for (name, &value) in &d.indicators {
                by_name.entry(name.clone()).or_default().push(value);
            }
        }
        Self(
            by_name
                .into_iter()
                .filter_map(|(name, values)| {
                    NormalizationRange::from_values(values).map(|r| (name, r))
                })
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<NormalizationRange> {
        self.0.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, range: NormalizationRange) {
        self.0.insert(name.into(), range);
    }
}

/// Risk classification of a composite score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
        }
    }
}

/// Normalized value and weighted contribution of one indicator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorContribution {
    pub name: String,
    /// Min-max scaled value in [0,1].
    pub normalized: f64,
    pub weight: f64,
    /// `normalized * weight`.
    pub contribution: f64,
}

/// Composite imbalance score of a district.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeScoreResult {
    pub district_id: DistrictId,
    pub district_name: String,
    /// Weighted score in [0,1]; higher means more imbalance.
    pub score: f64,
    /// 1-based position in the population; `None` until ranked.
    pub rank: Option<usize>,
    pub risk_category: RiskCategory,
    /// Indicators in configuration order.
    pub indicator_breakdown: Vec<IndicatorContribution>,
}

/// One observation of a yearly series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub year: i32,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(year: i32, value: f64) -> Self {
        Self { year, value }
    }
}

/// One forecast step with its confidence band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub year: i32,
    pub point: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Percent change from the previous value (last observation for the
    /// first step); `None` when the previous value is zero.
    pub growth_pct: Option<f64>,
}

impl ForecastPoint {
    pub fn band_width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

/// Orders of an ARIMA(p,d,q) model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Goodness-of-fit of a forecast model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Walk-forward one-step-ahead root mean square error.
    pub rmse: f64,
    /// Walk-forward one-step-ahead mean absolute error.
    pub mae: f64,
    /// Akaike information criterion of the full-sample fit, floored at 0.
    pub aic: f64,
    pub order: ArimaOrder,
    /// Number of held-out points behind `rmse` and `mae`.
    pub validation_points: usize,
    /// Residual variance of the full-sample fit, in series units squared.
    pub sigma2: f64,
}

/// Policy intervention category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lever {
    Jobs,
    Healthcare,
    Education,
    Infrastructure,
}

impl Lever {
    /// Fixed reporting order.
    pub const ALL: [Lever; 4] = [
        Lever::Jobs,
        Lever::Healthcare,
        Lever::Education,
        Lever::Infrastructure,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Lever::Jobs => "jobs",
            Lever::Healthcare => "healthcare",
            Lever::Education => "education",
            Lever::Infrastructure => "infrastructure",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lever::Jobs => "Job Creation Programs",
            Lever::Healthcare => "Healthcare Infrastructure",
            Lever::Education => "Education Quality",
            Lever::Infrastructure => "Physical Infrastructure",
        }
    }
}

/// Budget share per lever, in percent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeverAllocation {
    pub jobs: f64,
    pub healthcare: f64,
    pub education: f64,
    pub infrastructure: f64,
}

impl LeverAllocation {
    pub fn new(jobs: f64, healthcare: f64, education: f64, infrastructure: f64) -> Self {
        Self {
            jobs,
            healthcare,
            education,
            infrastructure,
        }
    }

    /// Suggested starting point for analysts.
    pub fn recommended() -> Self {
        Self::new(40.0, 25.0, 20.0, 15.0)
    }

    pub fn get(&self, lever: Lever) -> f64 {
        match lever {
            Lever::Jobs => self.jobs,
            Lever::Healthcare => self.healthcare,
            Lever::Education => self.education,
            Lever::Infrastructure => self.infrastructure,
        }
    }

    pub fn total(&self) -> f64 {
        Lever::ALL.iter().map(|&l| self.get(l)).sum()
    }

    /// Lever with the largest share; ties go to the earlier lever.
    pub fn dominant(&self) -> Lever {
        Lever::ALL
            .into_iter()
            .fold(Lever::Jobs, |best, l| if self.get(l) > self.get(best) { l } else { best })
    }

    /// Each share in [0,100] and the total within tolerance of 100.
    pub fn validate(&self) -> Result<()> {
        for lever in Lever::ALL {
            let v = self.get(lever);
            if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                return Err(EngineError::allocation(
                    lever.key(),
                    format!("share must be within [0,100], got {v}"),
                ));
            }
        }
        let total = self.total();
        if (total - 100.0).abs() > ALLOCATION_TOLERANCE {
            return Err(EngineError::allocation(
                "total",
                format!("shares must sum to 100, got {total}"),
            ));
        }
        Ok(())
    }
}

/// Baseline and projected value for one year.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub year: i32,
    pub baseline: f64,
    pub projected: f64,
}

/// Money assigned to one lever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub lever: Lever,
    pub label: String,
    pub amount: Decimal,
}

/// Share of the total reduction attributed to one lever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeverImpact {
    pub lever: Lever,
    /// Allocation share in percent.
    pub share_pct: f64,
    /// Reduction points attributed to this lever.
    pub reduction_pct: f64,
    pub low_pct: f64,
    pub high_pct: f64,
}

/// Outcome of a policy simulation over a baseline trajectory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Sum of the baseline trajectory.
    pub baseline: f64,
    /// Sum of the projected trajectory.
    pub projected: f64,
    /// `baseline - projected`.
    pub people_retained: f64,
    /// Reduction in percent after clamping to the envelope.
    pub reduction_pct: f64,
    /// Reduction in percent before clamping.
    pub raw_reduction_pct: f64,
    pub clamped: bool,
    pub best_case: f64,
    pub worst_case: f64,
    pub confidence: f64,
    pub trajectory_comparison: Vec<TrajectoryPoint>,
    pub budget_breakdown: Vec<BudgetLine>,
    pub lever_impacts: Vec<LeverImpact>,
}

/// Validate a yearly series: finite non-negative values, strictly increasing
/// years with a uniform step.
pub fn validate_series(series: &[TimeSeriesPoint]) -> Result<()> {
    for (i, p) in series.iter().enumerate() {
        if !p.value.is_finite() || p.value < 0.0 {
            return Err(EngineError::validation(
                format!("series[{i}].value"),
                format!("must be finite and >= 0, got {}", p.value),
            ));
        }
    }
    let mut first_gap = None;
    for (i, w) in series.windows(2).enumerate() {
        let gap = w[1].year.checked_sub(w[0].year);
        let step = *first_gap.get_or_insert(gap);
        if gap.map_or(true, |g| g <= 0) || gap != step {
            return Err(EngineError::DataOrder {
                index: i + 1,
                year: w[1].year,
                previous: w[0].year,
            });
        }
    }
    Ok(())
}

/// Validate identity and indicator values of a district.
pub fn validate_district(d: &District) -> Result<()> {
    if d.id.0.trim().is_empty() {
        return Err(EngineError::validation("district.id", "must not be empty"));
    }
    for (name, v) in &d.indicators {
        if !v.is_finite() {
            return Err(EngineError::validation(
                format!("{}.indicators.{name}", d.id),
                "non-finite value",
            ));
        }
    }
    if let Some(rate) = d.migration_rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err(EngineError::validation(
                format!("{}.migration_rate", d.id),
                format!("must be finite and >= 0, got {rate}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn series(points: &[(i32, f64)]) -> Vec<TimeSeriesPoint> {
        points.iter().map(|&(y, v)| TimeSeriesPoint::new(y, v)).collect()
    }

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn weights_must_sum_to_one() {
        let w = IndicatorWeights::new([("economic", 0.40), ("infrastructure", 0.35), ("social", 0.20)]);
        let err = w.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn duplicate_weight_names_rejected() {
        let w = IndicatorWeights::new([("economic", 0.5), ("economic", 0.5)]);
        assert!(matches!(w.validate(), Err(EngineError::Configuration { .. })));
    }

    #[test]
    fn risk_thresholds_are_inclusive() {
        let r = RiskThresholds::default();
        assert_eq!(r.classify(0.80), RiskCategory::High);
        assert_eq!(r.classify(0.7999), RiskCategory::Medium);
        assert_eq!(r.classify(0.65), RiskCategory::Medium);
        assert_eq!(r.classify(0.6499), RiskCategory::Low);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let r = RiskThresholds {
            high: 0.6,
            medium: 0.7,
        };
        assert!(r.validate().is_err());
    }

    #[test]
    fn allocation_summing_to_95_is_rejected() {
        let a = LeverAllocation::new(40.0, 25.0, 20.0, 10.0);
        let err = a.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
        assert_eq!(err.field(), Some("total"));
    }

    #[test]
    fn allocation_lever_out_of_range_is_rejected() {
        let a = LeverAllocation::new(120.0, -20.0, 0.0, 0.0);
        let err = a.validate().unwrap_err();
        assert_eq!(err.field(), Some("jobs"));
    }

    #[test]
    fn allocation_tolerance() {
        assert!(LeverAllocation::new(40.05, 25.0, 20.0, 15.0).validate().is_ok());
        assert!(LeverAllocation::recommended().validate().is_ok());
        assert_eq!(LeverAllocation::recommended().dominant(), Lever::Jobs);
    }

    #[test]
    fn series_with_gap_is_data_order_error() {
        let s = series(&[(2020, 1.0), (2021, 2.0), (2023, 3.0)]);
        let err = validate_series(&s).unwrap_err();
        assert_eq!(
            err,
            EngineError::DataOrder {
                index: 2,
                year: 2023,
                previous: 2021
            }
        );
    }

    #[test]
    fn series_going_backwards_is_rejected() {
        let s = series(&[(2021, 1.0), (2020, 2.0)]);
        assert_eq!(validate_series(&s).unwrap_err().kind(), ErrorKind::DataOrder);
    }

    #[test]
    fn extreme_year_gap_is_data_order_error() {
        let s = series(&[(i32::MIN, 1.0), (i32::MAX, 2.0)]);
        assert_eq!(validate_series(&s).unwrap_err().kind(), ErrorKind::DataOrder);
        let s = series(&[(i32::MAX, 1.0), (i32::MIN, 2.0)]);
        assert_eq!(validate_series(&s).unwrap_err().kind(), ErrorKind::DataOrder);
    }

    #[test]
    fn negative_series_value_is_validation_error() {
        let s = series(&[(2020, 1.0), (2021, -2.0)]);
        assert_eq!(validate_series(&s).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn range_table_spans_population() {
        let mk = |id: &str, econ: f64| District {
            id: DistrictId::new(id),
            name: id.to_uppercase(),
            indicators: BTreeMap::from([("economic".to_string(), econ)]),
            migration_rate: None,
        };
        let table = RangeTable::from_districts(&[mk("a", 0.3), mk("b", 0.9), mk("c", 0.5)]);
        assert_eq!(table.get("economic"), Some(NormalizationRange { min: 0.3, max: 0.9 }));
        assert_eq!(table.get("social"), None);
    }

    #[test]
    fn config_serde_roundtrip_with_partial_document() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"simulation":{"sensitivity_delta":3.0}}"#).unwrap();
        assert_eq!(cfg.simulation.sensitivity_delta, 3.0);
        assert_eq!(cfg.simulation.coefficients.jobs, 0.25);
        assert_eq!(cfg.weights.len(), 3);
        let s = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn adf_critical_values_are_ordered() {
        for n in [3usize, 10, 100] {
            assert!(AdfLevel::OnePercent.critical_value(n) < AdfLevel::FivePercent.critical_value(n));
            assert!(AdfLevel::FivePercent.critical_value(n) < AdfLevel::TenPercent.critical_value(n));
        }
    }

    proptest! {
        #[test]
        fn classify_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let r = RiskThresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(r.classify(lo) <= r.classify(hi));
        }

        #[test]
        fn uniform_series_is_valid(start in 1970i32..2050, len in 1usize..20, step in 1i32..5) {
            let s: Vec<_> = (0..len)
                .map(|i| TimeSeriesPoint::new(start + step * i as i32, i as f64))
                .collect();
            prop_assert!(validate_series(&s).is_ok());
        }
    }
}
