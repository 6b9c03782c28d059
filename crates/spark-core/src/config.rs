//! Engine configuration: indicator weights, risk thresholds, forecast model
//! limits and simulation impact coefficients.
//!
//! Every section deserializes with defaults so a partial YAML document is
//! enough. Call [`EngineConfig::validate`] before handing a loaded config to
//! the engines.

use crate::error::{EngineError, Result};
use crate::{Lever, RiskCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weight of a single indicator category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorWeight {
    /// Indicator category, e.g. "economic".
    pub name: String,
    /// Weight in [0,1].
    pub weight: f64,
}

/// Ordered indicator weights. Order drives the score breakdown order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorWeights(pub Vec<IndicatorWeight>);

impl IndicatorWeights {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, weight)| IndicatorWeight {
                    name: name.into(),
                    weight,
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorWeight> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check names are unique, weights finite and non-negative, sum == 1.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(EngineError::configuration("weights", "no indicator weights"));
        }
        let mut seen = BTreeSet::new();
        for w in &self.0 {
            if w.name.trim().is_empty() {
                return Err(EngineError::configuration("weights", "empty indicator name"));
            }
            if !seen.insert(w.name.as_str()) {
                return Err(EngineError::configuration(
                    format!("weights.{}", w.name),
                    "duplicate indicator",
                ));
            }
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(EngineError::configuration(
                    format!("weights.{}", w.name),
                    format!("weight must be finite and >= 0, got {}", w.weight),
                ));
            }
        }
        let sum: f64 = self.0.iter().map(|w| w.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::configuration(
                "weights",
                format!("weights must sum to 1.0, got {sum}"),
            ));
        }
        Ok(())
    }
}

impl Default for IndicatorWeights {
    fn default() -> Self {
        Self::new([("economic", 0.40), ("infrastructure", 0.35), ("social", 0.25)])
    }
}

/// Score thresholds for the risk categories (inclusive lower bounds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.80,
            medium: 0.65,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, score: f64) -> RiskCategory {
        if score >= self.high {
            RiskCategory::High
        } else if score >= self.medium {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = self.medium.is_finite()
            && self.high.is_finite()
            && 0.0 <= self.medium
            && self.medium <= self.high
            && self.high <= 1.0;
        if !ordered {
            return Err(EngineError::configuration(
                "risk",
                format!(
                    "thresholds must satisfy 0 <= medium <= high <= 1, got medium={} high={}",
                    self.medium, self.high
                ),
            ));
        }
        Ok(())
    }
}

/// Significance level of the Dickey-Fuller stationarity test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdfLevel {
    OnePercent,
    FivePercent,
    TenPercent,
}

impl AdfLevel {
    /// MacKinnon (2010) response-surface critical value, constant-only model,
    /// for a regression with `nobs` observations.
    pub fn critical_value(self, nobs: usize) -> f64 {
        let (b0, b1, b2) = match self {
            AdfLevel::OnePercent => (-3.43035, -6.5393, -16.786),
            AdfLevel::FivePercent => (-2.86154, -2.8903, -4.234),
            AdfLevel::TenPercent => (-2.56677, -1.5384, -2.809),
        };
        let t = nobs.max(1) as f64;
        b0 + b1 / t + b2 / (t * t)
    }
}

/// Limits and settings for the ARIMA forecast engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Two-sided confidence level of the forecast band, in (0,1).
    pub confidence_level: f64,
    /// Minimum number of observations to fit (>= 4).
    pub min_history: usize,
    /// Maximum differencing order d (<= 2).
    pub max_differencing: usize,
    /// Largest AR order p searched (<= 3).
    pub max_ar_order: usize,
    /// Largest MA order q searched (<= 3).
    pub max_ma_order: usize,
    /// Stationarity test level.
    pub adf_level: AdfLevel,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            min_history: 4,
            max_differencing: 2,
            max_ar_order: 3,
            max_ma_order: 3,
            adf_level: AdfLevel::FivePercent,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(EngineError::configuration(
                "forecast.confidence_level",
                format!("must be in (0,1), got {}", self.confidence_level),
            ));
        }
        if self.min_history < 4 {
            return Err(EngineError::configuration(
                "forecast.min_history",
                "at least 4 observations are required",
            ));
        }
        if self.max_differencing > 2 {
            return Err(EngineError::configuration(
                "forecast.max_differencing",
                "differencing order above 2 is not supported",
            ));
        }
        if self.max_ar_order > 3 || self.max_ma_order > 3 {
            return Err(EngineError::configuration(
                "forecast.max_order",
                "AR and MA orders are searched in 0..=3",
            ));
        }
        Ok(())
    }
}

/// Maximum marginal reduction (fraction) per lever when it receives the
/// whole budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverCoefficients {
    pub jobs: f64,
    pub healthcare: f64,
    pub education: f64,
    pub infrastructure: f64,
}

impl Default for LeverCoefficients {
    fn default() -> Self {
        Self {
            jobs: 0.25,
            healthcare: 0.15,
            education: 0.12,
            infrastructure: 0.10,
        }
    }
}

impl LeverCoefficients {
    pub fn get(&self, lever: Lever) -> f64 {
        match lever {
            Lever::Jobs => self.jobs,
            Lever::Healthcare => self.healthcare,
            Lever::Education => self.education,
            Lever::Infrastructure => self.infrastructure,
        }
    }
}

/// Impact model constants for the policy simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub coefficients: LeverCoefficients,
    /// Lower bound of the plausible reduction envelope, percent.
    pub envelope_min: f64,
    /// Upper bound of the plausible reduction envelope, percent.
    pub envelope_max: f64,
    /// Spread between the central estimate and best/worst case, percent points.
    pub sensitivity_delta: f64,
    /// Reported model trust, percent. Not derived from data.
    pub confidence: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            coefficients: LeverCoefficients::default(),
            envelope_min: 1.5,
            envelope_max: 22.0,
            sensitivity_delta: 4.5,
            confidence: 86.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        for lever in Lever::ALL {
            let c = self.coefficients.get(lever);
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(EngineError::configuration(
                    format!("simulation.coefficients.{}", lever.key()),
                    format!("must be in [0,1], got {c}"),
                ));
            }
        }
        let envelope_ok = self.envelope_min.is_finite()
            && self.envelope_max.is_finite()
            && 0.0 <= self.envelope_min
            && self.envelope_min <= self.envelope_max
            && self.envelope_max <= 100.0;
        if !envelope_ok {
            return Err(EngineError::configuration(
                "simulation.envelope",
                format!(
                    "must satisfy 0 <= min <= max <= 100, got [{}, {}]",
                    self.envelope_min, self.envelope_max
                ),
            ));
        }
        if !self.sensitivity_delta.is_finite() || self.sensitivity_delta < 0.0 {
            return Err(EngineError::configuration(
                "simulation.sensitivity_delta",
                "must be finite and >= 0",
            ));
        }
        if !self.confidence.is_finite() || !(0.0..=100.0).contains(&self.confidence) {
            return Err(EngineError::configuration(
                "simulation.confidence",
                "must be a percentage in [0,100]",
            ));
        }
        Ok(())
    }
}

/// Full engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: IndicatorWeights,
    pub risk: RiskThresholds,
    pub forecast: ForecastConfig,
    pub simulation: SimulationConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.risk.validate()?;
        self.forecast.validate()?;
        self.simulation.validate()
    }
}
