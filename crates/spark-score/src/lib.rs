#![deny(warnings)]
#![warn(missing_docs)]

//! Composite imbalance scoring.
//!
//! Raw district indicators are min-max scaled against the population range,
//! weighted, and summed into a score in [0,1]. Scores are then ranked and
//! classified into risk categories.

use serde::Serialize;
use spark_core::{
    CompositeScoreResult, District, EngineError, IndicatorContribution, IndicatorWeights,
    RangeTable, Result, RiskThresholds,
};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// Min-max scale `value` into [0,1].
///
/// A flat indicator (`min == max`) contributes neutrally with 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Composite score of one district. The result is unranked.
///
/// Fails with a configuration error when the weights do not sum to 1 or a
/// weighted category has no population range, and with
/// [`EngineError::UnknownIndicator`] when the district lacks a weighted
/// category.
pub fn score_district(
    district: &District,
    weights: &IndicatorWeights,
    ranges: &RangeTable,
    thresholds: &RiskThresholds,
) -> Result<CompositeScoreResult> {
    weights.validate()?;

    let mut breakdown = Vec::with_capacity(weights.len());
    for w in weights.iter() {
        let raw = district
            .indicator(&w.name)
            .ok_or_else(|| EngineError::UnknownIndicator {
                district: district.id.to_string(),
                indicator: w.name.clone(),
            })?;
        if !raw.is_finite() {
            return Err(EngineError::validation(
                format!("{}.indicators.{}", district.id, w.name),
                "non-finite value",
            ));
        }
        let range = ranges.get(&w.name).ok_or_else(|| {
            EngineError::configuration(
                format!("ranges.{}", w.name),
                "no normalization range for weighted indicator",
            )
        })?;
        let normalized = normalize(raw, range.min, range.max);
        breakdown.push(IndicatorContribution {
            name: w.name.clone(),
            normalized,
            weight: w.weight,
            contribution: normalized * w.weight,
        });
    }

    // weights may sum to 1 +- tolerance
    let score = breakdown
        .iter()
        .map(|c| c.contribution)
        .sum::<f64>()
        .clamp(0.0, 1.0);
    let risk_category = thresholds.classify(score);
    debug!(district = %district.id, score, ?risk_category, "scored district");

    Ok(CompositeScoreResult {
        district_id: district.id.clone(),
        district_name: district.name.clone(),
        score,
        rank: None,
        risk_category,
        indicator_breakdown: breakdown,
    })
}

/// Sort by score descending, ties by district id ascending, and assign
/// 1-based ranks.
pub fn rank_districts(mut results: Vec<CompositeScoreResult>) -> Vec<CompositeScoreResult> {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.district_id.cmp(&b.district_id))
    });
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = Some(i + 1);
    }
    results
}

/// Score and rank a whole population.
pub fn score_population(
    districts: &[District],
    weights: &IndicatorWeights,
    ranges: &RangeTable,
    thresholds: &RiskThresholds,
) -> Result<Vec<CompositeScoreResult>> {
    let scored = districts
        .iter()
        .map(|d| score_district(d, weights, ranges, thresholds))
        .collect::<Result<Vec<_>>>()?;
    Ok(rank_districts(scored))
}

/// Pearson correlation between paired scores and migration rates.
pub fn correlation(scores: &[f64], migration_rates: &[f64]) -> Result<f64> {
    if scores.len() != migration_rates.len() {
        return Err(EngineError::validation(
            "migration_rates",
            format!(
                "expected {} values to pair with scores, got {}",
                scores.len(),
                migration_rates.len()
            ),
        ));
    }
    let n = scores.len();
    if n < 2 {
        return Err(EngineError::insufficient_data("correlation pairs", 2, n));
    }
    if scores.iter().chain(migration_rates).any(|v| !v.is_finite()) {
        return Err(EngineError::validation("correlation", "non-finite observation"));
    }

    let nf = n as f64;
    let mx = scores.iter().sum::<f64>() / nf;
    let my = migration_rates.iter().sum::<f64>() / nf;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&x, &y) in scores.iter().zip(migration_rates) {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    // rounding in the mean leaves a tiny sxx for constant inputs like 0.1
    if sxx <= 0.0 || is_constant(scores) {
        return Err(EngineError::insufficient_data("scores (zero variance)", 2, 1));
    }
    if syy <= 0.0 || is_constant(migration_rates) {
        return Err(EngineError::insufficient_data("migration_rates (zero variance)", 2, 1));
    }
    Ok((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Pearson r with its two-sided significance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationTest {
    /// Pearson coefficient in [-1,1].
    pub r: f64,
    /// Number of paired observations.
    pub n: usize,
    /// Student-t p-value with n-2 degrees of freedom; `None` for n < 3.
    pub p_value: Option<f64>,
}

/// [`correlation`] plus its significance. Fails exactly when
/// [`correlation`] does.
pub fn correlation_test(scores: &[f64], migration_rates: &[f64]) -> Result<CorrelationTest> {
    let r = correlation(scores, migration_rates)?;
    let n = scores.len();
    Ok(CorrelationTest {
        r,
        n,
        p_value: p_value(r, n),
    })
}

fn p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return Some(0.0);
    }
    let t = r.abs() * (df / denom).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t))).clamp(0.0, 1.0))
}
