#![deny(warnings)]

//! Baseline migration forecasting.
//!
//! Fits an ARIMA(p,d,q) model to a yearly series and projects it forward with
//! Gaussian confidence bands:
//! - `d` is chosen by repeated Dickey-Fuller testing (at most 2 differences)
//! - `p, q ∈ 0..=3` by exhaustive AIC grid search on the differenced series
//! - RMSE/MAE come from walk-forward one-step-ahead validation
//!
//! The whole procedure is deterministic: identical input yields bit-identical
//! output.

mod arma;
mod optimize;
mod stationarity;

use arma::ArimaModel;
use serde::{Deserialize, Serialize};
use spark_core::{
    validate_series, EngineError, FitDiagnostics, ForecastConfig, ForecastPoint, Result,
    TimeSeriesPoint,
};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

/// Forecast points with the diagnostics of the model that produced them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub diagnostics: FitDiagnostics,
    /// Two-sided level of the bands, e.g. 0.95.
    pub confidence_level: f64,
}

/// Headline numbers of a forecast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    /// Sum of the point forecasts over the horizon.
    pub total_projection: f64,
    /// Mean of the defined yearly growth rates, percent.
    pub annual_growth_pct: f64,
    /// Band level in percent.
    pub confidence_pct: f64,
}

impl Forecast {
    pub fn summary(&self) -> ForecastSummary {
        let growth: Vec<f64> = self.points.iter().filter_map(|p| p.growth_pct).collect();
        let annual_growth_pct = if growth.is_empty() {
            0.0
        } else {
            growth.iter().sum::<f64>() / growth.len() as f64
        };
        ForecastSummary {
            total_projection: self.points.iter().map(|p| p.point).sum(),
            annual_growth_pct,
            confidence_pct: self.confidence_level * 100.0,
        }
    }

    /// Point forecasts as a series, floored at zero, for use as a policy
    /// simulation baseline.
    pub fn baseline_trajectory(&self) -> Vec<TimeSeriesPoint> {
        self.points
            .iter()
            .map(|p| TimeSeriesPoint::new(p.year, p.point.max(0.0)))
            .collect()
    }
}

/// Fit a model to `series` and forecast `horizon` steps ahead.
///
/// Fails with [`EngineError::InsufficientHistory`] below the minimum history,
/// [`EngineError::DataOrder`] on non-monotonic or gapped years, and a
/// validation error for a zero horizon or negative values.
pub fn fit(series: &[TimeSeriesPoint], horizon: usize, cfg: &ForecastConfig) -> Result<Forecast> {
    cfg.validate()?;
    if horizon < 1 {
        return Err(EngineError::validation("horizon", "must be >= 1"));
    }
    if series.len() < cfg.min_history {
        return Err(EngineError::InsufficientHistory {
            required: cfg.min_history,
            available: series.len(),
        });
    }
    validate_series(series)?;
    let last = series[series.len() - 1];
    let step = series[1].year - series[0].year;
    let years = (1..=horizon)
        .map(|k| {
            i32::try_from(k)
                .ok()
                .and_then(|k| step.checked_mul(k))
                .and_then(|offset| last.year.checked_add(offset))
        })
        .collect::<Option<Vec<i32>>>()
        .ok_or_else(|| {
            EngineError::validation("horizon", format!("years past {} overflow", last.year))
        })?;

    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    let model = ArimaModel::select(&values, cfg)?;
    let z = gaussian_quantile(cfg.confidence_level)?;
    let (rmse, mae, validation_points) = walk_forward(&values, cfg)?;

    let mut previous = last.value;
    let points = model
        .forecast(horizon)
        .into_iter()
        .zip(model.forecast_variances(horizon))
        .zip(years)
        .map(|((point, variance), year)| {
            let half = z * variance.sqrt();
            let growth_pct = (previous != 0.0).then(|| (point / previous - 1.0) * 100.0);
            previous = point;
            ForecastPoint {
                year,
                point,
                lower_bound: point - half,
                upper_bound: point + half,
                growth_pct,
            }
        })
        .collect();

    let diagnostics = FitDiagnostics {
        rmse,
        mae,
        aic: model.arma.aic.max(0.0),
        order: model.order,
        validation_points,
        sigma2: model.arma.sigma2,
    };
    debug!(order = %diagnostics.order, rmse, mae, horizon, "forecast complete");

    Ok(Forecast {
        points,
        diagnostics,
        confidence_level: cfg.confidence_level,
    })
}

/// One-step-ahead errors from refitting on every prefix of at least
/// `min_history` points. Returns `(rmse, mae, count)`.
fn walk_forward(values: &[f64], cfg: &ForecastConfig) -> Result<(f64, f64, usize)> {
    let mut sq = 0.0;
    let mut abs = 0.0;
    let mut count = 0usize;
    for end in cfg.min_history..values.len() {
        let model = ArimaModel::select(&values[..end], cfg)?;
        let predicted = model.forecast(1)[0];
        let err = values[end] - predicted;
        sq += err * err;
        abs += err.abs();
        count += 1;
    }
    if count == 0 {
        return Ok((0.0, 0.0, 0));
    }
    let n = count as f64;
    Ok(((sq / n).sqrt(), abs / n, count))
}

fn gaussian_quantile(level: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| EngineError::configuration("forecast.confidence_level", e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + level / 2.0))
}
