//! ARMA(p,q) fitting by conditional sum of squares and ARIMA forecasting.

use crate::optimize::nelder_mead;
use crate::stationarity::integrate_levels;
use spark_core::{ArimaOrder, EngineError, ForecastConfig, Result};
use std::f64::consts::PI;
use tracing::{debug, trace};

/// Objective value for coefficient sets outside the stationary/invertible
/// region.
const REJECTED: f64 = 1e12;

/// ARMA(p,q) with intercept fitted to one (already differenced) series.
///
/// Coefficients live on the standardized scale `z = (w - mean) / scale`.
#[derive(Clone, Debug)]
pub(crate) struct ArmaFit {
    pub p: usize,
    pub q: usize,
    mean: f64,
    scale: f64,
    intercept: f64,
    pub phi: Vec<f64>,
    pub theta: Vec<f64>,
    z: Vec<f64>,
    residuals: Vec<f64>,
    /// Residual variance on the series scale.
    pub sigma2: f64,
    pub aic: f64,
}

/// Conditional residuals; the first `p` are fixed at zero.
fn css_residuals(z: &[f64], p: usize, q: usize, params: &[f64]) -> (f64, Vec<f64>) {
    let c = params[0];
    let phi = &params[1..1 + p];
    let theta = &params[1 + p..1 + p + q];
    let mut e = vec![0.0; z.len()];
    let mut sse = 0.0;
    for t in p..z.len() {
        let mut pred = c;
        for (i, f) in phi.iter().enumerate() {
            pred += f * z[t - 1 - i];
        }
        for (j, th) in theta.iter().enumerate() {
            if t > j {
                pred += th * e[t - 1 - j];
            }
        }
        e[t] = z[t] - pred;
        sse += e[t] * e[t];
    }
    (sse, e)
}

fn admissible(p: usize, params: &[f64]) -> bool {
    let phi_sum: f64 = params[1..1 + p].iter().map(|v| v.abs()).sum();
    let theta_sum: f64 = params[1 + p..].iter().map(|v| v.abs()).sum();
    phi_sum < 1.0 && theta_sum < 1.0
}

fn gaussian_aic(n_eff: usize, sigma2: f64, k: usize) -> f64 {
    let n = n_eff as f64;
    n * ((2.0 * PI * sigma2.max(f64::MIN_POSITIVE)).ln() + 1.0) + 2.0 * k as f64
}

/// Fit one candidate order; `None` when the series is too short for it or the
/// order cannot be estimated.
pub(crate) fn fit_arma(w: &[f64], p: usize, q: usize) -> Option<ArmaFit> {
    let n = w.len();
    if n <= p {
        return None;
    }
    let n_eff = n - p;
    if n_eff < p + q + 2 {
        return None;
    }

    let mean = w.iter().sum::<f64>() / n as f64;
    let var = w.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    if var <= 0.0 {
        // constant: only the mean model is identifiable
        if p + q > 0 {
            return None;
        }
        return Some(ArmaFit {
            p,
            q,
            mean,
            scale: 1.0,
            intercept: 0.0,
            phi: Vec::new(),
            theta: Vec::new(),
            z: vec![0.0; n],
            residuals: vec![0.0; n],
            sigma2: 0.0,
            aic: gaussian_aic(n_eff, 0.0, 2),
        });
    }
    let scale = var.sqrt();
    let z: Vec<f64> = w.iter().map(|v| (v - mean) / scale).collect();

    let params = if p + q == 0 {
        vec![z.iter().sum::<f64>() / n as f64]
    } else {
        let dims = 1 + p + q;
        let objective = |x: &[f64]| {
            if !admissible(p, x) {
                return REJECTED;
            }
            let (sse, _) = css_residuals(&z, p, q, x);
            if sse.is_finite() {
                sse
            } else {
                REJECTED
            }
        };
        let min = nelder_mead(objective, &vec![0.0; dims], 0.1, 400 * dims, 1e-10);
        if min.value >= REJECTED {
            trace!(p, q, "no admissible parameters");
            return None;
        }
        trace!(p, q, css = min.value, "simplex converged");
        min.x
    };

    let (sse, residuals) = css_residuals(&z, p, q, &params);
    let sigma2 = sse / n_eff as f64 * var;
    let aic = gaussian_aic(n_eff, sigma2, p + q + 2);
    trace!(p, q, sigma2, aic, "candidate fitted");

    Some(ArmaFit {
        p,
        q,
        mean,
        scale,
        intercept: params[0],
        phi: params[1..1 + p].to_vec(),
        theta: params[1 + p..].to_vec(),
        z,
        residuals,
        sigma2,
        aic,
    })
}

impl ArmaFit {
    /// Recursive point forecasts on the series scale; future shocks are zero.
    pub(crate) fn forecast(&self, horizon: usize) -> Vec<f64> {
        let n = self.z.len();
        let mut z = self.z.clone();
        let mut e = self.residuals.clone();
        for _ in 0..horizon {
            let t = z.len();
            let mut pred = self.intercept;
            for (i, f) in self.phi.iter().enumerate() {
                pred += f * z[t - 1 - i];
            }
            for (j, th) in self.theta.iter().enumerate() {
                pred += th * e[t - 1 - j];
            }
            z.push(pred);
            e.push(0.0);
        }
        z[n..].iter().map(|v| self.mean + self.scale * v).collect()
    }
}

/// A selected ARIMA(p,d,q) model over the full series.
#[derive(Clone, Debug)]
pub(crate) struct ArimaModel {
    pub order: ArimaOrder,
    pub arma: ArmaFit,
    /// `levels[k]` is the k-th difference of the input series.
    levels: Vec<Vec<f64>>,
}

impl ArimaModel {
    /// Choose `d` by repeated stationarity testing, then grid-search `p` and
    /// `q` for the lowest AIC. Earlier (simpler) candidates win ties.
    pub(crate) fn select(values: &[f64], cfg: &ForecastConfig) -> Result<Self> {
        let levels = integrate_levels(values, cfg.max_differencing, cfg.adf_level);
        let d = levels.len() - 1;
        let w = &levels[d];

        let mut best: Option<ArmaFit> = None;
        for p in 0..=cfg.max_ar_order {
            for q in 0..=cfg.max_ma_order {
                let Some(fit) = fit_arma(w, p, q) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| fit.aic < b.aic) {
                    best = Some(fit);
                }
            }
        }
        let arma = best.ok_or(EngineError::InsufficientHistory {
            required: cfg.min_history,
            available: values.len(),
        })?;
        let order = ArimaOrder {
            p: arma.p,
            d,
            q: arma.q,
        };
        debug!(%order, aic = arma.aic, sigma2 = arma.sigma2, "model selected");
        Ok(Self {
            order,
            arma,
            levels,
        })
    }

    /// Point forecasts on the original scale.
    pub(crate) fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut out = self.arma.forecast(horizon);
        for level in self.levels[..self.order.d].iter().rev() {
            let mut last = level.last().copied().unwrap_or(0.0);
            for v in out.iter_mut() {
                last += *v;
                *v = last;
            }
        }
        out
    }

    /// ψ-weights of the integrated model: `φ(B)(1-B)^d ψ(B) = θ(B)`.
    pub(crate) fn psi_weights(&self, count: usize) -> Vec<f64> {
        // coefficients of φ(B)(1-B)^d as 1 + c1 B + c2 B^2 + ...
        let mut poly: Vec<f64> = std::iter::once(1.0)
            .chain(self.arma.phi.iter().map(|f| -f))
            .collect();
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let ar: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut v = self.arma.theta.get(j - 1).copied().unwrap_or(0.0);
            for (i, a) in ar.iter().enumerate().take(j) {
                v += a * psi[j - 1 - i];
            }
            psi.push(v);
        }
        psi
    }

    /// Forecast error variance per step, non-decreasing in the step.
    pub(crate) fn forecast_variances(&self, horizon: usize) -> Vec<f64> {
        let mut acc = 0.0;
        self.psi_weights(horizon)
            .into_iter()
            .map(|psi| {
                acc += psi * psi;
                self.arma.sigma2 * acc
            })
            .collect()
    }
}
