//! Dickey-Fuller stationarity test and differencing order selection.

use spark_core::AdfLevel;

/// Outcome of a stationarity test on one series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stationarity {
    Stationary,
    UnitRoot,
    /// Too few observations to leave a residual degree of freedom.
    Untestable,
}

/// Dickey-Fuller regression `Δx_t = α + γ·x_{t-1} + ε_t`; the unit root is
/// rejected when the t-statistic of γ falls below the critical value.
pub(crate) fn adf_test(x: &[f64], level: AdfLevel) -> Stationarity {
    if x.iter().all(|&v| v == x[0]) {
        return Stationarity::Stationary;
    }
    let n = x.len();
    if n < 4 {
        return Stationarity::Untestable;
    }

    let lag = &x[..n - 1];
    let dy: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let m = dy.len() as f64;
    let x_bar = lag.iter().sum::<f64>() / m;
    let y_bar = dy.iter().sum::<f64>() / m;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&l, &d) in lag.iter().zip(&dy) {
        sxx += (l - x_bar) * (l - x_bar);
        sxy += (l - x_bar) * (d - y_bar);
    }
    if sxx <= 0.0 {
        // flat history followed by a jump
        return Stationarity::UnitRoot;
    }

    let gamma = sxy / sxx;
    let alpha = y_bar - gamma * x_bar;
    let sse: f64 = lag
        .iter()
        .zip(&dy)
        .map(|(&l, &d)| {
            let r = d - alpha - gamma * l;
            r * r
        })
        .sum();
    let scale: f64 = dy.iter().map(|d| d * d).sum();
    if sse <= 1e-18 * scale {
        // exact fit: no noise left to test against
        return if gamma < -1e-9 {
            Stationarity::Stationary
        } else {
            Stationarity::UnitRoot
        };
    }

    let df = m - 2.0;
    let se = (sse / df / sxx).sqrt();
    let t_stat = gamma / se;
    if t_stat < level.critical_value(dy.len()) {
        Stationarity::Stationary
    } else {
        Stationarity::UnitRoot
    }
}

pub(crate) fn difference(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Difference until stationary or `max_d` is reached.
///
/// Returns every level: `levels[0]` is the input and `levels[d]` the series
/// the ARMA part is fitted on.
pub(crate) fn integrate_levels(x: &[f64], max_d: usize, level: AdfLevel) -> Vec<Vec<f64>> {
    let mut levels = vec![x.to_vec()];
    while levels.len() <= max_d {
        let current = &levels[levels.len() - 1];
        match adf_test(current, level) {
            Stationarity::UnitRoot => {
                let next = difference(current);
                levels.push(next);
            }
            Stationarity::Stationary | Stationarity::Untestable => break,
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_is_stationary() {
        assert_eq!(adf_test(&[5.0; 6], AdfLevel::FivePercent), Stationarity::Stationary);
    }

    #[test]
    fn short_series_is_untestable() {
        assert_eq!(adf_test(&[1.0, 3.0, 2.0], AdfLevel::FivePercent), Stationarity::Untestable);
    }

    #[test]
    fn linear_trend_needs_one_difference() {
        let x: Vec<f64> = (1..=8).map(|i| 10.0 * i as f64).collect();
        assert_eq!(adf_test(&x, AdfLevel::FivePercent), Stationarity::UnitRoot);
        let levels = integrate_levels(&x, 2, AdfLevel::FivePercent);
        assert_eq!(levels.len(), 2);
        assert!(levels[1].iter().all(|&v| v == 10.0));
    }

    #[test]
    fn alternating_series_is_stationary() {
        let x: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 80.0 } + (i % 3) as f64)
            .collect();
        assert_eq!(adf_test(&x, AdfLevel::FivePercent), Stationarity::Stationary);
        assert_eq!(integrate_levels(&x, 2, AdfLevel::FivePercent).len(), 1);
    }

    #[test]
    fn differencing_stops_at_max_order() {
        let x: Vec<f64> = (0..10).map(|i| (i * i * i) as f64).collect();
        let levels = integrate_levels(&x, 1, AdfLevel::FivePercent);
        assert!(levels.len() <= 2);
    }
}
