#![deny(warnings)]

//! Multi-lever policy simulation.
//!
//! Perturbs a baseline migration trajectory with the reduction implied by a
//! budget allocation across the four policy levers:
//! - linear impact model with per-lever maximum coefficients
//! - reduction clamped to a plausible envelope
//! - fixed sensitivity spread for best/worst case
//! - exact decimal budget breakdown

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use spark_core::{
    validate_series, BudgetLine, EngineError, Lever, LeverAllocation, LeverCoefficients,
    LeverImpact, Result, SimulationConfig, SimulationResult, TimeSeriesPoint, TrajectoryPoint,
};
use tracing::{debug, warn};

/// Unclamped reduction in percent: Σ (share_i / 100 · max_impact_i) · 100.
pub fn raw_reduction(allocation: &LeverAllocation, coefficients: &LeverCoefficients) -> f64 {
    Lever::ALL
        .iter()
        .map(|&l| lever_reduction(allocation, coefficients, l))
        .sum()
}

fn lever_reduction(allocation: &LeverAllocation, coefficients: &LeverCoefficients, lever: Lever) -> f64 {
    allocation.get(lever) / 100.0 * coefficients.get(lever) * 100.0
}

/// Split `total_budget` by lever share, in lever order.
///
/// Shares are taken relative to the allocation total, which validation lets
/// drift from 100 by the tolerance. The dominant lever receives the remainder
/// so the lines always sum to `total_budget` exactly.
pub fn budget_breakdown(allocation: &LeverAllocation, total_budget: Decimal) -> Result<Vec<BudgetLine>> {
    let overflow = || EngineError::InvalidBudget(format!("{total_budget} overflows the breakdown"));
    let mut shares = Vec::with_capacity(Lever::ALL.len());
    for lever in Lever::ALL {
        let share = Decimal::from_f64(allocation.get(lever)).ok_or_else(|| {
            EngineError::allocation(lever.key(), "share is not representable as a decimal")
        })?;
        shares.push((lever, share));
    }
    let total_share: Decimal = shares.iter().map(|(_, s)| *s).sum();
    if total_share <= Decimal::ZERO {
        return Err(EngineError::allocation("allocation", "shares sum to zero"));
    }

    // the largest share absorbs the rounding remainder
    let sink = allocation.dominant();
    let mut assigned = Decimal::ZERO;
    let mut lines = Vec::with_capacity(shares.len());
    for (lever, share) in shares {
        let amount = if lever == sink {
            Decimal::ZERO
        } else {
            share
                .checked_div(total_share)
                .and_then(|fraction| total_budget.checked_mul(fraction))
                .ok_or_else(overflow)?
        };
        assigned = assigned.checked_add(amount).ok_or_else(overflow)?;
        lines.push(BudgetLine {
            lever,
            label: lever.label().to_string(),
            amount,
        });
    }
    let remainder = total_budget.checked_sub(assigned).ok_or_else(overflow)?;
    if let Some(line) = lines.iter_mut().find(|l| l.lever == sink) {
        line.amount = remainder;
    }
    Ok(lines)
}

/// Simulate the allocation against `baseline`.
///
/// All inputs are checked before anything is computed; a failing call never
/// returns a partial result.
pub fn simulate(
    baseline: &[TimeSeriesPoint],
    allocation: &LeverAllocation,
    total_budget: Decimal,
    cfg: &SimulationConfig,
) -> Result<SimulationResult> {
    cfg.validate()?;
    allocation.validate()?;
    if total_budget <= Decimal::ZERO {
        return Err(EngineError::InvalidBudget(total_budget.to_string()));
    }
    if baseline.is_empty() {
        return Err(EngineError::validation("baseline", "trajectory is empty"));
    }
    validate_series(baseline)?;

    let raw = raw_reduction(allocation, &cfg.coefficients);
    let reduction_pct = raw.clamp(cfg.envelope_min, cfg.envelope_max);
    let clamped = reduction_pct != raw;
    if clamped {
        warn!(raw, reduction_pct, "reduction clamped to envelope");
    }
    let best_case = (reduction_pct + cfg.sensitivity_delta).min(cfg.envelope_max);
    let worst_case = (reduction_pct - cfg.sensitivity_delta).max(cfg.envelope_min);

    let factor = 1.0 - reduction_pct / 100.0;
    let trajectory_comparison: Vec<TrajectoryPoint> = baseline
        .iter()
        .map(|p| TrajectoryPoint {
            year: p.year,
            baseline: p.value,
            projected: p.value * factor,
        })
        .collect();
    let baseline_total: f64 = trajectory_comparison.iter().map(|t| t.baseline).sum();
    let projected_total: f64 = trajectory_comparison.iter().map(|t| t.projected).sum();

    let lever_impacts = Lever::ALL
        .iter()
        .map(|&lever| {
            let share_pct = allocation.get(lever);
            let attributed = if raw > 0.0 {
                lever_reduction(allocation, &cfg.coefficients, lever) * reduction_pct / raw
            } else {
                reduction_pct * share_pct / 100.0
            };
            let (low_pct, high_pct) = if reduction_pct > 0.0 {
                (
                    attributed * worst_case / reduction_pct,
                    attributed * best_case / reduction_pct,
                )
            } else {
                (0.0, 0.0)
            };
            LeverImpact {
                lever,
                share_pct,
                reduction_pct: attributed,
                low_pct,
                high_pct,
            }
        })
        .collect();

    let budget_breakdown = budget_breakdown(allocation, total_budget)?;
    debug!(
        reduction_pct,
        best_case,
        worst_case,
        budget = %total_budget,
        years = baseline.len(),
        "simulation complete"
    );

    Ok(SimulationResult {
        baseline: baseline_total,
        projected: projected_total,
        people_retained: baseline_total - projected_total,
        reduction_pct,
        raw_reduction_pct: raw,
        clamped,
        best_case,
        worst_case,
        confidence: cfg.confidence,
        trajectory_comparison,
        budget_breakdown,
        lever_impacts,
    })
}
