//! Audit-ready policy brief for one district.

use crate::Analyzer;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use spark_core::{ArimaOrder, DistrictId, Lever, LeverAllocation, Result, RiskCategory};
use spark_score::CorrelationTest;
use tracing::info;

/// Where the district stands before any intervention.
#[derive(Clone, Debug, Serialize)]
pub struct BaselineAssessment {
    /// Latest observed yearly migration.
    pub current_migration: f64,
    /// Composite imbalance score.
    pub imbalance_score: f64,
    /// Risk band of the score.
    pub risk_category: RiskCategory,
    /// Position in the population ranking.
    pub rank: Option<usize>,
    /// Sum of the baseline forecast over the horizon.
    pub projected_migration: f64,
}

/// One lever of the proposed intervention.
#[derive(Clone, Debug, Serialize)]
pub struct InterventionLine {
    /// Funded lever.
    pub lever: Lever,
    /// Display name of the lever.
    pub label: String,
    /// Budget assigned to the lever.
    pub amount: Decimal,
    /// Share of the allocation, percent.
    pub share_pct: f64,
    /// Attributed reduction under the worst case, percent.
    pub impact_low_pct: f64,
    /// Attributed reduction under the best case, percent.
    pub impact_high_pct: f64,
}

/// Simulated effect of the intervention.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectedOutcome {
    /// Clamped migration reduction, percent.
    pub reduction_pct: f64,
    /// Reduction under the optimistic lever effects, percent.
    pub best_case_pct: f64,
    /// Reduction under the pessimistic lever effects, percent.
    pub worst_case_pct: f64,
    /// Baseline minus projected migration over the horizon.
    pub people_retained: f64,
    /// Confidence in the simulated outcome, percent.
    pub confidence_pct: f64,
}

/// Evidence behind the forecast baseline.
#[derive(Clone, Debug, Serialize)]
pub struct StatisticalValidation {
    /// Selected (p, d, q) order.
    pub order: ArimaOrder,
    /// Walk-forward root mean squared error.
    pub rmse: f64,
    /// Walk-forward mean absolute error.
    pub mae: f64,
    /// Akaike information criterion of the selected fit.
    pub aic: f64,
    /// One-step-ahead forecasts behind the error figures.
    pub validation_points: usize,
    /// Score/migration correlation across the population, when computable.
    pub correlation: Option<CorrelationTest>,
}

/// Policy brief for one district, ready for serialization.
#[derive(Clone, Debug, Serialize)]
pub struct PolicyBrief {
    /// Heading naming the district.
    pub title: String,
    /// Date the brief was issued.
    pub date: NaiveDate,
    /// District the brief covers.
    pub district_id: DistrictId,
    /// Forecast and simulation horizon.
    pub horizon_years: usize,
    /// One-paragraph summary of risk, budget and projected effect.
    pub executive_summary: String,
    /// Situation before the intervention.
    pub baseline: BaselineAssessment,
    /// Budget across all levers.
    pub total_budget: Decimal,
    /// One line per lever, in lever order.
    pub intervention: Vec<InterventionLine>,
    /// Simulated effect.
    pub outcome: ProjectedOutcome,
    /// Forecast quality and correlation evidence.
    pub validation: StatisticalValidation,
    /// Ordered action items.
    pub recommendations: Vec<String>,
}

impl Analyzer<'_> {
    /// Build a brief from a district score, its forecast baseline and the
    /// simulated allocation. Fails like the underlying engines do.
    pub fn policy_brief(
        &self,
        id: &DistrictId,
        allocation: &LeverAllocation,
        total_budget: Decimal,
        horizon: usize,
        date: NaiveDate,
    ) -> Result<PolicyBrief> {
        let score = self.score_district(id)?;
        let run = self.simulate_district(id, allocation, total_budget, horizon)?;
        let correlation = self.score_correlation().ok();
        let current_migration = self
            .source()
            .migration_series(id)
            .and_then(|s| s.last())
            .map_or(0.0, |p| p.value);

        let sim = &run.simulation;
        let diag = &run.forecast.diagnostics;
        let intervention = sim
            .budget_breakdown
            .iter()
            .zip(&sim.lever_impacts)
            .map(|(line, impact)| InterventionLine {
                lever: line.lever,
                label: line.label.clone(),
                amount: line.amount,
                share_pct: impact.share_pct,
                impact_low_pct: impact.low_pct,
                impact_high_pct: impact.high_pct,
            })
            .collect();

        let executive_summary = format!(
            "Evidence-based multi-lever intervention for {name} ({risk}, score {score:.3}). \
             A budget of {budget} is projected to reduce out-migration by {red:.1}% \
             (range {lo:.1}% to {hi:.1}%) over {horizon} years, retaining about {kept:.0} people.",
            name = score.district_name,
            risk = score.risk_category.label(),
            score = score.score,
            budget = total_budget,
            red = sim.reduction_pct,
            lo = sim.worst_case,
            hi = sim.best_case,
            kept = sim.people_retained,
        );
        let recommendations = recommendations(
            allocation,
            score.risk_category,
            sim.clamped,
            diag.validation_points,
            horizon,
        );

        let brief = PolicyBrief {
            title: format!("Policy Intervention Brief: {}", score.district_name),
            date,
            district_id: id.clone(),
            horizon_years: horizon,
            executive_summary,
            baseline: BaselineAssessment {
                current_migration,
                imbalance_score: score.score,
                risk_category: score.risk_category,
                rank: score.rank,
                projected_migration: sim.baseline,
            },
            total_budget,
            intervention,
            outcome: ProjectedOutcome {
                reduction_pct: sim.reduction_pct,
                best_case_pct: sim.best_case,
                worst_case_pct: sim.worst_case,
                people_retained: sim.people_retained,
                confidence_pct: sim.confidence,
            },
            validation: StatisticalValidation {
                order: diag.order,
                rmse: diag.rmse,
                mae: diag.mae,
                aic: diag.aic,
                validation_points: diag.validation_points,
                correlation,
            },
            recommendations,
        };
        info!(district = %id, %date, reduction_pct = sim.reduction_pct, "policy brief");
        Ok(brief)
    }
}

fn recommendations(
    allocation: &LeverAllocation,
    risk: RiskCategory,
    clamped: bool,
    validation_points: usize,
    horizon: usize,
) -> Vec<String> {
    let lead = allocation.dominant();
    let mut out = vec![format!(
        "Prioritize {} ({:.0}% of the budget)",
        lead.label(),
        allocation.get(lead)
    )];
    if risk == RiskCategory::High {
        out.push(
            "Treat the district as a priority area and start disbursement in the first year"
                .to_string(),
        );
    }
    for lever in Lever::ALL.into_iter().filter(|&l| allocation.get(l) == 0.0) {
        out.push(format!("Review the zero allocation to {}", lever.label()));
    }
    if clamped {
        out.push(
            "The allocation exceeds the plausible impact envelope; expect diminishing returns"
                .to_string(),
        );
    }
    if validation_points == 0 {
        out.push(
            "Collect more migration history before relying on the forecast error".to_string(),
        );
    }
    out.push("Establish a quarterly monitoring framework to track outcomes".to_string());
    let midterm = horizon as f64 / 2.0;
    out.push(format!(
        "Conduct a mid-term evaluation after {midterm:.1} years to adjust the strategy"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dataset;
    use spark_core::{EngineConfig, ErrorKind};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn brief_for_recommended_allocation() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let b = an
            .policy_brief(
                &DistrictId::new("a"),
                &LeverAllocation::recommended(),
                Decimal::new(50_000_000, 0),
                5,
                date(),
            )
            .unwrap();
        assert_eq!(b.title, "Policy Intervention Brief: District A");
        assert_eq!(b.baseline.current_migration, 12_500.0);
        assert_eq!(b.baseline.rank, Some(1));
        assert_eq!(b.intervention.len(), 4);
        assert_eq!(b.intervention[0].amount, Decimal::new(20_000_000, 0));
        assert!((b.outcome.reduction_pct - 17.65).abs() < 1e-9);
        assert_eq!(b.outcome.confidence_pct, 86.0);
        assert!(b.validation.correlation.is_some());
        assert_eq!(b.validation.validation_points, 4);
        assert!(b.recommendations[0].starts_with("Prioritize Job Creation Programs (40%"));
        assert!(b.recommendations.last().unwrap().contains("2.5 years"));
        assert!(b.executive_summary.contains("District A (High Risk"));
    }

    #[test]
    fn recommendations_follow_inputs() {
        let alloc = LeverAllocation::new(100.0, 0.0, 0.0, 0.0);
        let recs = recommendations(&alloc, RiskCategory::High, true, 0, 4);
        assert!(recs.iter().any(|r| r.contains("priority area")));
        assert!(recs.iter().any(|r| r.contains("zero allocation to Education Quality")));
        assert!(recs.iter().any(|r| r.contains("envelope")));
        assert!(recs.iter().any(|r| r.contains("more migration history")));
        assert!(recs.last().unwrap().contains("2.0 years"));
    }

    #[test]
    fn brief_for_unknown_district_fails() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let err = an
            .policy_brief(
                &DistrictId::new("x"),
                &LeverAllocation::recommended(),
                Decimal::ONE,
                5,
                date(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDistrict);
    }
}
