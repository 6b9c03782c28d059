//! Headline figures for the overview dashboard.

use crate::Analyzer;
use serde::Serialize;
use spark_core::{CompositeScoreResult, EngineError, Result, RiskCategory, TimeSeriesPoint};
use tracing::info;

/// Number of districts listed in [`DashboardSummary::top_districts`].
pub const TOP_DISTRICTS: usize = 5;
/// Horizon of the national projection, years.
pub const PROJECTION_YEARS: usize = 5;

/// Ranked districts per risk category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    /// Districts in the high band.
    pub high: usize,
    /// Districts in the medium band.
    pub medium: usize,
    /// Districts in the low band.
    pub low: usize,
}

/// Population-wide overview built from the ranking and the national series.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardSummary {
    /// All districts in the dataset, ranked or not.
    pub districts: usize,
    /// Mean composite score over the ranked districts; 0 when none rank.
    pub national_average: f64,
    /// Rank 1, if any district ranks.
    pub highest_risk: Option<CompositeScoreResult>,
    /// Ranked districts per risk band.
    pub risk_counts: RiskCounts,
    /// The first [`TOP_DISTRICTS`] of the ranking.
    pub top_districts: Vec<CompositeScoreResult>,
    /// Sum of the national point forecasts; `None` when the national series
    /// is too short to fit.
    pub five_year_projection: Option<f64>,
    /// Historical national migration.
    pub migration_trend: Vec<TimeSeriesPoint>,
    /// Share of weighted indicator cells that are present, percent.
    pub data_quality_pct: f64,
}

impl Analyzer<'_> {
    /// Rank the population and forecast the national series.
    pub fn dashboard_summary(&self) -> Result<DashboardSummary> {
        let ranked = self.rank_all()?;
        let national_average = if ranked.is_empty() {
            0.0
        } else {
            ranked.iter().map(|r| r.score).sum::<f64>() / ranked.len() as f64
        };
        let mut risk_counts = RiskCounts::default();
        for r in &ranked {
            match r.risk_category {
                RiskCategory::High => risk_counts.high += 1,
                RiskCategory::Medium => risk_counts.medium += 1,
                RiskCategory::Low => risk_counts.low += 1,
            }
        }

        let five_year_projection = match self.forecast_national(PROJECTION_YEARS) {
            Ok(f) => Some(f.summary().total_projection),
            Err(EngineError::InsufficientHistory { .. }) => None,
            Err(e) => return Err(e),
        };

        let summary = DashboardSummary {
            districts: self.source().districts().len(),
            national_average,
            highest_risk: ranked.first().cloned(),
            risk_counts,
            top_districts: ranked.iter().take(TOP_DISTRICTS).cloned().collect(),
            five_year_projection,
            migration_trend: self.source().national_series().to_vec(),
            data_quality_pct: self.data_quality_pct(),
        };
        info!(
            districts = summary.districts,
            national_average = summary.national_average,
            data_quality_pct = summary.data_quality_pct,
            "dashboard summary"
        );
        Ok(summary)
    }

    fn data_quality_pct(&self) -> f64 {
        let districts = self.source().districts();
        let cells = districts.len() * self.config().weights.len();
        if cells == 0 {
            return 0.0;
        }
        let present = districts
            .iter()
            .flat_map(|d| self.config().weights.iter().map(move |w| d.indicator(&w.name)))
            .filter(|v| v.is_some_and(f64::is_finite))
            .count();
        100.0 * present as f64 / cells as f64
    }
}
