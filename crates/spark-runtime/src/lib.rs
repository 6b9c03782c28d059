#![deny(warnings)]
#![warn(missing_docs)]

//! Runtime facade over the scoring, forecast and simulation engines.
//!
//! An [`Analyzer`] borrows a read-only [`DataSource`] and a validated
//! [`EngineConfig`]; every call is a pure function of those two and its
//! arguments.

pub mod brief;
pub mod summary;

pub use brief::PolicyBrief;
pub use summary::DashboardSummary;

use data_pipeline::DataSource;
use rust_decimal::Decimal;
use serde::Serialize;
use spark_core::{
    CompositeScoreResult, District, DistrictId, EngineConfig, EngineError, LeverAllocation,
    Result, SimulationResult, TimeSeriesPoint,
};
use spark_forecast::Forecast;
use spark_score::CorrelationTest;
use tracing::{info, warn};

/// Forecast baseline and the simulation run against it.
#[derive(Clone, Debug, Serialize)]
pub struct DistrictSimulation {
    /// Simulated district.
    pub district_id: DistrictId,
    /// Forecast whose points form the baseline.
    pub forecast: Forecast,
    /// Outcome of the allocation.
    pub simulation: SimulationResult,
}

/// Entry point for every analysis over one dataset and configuration.
pub struct Analyzer<'a> {
    source: &'a dyn DataSource,
    config: &'a EngineConfig,
}

impl<'a> Analyzer<'a> {
    /// Fails with a configuration error if `config` is invalid.
    pub fn new(source: &'a dyn DataSource, config: &'a EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    /// Validated configuration.
    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Underlying data source.
    pub fn source(&self) -> &dyn DataSource {
        self.source
    }

    fn district(&self, id: &DistrictId) -> Result<&District> {
        self.source
            .district(id)
            .ok_or_else(|| EngineError::UnknownDistrict(id.to_string()))
    }

    fn score_one(&self, district: &District) -> Result<CompositeScoreResult> {
        spark_score::score_district(
            district,
            &self.config.weights,
            self.source.ranges(),
            &self.config.risk,
        )
    }

    /// Score and rank every district carrying all weighted indicators.
    /// Districts missing one are left out of the ranking.
    pub fn rank_all(&self) -> Result<Vec<CompositeScoreResult>> {
        let mut scored = Vec::with_capacity(self.source.districts().len());
        for d in self.source.districts() {
            match self.score_one(d) {
                Ok(r) => scored.push(r),
                Err(EngineError::UnknownIndicator { district, indicator }) => {
                    warn!(%district, %indicator, "district left out of ranking");
                }
                Err(e) => return Err(e),
            }
        }
        let ranked = spark_score::rank_districts(scored);
        info!(ranked = ranked.len(), "ranked districts");
        Ok(ranked)
    }

    /// Score one district and place it in the population ranking.
    pub fn score_district(&self, id: &DistrictId) -> Result<CompositeScoreResult> {
        let district = self.district(id)?;
        let own = self.score_one(district)?;
        let ranked = self.rank_all()?;
        Ok(ranked.into_iter().find(|r| &r.district_id == id).unwrap_or(own))
    }

    /// Correlation of composite scores with observed migration rates, over
    /// the scored districts that report a rate.
    pub fn score_correlation(&self) -> Result<CorrelationTest> {
        let ranked = self.rank_all()?;
        let (scores, rates): (Vec<f64>, Vec<f64>) = ranked
            .iter()
            .filter_map(|r| {
                self.source
                    .district(&r.district_id)
                    .and_then(|d| d.migration_rate)
                    .map(|rate| (r.score, rate))
            })
            .unzip();
        let test = spark_score::correlation_test(&scores, &rates)?;
        info!(r = test.r, n = test.n, "score/migration correlation");
        Ok(test)
    }

    /// Fit and forecast an arbitrary yearly series.
    pub fn forecast(&self, series: &[TimeSeriesPoint], horizon: usize) -> Result<Forecast> {
        spark_forecast::fit(series, horizon, &self.config.forecast)
    }

    /// Forecast the recorded migration series of a district. A district
    /// without a series has no history.
    pub fn forecast_district(&self, id: &DistrictId, horizon: usize) -> Result<Forecast> {
        self.district(id)?;
        let series = self.source.migration_series(id).unwrap_or_default();
        let forecast = self.forecast(series, horizon)?;
        info!(district = %id, horizon, order = %forecast.diagnostics.order, "district forecast");
        Ok(forecast)
    }

    /// Forecast the national migration series.
    pub fn forecast_national(&self, horizon: usize) -> Result<Forecast> {
        let forecast = self.forecast(self.source.national_series(), horizon)?;
        info!(horizon, order = %forecast.diagnostics.order, "national forecast");
        Ok(forecast)
    }

    /// Simulate an allocation against a precomputed baseline.
    pub fn simulate(
        &self,
        baseline: &[TimeSeriesPoint],
        allocation: &LeverAllocation,
        total_budget: Decimal,
    ) -> Result<SimulationResult> {
        spark_sim::simulate(baseline, allocation, total_budget, &self.config.simulation)
    }

    /// Forecast the district's migration over `horizon` years and simulate
    /// the allocation against that baseline.
    pub fn simulate_district(
        &self,
        id: &DistrictId,
        allocation: &LeverAllocation,
        total_budget: Decimal,
        horizon: usize,
    ) -> Result<DistrictSimulation> {
        // reject bad allocations before fitting anything
        allocation.validate()?;
        let forecast = self.forecast_district(id, horizon)?;
        let simulation = self.simulate(&forecast.baseline_trajectory(), allocation, total_budget)?;
        info!(
            district = %id,
            reduction_pct = simulation.reduction_pct,
            people_retained = simulation.people_retained,
            "district simulation"
        );
        Ok(DistrictSimulation {
            district_id: id.clone(),
            forecast,
            simulation,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use data_pipeline::Dataset;

    /// Five complete districts with 2018-2025 series, plus "f" which lacks the
    /// social indicator and has only three years.
    pub const DOC: &str = r#"{"districts": [
        {"id": "a", "name": "District A",
         "indicators": {"economic": 0.82, "infrastructure": 0.71, "social": 0.66},
         "migration_rate": 15.8,
         "migration": [
            {"year": 2018, "value": 9200}, {"year": 2019, "value": 9800}, {"year": 2020, "value": 10300},
            {"year": 2021, "value": 10900}, {"year": 2022, "value": 11400}, {"year": 2023, "value": 11900},
            {"year": 2024, "value": 12200}, {"year": 2025, "value": 12500}]},
        {"id": "b", "name": "District B",
         "indicators": {"economic": 0.35, "infrastructure": 0.40, "social": 0.30},
         "migration_rate": 6.2,
         "migration": [
            {"year": 2018, "value": 4100}, {"year": 2019, "value": 4150}, {"year": 2020, "value": 4230},
            {"year": 2021, "value": 4260}, {"year": 2022, "value": 4340}, {"year": 2023, "value": 4380},
            {"year": 2024, "value": 4450}, {"year": 2025, "value": 4490}]},
        {"id": "c", "name": "District C",
         "indicators": {"economic": 0.60, "infrastructure": 0.55, "social": 0.70},
         "migration_rate": 11.4,
         "migration": [
            {"year": 2018, "value": 7000}, {"year": 2019, "value": 7300}, {"year": 2020, "value": 7450},
            {"year": 2021, "value": 7800}, {"year": 2022, "value": 8050}, {"year": 2023, "value": 8300},
            {"year": 2024, "value": 8600}, {"year": 2025, "value": 8800}]},
        {"id": "d", "name": "District D",
         "indicators": {"economic": 0.25, "infrastructure": 0.30, "social": 0.45},
         "migration_rate": 5.1,
         "migration": [
            {"year": 2018, "value": 3000}, {"year": 2019, "value": 2950}, {"year": 2020, "value": 3010},
            {"year": 2021, "value": 2990}, {"year": 2022, "value": 3040}, {"year": 2023, "value": 3020},
            {"year": 2024, "value": 3060}, {"year": 2025, "value": 3080}]},
        {"id": "e", "name": "District E",
         "indicators": {"economic": 0.74, "infrastructure": 0.80, "social": 0.52},
         "migration_rate": 14.0,
         "migration": [
            {"year": 2018, "value": 8600}, {"year": 2019, "value": 9000}, {"year": 2020, "value": 9500},
            {"year": 2021, "value": 9900}, {"year": 2022, "value": 10500}, {"year": 2023, "value": 10800},
            {"year": 2024, "value": 11300}, {"year": 2025, "value": 11700}]},
        {"id": "f", "name": "District F",
         "indicators": {"economic": 0.50, "infrastructure": 0.35},
         "migration_rate": 9.0,
         "migration": [
            {"year": 2018, "value": 5000}, {"year": 2019, "value": 5100}, {"year": 2020, "value": 5150}]}
    ]}"#;

    pub fn dataset() -> Dataset {
        Dataset::from_json_str(DOC).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::dataset;
    use super::*;
    use spark_core::{ErrorKind, RiskThresholds};

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let ds = dataset();
        let cfg = EngineConfig {
            risk: RiskThresholds {
                high: 0.5,
                medium: 0.9,
            },
            ..EngineConfig::default()
        };
        let err = Analyzer::new(&ds, &cfg).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn incomplete_district_is_left_out_of_ranking() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let ranked = an.rank_all().unwrap();
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].district_id, DistrictId::new("a"));
        assert_eq!(ranked[0].rank, Some(1));
        let err = an.score_district(&DistrictId::new("f")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIndicator);
    }

    #[test]
    fn score_district_carries_population_rank() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let d = an.score_district(&DistrictId::new("d")).unwrap();
        assert_eq!(d.rank, Some(5));
        assert!(an.score_district(&DistrictId::new("zz")).is_err());
    }

    #[test]
    fn scores_correlate_with_migration() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let c = an.score_correlation().unwrap();
        assert_eq!(c.n, 5);
        assert!(c.r > 0.9, "r = {}", c.r);
    }

    #[test]
    fn unknown_district_forecast_fails() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let err = an.forecast_district(&DistrictId::new("nope"), 5).unwrap_err();
        assert_eq!(err, EngineError::UnknownDistrict("nope".into()));
    }

    #[test]
    fn short_district_series_has_insufficient_history() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let err = an.forecast_district(&DistrictId::new("f"), 5).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientHistory {
                required: 4,
                available: 3
            }
        );
    }

    #[test]
    fn national_series_only_covers_shared_years() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        // district f only covers 2018-2020
        assert_eq!(an.source().national_series().len(), 3);
        assert_eq!(
            an.forecast_national(5).unwrap_err().kind(),
            ErrorKind::InsufficientHistory
        );
    }

    #[test]
    fn district_simulation_uses_forecast_baseline() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let run = an
            .simulate_district(
                &DistrictId::new("a"),
                &LeverAllocation::recommended(),
                Decimal::new(50_000_000, 0),
                5,
            )
            .unwrap();
        assert_eq!(run.forecast.points.len(), 5);
        assert_eq!(run.simulation.trajectory_comparison.len(), 5);
        assert_eq!(run.simulation.trajectory_comparison[0].year, 2026);
        assert!((run.simulation.reduction_pct - 17.65).abs() < 1e-9);
        assert!(run.simulation.people_retained > 0.0);
    }

    #[test]
    fn bad_allocation_fails_before_forecasting() {
        let ds = dataset();
        let cfg = EngineConfig::default();
        let an = Analyzer::new(&ds, &cfg).unwrap();
        let err = an
            .simulate_district(
                &DistrictId::new("f"),
                &LeverAllocation::new(40.0, 25.0, 20.0, 10.0),
                Decimal::ONE,
                5,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
    }
}
