#![deny(warnings)]

//! Command-line front end: loads a dataset and configuration, runs one
//! analysis and prints it as JSON.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use data_pipeline::{load_config, synthetic, DataSource, Dataset};
use rust_decimal::Decimal;
use serde::Serialize;
use spark_core::{DistrictId, EngineConfig, LeverAllocation};
use spark_runtime::Analyzer;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: spark [--data FILE] [--config FILE] [--seed N] [--districts N] <command>

commands:
  rank                          score and rank all districts
  score <ID>                    score one district
  correlation                   score/migration-rate correlation
  forecast [--district ID]      forecast a district, or the national series
  simulate [--district ID]      simulate an allocation against the forecast baseline
  summary                       dashboard headline figures
  brief --district ID           policy brief for one district
  export                        print the loaded dataset

options:
  --horizon N                   forecast years (default 5)
  --jobs P --healthcare P --education P --infrastructure P
                                lever shares in percent (default 40/25/20/15)
  --budget AMOUNT               total budget (default 50000000)
  --date YYYY-MM-DD             brief date (default today)";

#[derive(Debug)]
struct Args {
    data: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: u64,
    districts: usize,
    command: Option<String>,
    target: Option<String>,
    horizon: usize,
    levers: [Option<f64>; 4],
    budget: Decimal,
    date: Option<NaiveDate>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            data: None,
            config: None,
            seed: 42,
            districts: 24,
            command: None,
            target: None,
            horizon: 5,
            levers: [None; 4],
            budget: Decimal::new(50_000_000, 0),
            date: None,
        }
    }
}

impl Args {
    fn allocation(&self) -> LeverAllocation {
        if self.levers.iter().all(Option::is_none) {
            return LeverAllocation::recommended();
        }
        let [jobs, healthcare, education, infrastructure] = self.levers.map(|v| v.unwrap_or(0.0));
        LeverAllocation::new(jobs, healthcare, education, infrastructure)
    }

    fn district(&self) -> Option<DistrictId> {
        self.target.as_deref().map(DistrictId::new)
    }
}

fn value<T: std::str::FromStr>(flag: &str, raw: Option<String>) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = raw.ok_or_else(|| anyhow!("{flag} needs a value"))?;
    raw.parse()
        .map_err(|e| anyhow!("invalid value {raw:?} for {flag}: {e}"))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--data" => out.data = Some(value(&arg, it.next())?),
            "--config" => out.config = Some(value(&arg, it.next())?),
            "--seed" => out.seed = value(&arg, it.next())?,
            "--districts" => out.districts = value(&arg, it.next())?,
            "--district" => out.target = Some(value(&arg, it.next())?),
            "--horizon" => out.horizon = value(&arg, it.next())?,
            "--jobs" => out.levers[0] = Some(value(&arg, it.next())?),
            "--healthcare" => out.levers[1] = Some(value(&arg, it.next())?),
            "--education" => out.levers[2] = Some(value(&arg, it.next())?),
            "--infrastructure" => out.levers[3] = Some(value(&arg, it.next())?),
            "--budget" => out.budget = value(&arg, it.next())?,
            "--date" => out.date = Some(value(&arg, it.next())?),
            "-h" | "--help" => out.command = Some("help".to_string()),
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n\n{USAGE}"),
            _ if out.command.is_none() => out.command = Some(arg),
            _ if out.target.is_none() => out.target = Some(arg),
            _ => bail!("unexpected argument {arg:?}\n\n{USAGE}"),
        }
    }
    Ok(out)
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: &Args, dataset: &Dataset, config: &EngineConfig) -> Result<()> {
    let analyzer = Analyzer::new(dataset, config)?;
    let command = args.command.as_deref().unwrap_or("help");
    match command {
        "rank" => emit(&analyzer.rank_all()?),
        "score" => {
            let id = args.district().ok_or_else(|| anyhow!("score needs a district id"))?;
            emit(&analyzer.score_district(&id)?)
        }
        "correlation" => emit(&analyzer.score_correlation()?),
        "forecast" => match args.district() {
            Some(id) => emit(&analyzer.forecast_district(&id, args.horizon)?),
            None => emit(&analyzer.forecast_national(args.horizon)?),
        },
        "simulate" => match args.district() {
            Some(id) => emit(&analyzer.simulate_district(
                &id,
                &args.allocation(),
                args.budget,
                args.horizon,
            )?),
            None => {
                let baseline = analyzer.forecast_national(args.horizon)?.baseline_trajectory();
                emit(&analyzer.simulate(&baseline, &args.allocation(), args.budget)?)
            }
        },
        "summary" => emit(&analyzer.dashboard_summary()?),
        "brief" => {
            let id = args.district().ok_or_else(|| anyhow!("brief needs --district"))?;
            let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
            emit(&analyzer.policy_brief(&id, &args.allocation(), args.budget, args.horizon, date)?)
        }
        "export" => emit(&dataset.to_document()),
        "help" => {
            eprintln!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command {other:?}\n\n{USAGE}"),
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(command = ?args.command, data = ?args.data, config = ?args.config, "starting CLI");

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let dataset = match &args.data {
        Some(path) => Dataset::from_json_path(path)
            .with_context(|| format!("loading dataset {}", path.display()))?,
        None => {
            info!(seed = args.seed, districts = args.districts, "using synthetic dataset");
            synthetic::demo_dataset(args.seed, args.districts)?
        }
    };
    info!(districts = dataset.districts().len(), "dataset ready");

    run(&args, &dataset, &config)
}
