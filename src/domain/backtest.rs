//! Backtest orchestration: prices in, schedule, simulation, stats out.

use crate::domain::error::SnowballError;
use crate::domain::params::BacktestParams;
use crate::domain::performance::{
    self, PerformanceSummary, DEFAULT_RISK_FREE_RATE, TRADING_PERIODS_PER_YEAR,
};
use crate::domain::price::PriceHistory;
use crate::domain::schedule::{self, RebalanceEvent};
use crate::domain::simulator::{self, NavPoint};
use crate::domain::universe::Universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use chrono::{Months, NaiveDate};

/// Knobs for the statistics pass, from the `[backtest]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: TRADING_PERIODS_PER_YEAR,
        }
    }
}

impl AnalysisConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self {
            risk_free_rate: config.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE),
            periods_per_year: config.get_double(
                "backtest",
                "annualization_periods",
                TRADING_PERIODS_PER_YEAR,
            ),
        }
    }
}

/// Everything one completed run produces.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub nav_history: Vec<NavPoint>,
    pub weight_history: Vec<RebalanceEvent>,
    pub summary: PerformanceSummary,
}

impl BacktestRun {
    /// Weights applied at the most recent rebalance.
    pub fn last_weights(&self) -> Vec<(String, f64)> {
        self.weight_history
            .last()
            .map(|event| event.weights.clone())
            .unwrap_or_default()
    }
}

/// A persisted run, as returned by the result store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBacktest {
    pub data_id: i64,
    pub params: BacktestParams,
    pub nav_history: Vec<NavPoint>,
    pub weight_history: Vec<RebalanceEvent>,
}

impl StoredBacktest {
    pub fn last_weights(&self) -> Vec<(String, f64)> {
        self.weight_history
            .last()
            .map(|event| event.weights.clone())
            .unwrap_or_default()
    }
}

/// One row of the stored-run listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestListEntry {
    pub data_id: i64,
    pub last_weights: Vec<(String, f64)>,
}

/// Run a full backtest against stored prices.
///
/// The run spans the caller's start month through the latest date the
/// store has seen, so results are stable for a fixed data set. Every
/// universe ticker must have data.
pub fn run_backtest(
    price_port: &dyn PricePort,
    universe: &Universe,
    params: &BacktestParams,
    analysis: &AnalysisConfig,
) -> Result<BacktestRun, SnowballError> {
    params.validate()?;
    let start = params.start_date()?;
    let tickers = universe.tickers();

    let mut end = start;
    for ticker in &tickers {
        match price_port.data_range(ticker)? {
            Some((_, last, _)) => end = end.max(last),
            None => {
                return Err(SnowballError::NoData {
                    ticker: ticker.clone(),
                });
            }
        }
    }

    // Reach back one rebalance period so the first trade date has a
    // full lookback window.
    let fetch_start = start
        .checked_sub_months(Months::new(params.rebalance_period))
        .unwrap_or(NaiveDate::MIN);

    let mut series = Vec::with_capacity(tickers.len());
    for ticker in &tickers {
        let points = price_port.fetch_prices(ticker, fetch_start, end)?;
        if points.is_empty() {
            return Err(SnowballError::NoData {
                ticker: ticker.clone(),
            });
        }
        series.push(points);
    }

    let history = PriceHistory::build(universe.clone(), series);
    let weight_history = schedule::build_schedule(&history, params, start, end)?;
    let nav_history = simulator::simulate(
        &history,
        &weight_history,
        params.initial_investment,
        params.trading_fee,
    )?;
    let summary = performance::analyze(
        &nav_history,
        analysis.risk_free_rate,
        analysis.periods_per_year,
    )?;

    Ok(BacktestRun {
        nav_history,
        weight_history,
        summary,
    })
}
