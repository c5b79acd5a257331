//! JSON response bodies for the web API.

use serde::Serialize;

use crate::adapters::csv_adapter::SkippedRow;
use crate::domain::params::BacktestParams;
use crate::domain::performance::PerformanceSummary;

/// Performance block shared by the run and detail responses.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceBody {
    pub total_return: f64,
    pub cagr: f64,
    pub vol: f64,
    pub sharpe: Option<f64>,
    pub mdd: f64,
}

impl From<&PerformanceSummary> for PerformanceBody {
    fn from(summary: &PerformanceSummary) -> Self {
        Self {
            total_return: summary.total_return,
            cagr: summary.cagr,
            vol: summary.volatility,
            sharpe: summary.sharpe_ratio,
            mdd: summary.max_drawdown,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BacktestResponse {
    pub data_id: i64,
    pub output: PerformanceBody,
    pub last_rebalance_weight: Vec<(String, f64)>,
}

#[derive(Debug, Serialize)]
pub struct BacktestListItem {
    pub data_id: i64,
    pub last_rebalance_weight: Vec<(String, f64)>,
}

#[derive(Debug, Serialize)]
pub struct BacktestListResponse {
    pub backtests: Vec<BacktestListItem>,
}

#[derive(Debug, Serialize)]
pub struct BacktestDetailOutput {
    pub data_id: i64,
    #[serde(flatten)]
    pub performance: PerformanceBody,
}

#[derive(Debug, Serialize)]
pub struct BacktestDetailResponse {
    pub input: BacktestParams,
    pub output: BacktestDetailOutput,
    pub last_rebalance_weight: Vec<(String, f64)>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub data_id: i64,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub inserted: usize,
    pub skipped: Vec<SkippedRow>,
}
