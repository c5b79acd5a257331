//! HTTP request handlers for web adapter.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::adapters::csv_adapter::read_price_sheet;
use crate::domain::backtest::{AnalysisConfig, run_backtest as run_backtest_engine};
use crate::domain::error::SnowballError;
use crate::domain::params::BacktestParams;
use crate::domain::performance::analyze;

use super::schema::{
    BacktestDetailOutput, BacktestDetailResponse, BacktestListItem, BacktestListResponse,
    BacktestResponse, DeleteResponse, IngestResponse, PerformanceBody,
};
use super::{AppState, WebError};

/// POST /history: load the configured price sheet into the store.
pub async fn ingest_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IngestResponse>, WebError> {
    let path = state
        .config
        .get_string("data", "price_csv")
        .ok_or_else(|| SnowballError::ConfigMissing {
            section: "data".into(),
            key: "price_csv".into(),
        })?;

    let outcome = read_price_sheet(std::path::Path::new(&path), &state.universe)?;
    let inserted = state.price_port.insert_prices(&outcome.points)?;

    Ok(Json(IngestResponse {
        inserted,
        skipped: outcome.skipped,
    }))
}

/// POST /backtest: run a backtest and persist the result.
pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Json(params): Json<BacktestParams>,
) -> Result<Json<BacktestResponse>, WebError> {
    params.validate()?;

    let analysis = AnalysisConfig::from_config(state.config.as_ref());
    let run = run_backtest_engine(
        state.price_port.as_ref(),
        &state.universe,
        &params,
        &analysis,
    )?;

    let data_id = state
        .result_port
        .save_backtest(&params, &run.nav_history, &run.weight_history)?;

    Ok(Json(BacktestResponse {
        data_id,
        output: PerformanceBody::from(&run.summary),
        last_rebalance_weight: run.last_weights(),
    }))
}

/// GET /backtest/list: identifiers plus final weights of every stored run.
pub async fn list_backtests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BacktestListResponse>, WebError> {
    let entries = state.result_port.list_backtests()?;

    let backtests = entries
        .into_iter()
        .map(|entry| BacktestListItem {
            data_id: entry.data_id,
            last_rebalance_weight: entry.last_weights,
        })
        .collect();

    Ok(Json(BacktestListResponse { backtests }))
}

/// GET /backtest/{data_id}: stored inputs plus performance recomputed
/// from the stored NAV history.
pub async fn get_backtest(
    State(state): State<Arc<AppState>>,
    Path(data_id): Path<i64>,
) -> Result<Json<BacktestDetailResponse>, WebError> {
    let stored = state
        .result_port
        .load_backtest(data_id)?
        .ok_or(SnowballError::NotFound { data_id })?;

    let analysis = AnalysisConfig::from_config(state.config.as_ref());
    let summary = analyze(
        &stored.nav_history,
        analysis.risk_free_rate,
        analysis.periods_per_year,
    )?;

    Ok(Json(BacktestDetailResponse {
        input: stored.params.clone(),
        output: BacktestDetailOutput {
            data_id: stored.data_id,
            performance: PerformanceBody::from(&summary),
        },
        last_rebalance_weight: stored.last_weights(),
    }))
}

/// DELETE /backtest/{data_id}: remove a stored run.
pub async fn delete_backtest(
    State(state): State<Arc<AppState>>,
    Path(data_id): Path<i64>,
) -> Result<Json<DeleteResponse>, WebError> {
    let deleted = state.result_port.delete_backtest(data_id)?;
    if !deleted {
        return Err(SnowballError::NotFound { data_id }.into());
    }

    Ok(Json(DeleteResponse {
        data_id,
        deleted: true,
    }))
}
