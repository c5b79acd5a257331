//! Web server adapter.
//!
//! Provides the Axum JSON API for running backtests, browsing stored
//! results, and ingesting price history.

mod error;
mod handlers;
mod schema;

pub use error::WebError;
pub use handlers::*;
pub use schema::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::domain::universe::Universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::result_port::ResultPort;

pub struct AppState {
    pub price_port: Arc<dyn PricePort + Send + Sync>,
    pub result_port: Arc<dyn ResultPort + Send + Sync>,
    pub config: Arc<dyn ConfigPort + Send + Sync>,
    pub universe: Universe,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/history", post(handlers::ingest_history))
        .route("/backtest", post(handlers::run_backtest))
        .route("/backtest/list", get(handlers::list_backtests))
        .route(
            "/backtest/{data_id}",
            get(handlers::get_backtest).delete(handlers::delete_backtest),
        )
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}
