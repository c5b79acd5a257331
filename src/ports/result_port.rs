//! Backtest result store port trait.

use crate::domain::backtest::{BacktestListEntry, StoredBacktest};
use crate::domain::error::SnowballError;
use crate::domain::params::BacktestParams;
use crate::domain::schedule::RebalanceEvent;
use crate::domain::simulator::NavPoint;

pub trait ResultPort {
    /// Persist one completed run and return its assigned id.
    fn save_backtest(
        &self,
        params: &BacktestParams,
        nav_history: &[NavPoint],
        weight_history: &[RebalanceEvent],
    ) -> Result<i64, SnowballError>;

    /// Fetch one stored run, `None` when the id was never assigned.
    fn load_backtest(&self, data_id: i64) -> Result<Option<StoredBacktest>, SnowballError>;

    /// Remove one stored run. Returns whether anything was deleted.
    fn delete_backtest(&self, data_id: i64) -> Result<bool, SnowballError>;

    /// All stored runs, ascending by id.
    fn list_backtests(&self) -> Result<Vec<BacktestListEntry>, SnowballError>;
}
