//! Rebalance scheduling over the aligned price table.
//!
//! Walks calendar months from the start date in rebalance-period steps,
//! resolves each nominal trade day to an actual trading day, and
//! evaluates the weight rule on the lookback window ending there.

use crate::domain::error::SnowballError;
use crate::domain::momentum;
use crate::domain::params::BacktestParams;
use crate::domain::price::PriceHistory;
use chrono::{Datelike, Months, NaiveDate};

/// One scheduled rebalance: the resolved trading day and the target
/// weights to apply on it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RebalanceEvent {
    pub date: NaiveDate,
    pub weights: Vec<(String, f64)>,
}

/// Build the full rebalance schedule between `start` and `end`.
///
/// Months with no trading day on or before the nominal trade day are
/// skipped. Event dates are strictly increasing and always present in
/// `history`.
pub fn build_schedule(
    history: &PriceHistory,
    params: &BacktestParams,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RebalanceEvent>, SnowballError> {
    let step = Months::new(params.rebalance_period);
    let mut events = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        if let Some(trade_date) =
            resolve_trade_date(history, cursor.year(), cursor.month(), params.trade_date)
        {
            let window_start = trade_date
                .checked_sub_months(step)
                .unwrap_or(NaiveDate::MIN);
            let window = history.window(window_start, trade_date);
            let weights = momentum::target_weights(window, history.universe())?;
            events.push(RebalanceEvent {
                date: trade_date,
                weights,
            });
        }
        cursor = match cursor.checked_add_months(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(events)
}

/// Resolve a nominal day of month to an actual trading day.
///
/// Days past the month end clamp to the month end first. The result is
/// the nominal day itself when it traded, otherwise the latest trading
/// day before it within the same month.
fn resolve_trade_date(
    history: &PriceHistory,
    year: i32,
    month: u32,
    day: u32,
) -> Option<NaiveDate> {
    let nominal =
        NaiveDate::from_ymd_opt(year, month, day).or_else(|| last_day_of_month(year, month))?;
    history
        .month_rows(year, month)
        .iter()
        .rev()
        .find(|row| row.date <= nominal)
        .map(|row| row.date)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}
