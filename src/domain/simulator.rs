//! Portfolio simulation over a rebalance schedule.
//!
//! Walks the aligned price table in date order, applies each rebalance
//! event on its trading day, and records the resulting portfolio value.
//! Fractional shares are allowed and trades fill at the daily close.

use crate::domain::error::SnowballError;
use crate::domain::price::{PriceHistory, PriceRow};
use crate::domain::schedule::RebalanceEvent;
use chrono::NaiveDate;

/// Cash plus per-slot share counts, indexed like `Universe::tickers`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub holdings: Vec<f64>,
}

impl PortfolioState {
    pub fn new(initial_cash: f64, slots: usize) -> Self {
        Self {
            cash: initial_cash,
            holdings: vec![0.0; slots],
        }
    }

    /// Cash plus holdings marked at the given closes.
    pub fn market_value(&self, prices: &[f64]) -> f64 {
        let invested: f64 = self
            .holdings
            .iter()
            .zip(prices)
            .map(|(shares, price)| shares * price)
            .sum();
        self.cash + invested
    }
}

/// One recorded portfolio value, always on a rebalance day.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// Run the schedule against the price table.
///
/// Event dates must be drawn from `history` and strictly increasing;
/// `build_schedule` guarantees both. Produces one `NavPoint` per event,
/// valued after that day's trades and fees.
pub fn simulate(
    history: &PriceHistory,
    events: &[RebalanceEvent],
    initial_cash: f64,
    fee_rate: f64,
) -> Result<Vec<NavPoint>, SnowballError> {
    let universe = history.universe();
    let mut state = PortfolioState::new(initial_cash, universe.count());
    let mut nav_history = Vec::with_capacity(events.len());
    let mut next_event = 0;

    for row in history.rows() {
        if next_event >= events.len() {
            break;
        }
        if events[next_event].date == row.date {
            rebalance(&mut state, row, &events[next_event], history, fee_rate)?;
            nav_history.push(NavPoint {
                date: row.date,
                nav: state.market_value(&row.prices),
            });
            next_event += 1;
        }
    }

    Ok(nav_history)
}

/// Move the portfolio to the event's target weights at this row's
/// closes.
///
/// Fees are proportional to gross traded notional, buys and sells
/// alike, and are paid out of cash after the trades settle.
fn rebalance(
    state: &mut PortfolioState,
    row: &PriceRow,
    event: &RebalanceEvent,
    history: &PriceHistory,
    fee_rate: f64,
) -> Result<(), SnowballError> {
    let universe = history.universe();
    let total_value = state.market_value(&row.prices);
    let mut buy_fees = 0.0;
    let mut sell_fees = 0.0;

    for (ticker, weight) in &event.weights {
        let slot = universe
            .slot_of(ticker)
            .ok_or_else(|| SnowballError::UnknownTicker {
                ticker: ticker.clone(),
            })?;
        let price = row.prices[slot];
        if price <= 0.0 {
            return Err(SnowballError::InvalidPrice {
                ticker: ticker.clone(),
                date: row.date,
                price,
            });
        }

        let target_shares = total_value * weight / price;
        let held = state.holdings[slot];
        let traded_notional = (target_shares - held).abs() * price;
        if target_shares > held {
            buy_fees += traded_notional * fee_rate;
        } else if target_shares < held {
            sell_fees += traded_notional * fee_rate;
        }
        state.holdings[slot] = target_shares;
    }

    let invested: f64 = state
        .holdings
        .iter()
        .zip(&row.prices)
        .map(|(shares, price)| shares * price)
        .sum();
    state.cash = total_value - invested - buy_fees - sell_fees;
    Ok(())
}
