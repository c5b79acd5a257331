//! Dual-momentum weight rule.
//!
//! Absolute momentum: a negative trailing return on the hedge ticker
//! parks the whole portfolio in the safe asset. Relative momentum:
//! otherwise the top growth candidates by trailing return split the
//! portfolio equally.

use crate::domain::error::SnowballError;
use crate::domain::price::PriceRow;
use crate::domain::universe::Universe;
use std::cmp::Ordering;

/// How many growth candidates share the portfolio in a risk-on period.
pub const TOP_GROWTH: usize = 2;

/// Return over a window, last price relative to first.
pub fn trailing_return(first: f64, last: f64) -> f64 {
    last / first - 1.0
}

/// Target weights for one rebalance, from the lookback window ending on
/// the trade date.
///
/// The result pairs every weighted ticker with a weight, in
/// `Universe::weighted_tickers` order, zeros included. Weights always
/// sum to exactly 1.
pub fn target_weights(
    window: &[PriceRow],
    universe: &Universe,
) -> Result<Vec<(String, f64)>, SnowballError> {
    if window.len() < 2 {
        return Err(SnowballError::InsufficientHistory {
            observations: window.len(),
        });
    }
    let first = &window[0];
    let last = &window[window.len() - 1];
    let window_return = |slot: usize| trailing_return(first.prices[slot], last.prices[slot]);

    let mut weights: Vec<(String, f64)> = universe
        .weighted_tickers()
        .into_iter()
        .map(|ticker| (ticker, 0.0))
        .collect();

    if window_return(universe.hedge_slot()) < 0.0 {
        if let Some(safe) = weights.last_mut() {
            safe.1 = 1.0;
        }
        return Ok(weights);
    }

    let mut ranked: Vec<(usize, f64)> = universe
        .growth_slots()
        .map(|slot| (slot, window_return(slot)))
        .collect();
    // Stable sort keeps universe order on ties.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    for (slot, _) in ranked.into_iter().take(TOP_GROWTH) {
        weights[slot].1 = 1.0 / TOP_GROWTH as f64;
    }
    Ok(weights)
}
