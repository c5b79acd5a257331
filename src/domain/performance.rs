//! Performance statistics over a portfolio value series.

use crate::domain::error::SnowballError;
use crate::domain::simulator::NavPoint;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const TRADING_PERIODS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Summary statistics for one backtest.
///
/// `sharpe_ratio` is `None` when volatility is zero; the ratio is
/// undefined there rather than infinite.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PerformanceSummary {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
}

/// Compute summary statistics from a dated value series.
///
/// `periods_per_year` scales per-period volatility to annual terms and
/// should match the series cadence. Needs at least two points spanning
/// at least one day.
pub fn analyze(
    nav_history: &[NavPoint],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Result<PerformanceSummary, SnowballError> {
    if nav_history.len() < 2 {
        return Err(SnowballError::InsufficientData {
            points: nav_history.len(),
            minimum: 2,
        });
    }

    let first = &nav_history[0];
    let last = &nav_history[nav_history.len() - 1];
    let days = (last.date - first.date).num_days();
    if days <= 0 {
        return Err(SnowballError::DegenerateTimeSpan);
    }
    let years = days as f64 / DAYS_PER_YEAR;

    let total_return = last.nav / first.nav - 1.0;
    let cagr = (1.0 + total_return).powf(1.0 / years) - 1.0;

    let returns: Vec<f64> = nav_history
        .windows(2)
        .map(|pair| pair[1].nav / pair[0].nav - 1.0)
        .collect();
    let volatility = sample_stddev(&returns) * periods_per_year.sqrt();

    let sharpe_ratio = if volatility == 0.0 {
        None
    } else {
        Some((cagr - risk_free_rate) / volatility)
    };

    Ok(PerformanceSummary {
        total_return,
        cagr,
        volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(nav_history),
    })
}

/// Sample standard deviation, zero when fewer than two observations.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Most negative decline from a running peak, as a non-positive ratio.
fn max_drawdown(nav_history: &[NavPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for point in nav_history {
        if point.nav > peak {
            peak = point.nav;
        } else if peak > 0.0 {
            let dd = point.nav / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}
