//! Caller-supplied backtest parameters and their validation.

use crate::domain::error::SnowballError;
use chrono::NaiveDate;

/// Everything a caller chooses about a backtest run.
///
/// `trade_date` is a nominal day of month; months shorter than the
/// requested day trade on their last calendar day instead.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BacktestParams {
    pub start_year: i32,
    pub start_month: u32,
    pub initial_investment: f64,
    pub trade_date: u32,
    pub trading_fee: f64,
    pub rebalance_period: u32,
}

impl BacktestParams {
    pub fn validate(&self) -> Result<(), SnowballError> {
        validate_start_month(self.start_month)?;
        validate_initial_investment(self.initial_investment)?;
        validate_trade_date(self.trade_date)?;
        validate_trading_fee(self.trading_fee)?;
        validate_rebalance_period(self.rebalance_period)?;
        Ok(())
    }

    /// First day of the requested start month.
    pub fn start_date(&self) -> Result<NaiveDate, SnowballError> {
        NaiveDate::from_ymd_opt(self.start_year, self.start_month, 1).ok_or_else(|| {
            SnowballError::InvalidParameter {
                field: "start_year".to_string(),
                reason: format!("{}-{} is not a valid month", self.start_year, self.start_month),
            }
        })
    }
}

fn validate_start_month(month: u32) -> Result<(), SnowballError> {
    if !(1..=12).contains(&month) {
        return Err(SnowballError::InvalidParameter {
            field: "start_month".to_string(),
            reason: "must be between 1 and 12".to_string(),
        });
    }
    Ok(())
}

fn validate_initial_investment(amount: f64) -> Result<(), SnowballError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SnowballError::InvalidParameter {
            field: "initial_investment".to_string(),
            reason: "must be a positive amount".to_string(),
        });
    }
    Ok(())
}

fn validate_trade_date(day: u32) -> Result<(), SnowballError> {
    if !(1..=31).contains(&day) {
        return Err(SnowballError::InvalidParameter {
            field: "trade_date".to_string(),
            reason: "must be a day of month between 1 and 31".to_string(),
        });
    }
    Ok(())
}

fn validate_trading_fee(rate: f64) -> Result<(), SnowballError> {
    if !rate.is_finite() || rate < 0.0 || rate >= 1.0 {
        return Err(SnowballError::InvalidParameter {
            field: "trading_fee".to_string(),
            reason: "must be a rate between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_rebalance_period(months: u32) -> Result<(), SnowballError> {
    if months < 1 {
        return Err(SnowballError::InvalidParameter {
            field: "rebalance_period".to_string(),
            reason: "must be at least 1 month".to_string(),
        });
    }
    Ok(())
}
