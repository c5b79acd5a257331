//! Price store port trait.

use crate::domain::error::SnowballError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait PricePort {
    /// Closes for one ticker with `start <= date <= end`, ascending.
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SnowballError>;

    /// Upsert observations; an existing (date, ticker) row is replaced.
    /// Returns the number of rows written.
    fn insert_prices(&self, points: &[PricePoint]) -> Result<usize, SnowballError>;

    /// (first, last, count) of stored observations for one ticker, or
    /// `None` when the ticker has never been seen.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SnowballError>;
}
