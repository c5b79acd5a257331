//! Daily close prices and the aligned multi-ticker price table.

use crate::domain::universe::Universe;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// A single observed closing price for one ticker on one day.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PricePoint {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
}

/// One trading day with a close for every universe ticker.
///
/// `prices` is indexed by universe slot, in `Universe::tickers` order.
#[derive(Debug, Clone)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub prices: Vec<f64>,
}

/// Date-aligned price table for a whole universe, ascending by date.
///
/// Dates where any universe ticker has no observation are dropped, so
/// every row is complete.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    universe: Universe,
    rows: Vec<PriceRow>,
}

impl PriceHistory {
    /// Align per-ticker series into complete rows.
    ///
    /// `series` must be in `universe.tickers()` order. Duplicate dates
    /// within one series keep the last observation.
    pub fn build(universe: Universe, series: Vec<Vec<PricePoint>>) -> Self {
        let width = universe.count();
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (slot, points) in series.into_iter().enumerate().take(width) {
            for point in points {
                let entry = by_date.entry(point.date).or_insert_with(|| vec![None; width]);
                entry[slot] = Some(point.price);
            }
        }
        let rows = by_date
            .into_iter()
            .filter_map(|(date, prices)| {
                let prices: Option<Vec<f64>> = prices.into_iter().collect();
                prices.map(|prices| PriceRow { date, prices })
            })
            .collect();
        Self { universe, rows }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|row| row.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|row| row.date)
    }

    /// Rows with `from <= date <= to`.
    pub fn window(&self, from: NaiveDate, to: NaiveDate) -> &[PriceRow] {
        let start = self.rows.partition_point(|row| row.date < from);
        let end = self.rows.partition_point(|row| row.date <= to);
        &self.rows[start..end]
    }

    /// Rows falling inside one calendar month.
    pub fn month_rows(&self, year: i32, month: u32) -> &[PriceRow] {
        let start = self.rows.partition_point(|row| {
            (row.date.year(), row.date.month()) < (year, month)
        });
        let end = self.rows.partition_point(|row| {
            (row.date.year(), row.date.month()) <= (year, month)
        });
        &self.rows[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(ticker: &str, y: i32, m: u32, d: u32, price: f64) -> PricePoint {
        PricePoint {
            ticker: ticker.to_string(),
            date: date(y, m, d),
            price,
        }
    }

    fn two_ticker_universe() -> Universe {
        Universe::new(vec!["AAA".into(), "BBB".into()], "HDG".into(), "CSH".into())
    }

    fn sample_history() -> PriceHistory {
        let universe = two_ticker_universe();
        let series = vec![
            vec![
                point("AAA", 2024, 1, 2, 10.0),
                point("AAA", 2024, 1, 3, 11.0),
                point("AAA", 2024, 2, 1, 12.0),
            ],
            vec![
                point("BBB", 2024, 1, 2, 20.0),
                point("BBB", 2024, 1, 3, 21.0),
                point("BBB", 2024, 2, 1, 22.0),
            ],
            vec![
                point("HDG", 2024, 1, 2, 30.0),
                point("HDG", 2024, 1, 3, 31.0),
                point("HDG", 2024, 2, 1, 32.0),
            ],
            vec![
                point("CSH", 2024, 1, 2, 40.0),
                point("CSH", 2024, 1, 3, 41.0),
                point("CSH", 2024, 2, 1, 42.0),
            ],
        ];
        PriceHistory::build(universe, series)
    }

    #[test]
    fn build_aligns_by_date() {
        let history = sample_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history.rows()[0].date, date(2024, 1, 2));
        assert_eq!(history.rows()[0].prices, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(history.rows()[2].date, date(2024, 2, 1));
    }

    #[test]
    fn build_drops_incomplete_dates() {
        let universe = two_ticker_universe();
        let series = vec![
            vec![point("AAA", 2024, 1, 2, 10.0), point("AAA", 2024, 1, 3, 11.0)],
            vec![point("BBB", 2024, 1, 2, 20.0)],
            vec![point("HDG", 2024, 1, 2, 30.0), point("HDG", 2024, 1, 3, 31.0)],
            vec![point("CSH", 2024, 1, 2, 40.0), point("CSH", 2024, 1, 3, 41.0)],
        ];
        let history = PriceHistory::build(universe, series);

        // Jan 3 is missing BBB, so only Jan 2 survives.
        assert_eq!(history.len(), 1);
        assert_eq!(history.rows()[0].date, date(2024, 1, 2));
    }

    #[test]
    fn build_keeps_last_duplicate() {
        let universe = two_ticker_universe();
        let series = vec![
            vec![point("AAA", 2024, 1, 2, 10.0), point("AAA", 2024, 1, 2, 15.0)],
            vec![point("BBB", 2024, 1, 2, 20.0)],
            vec![point("HDG", 2024, 1, 2, 30.0)],
            vec![point("CSH", 2024, 1, 2, 40.0)],
        ];
        let history = PriceHistory::build(universe, series);

        assert_eq!(history.len(), 1);
        assert!((history.rows()[0].prices[0] - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn window_is_inclusive() {
        let history = sample_history();
        let window = history.window(date(2024, 1, 3), date(2024, 2, 1));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].date, date(2024, 1, 3));
        assert_eq!(window[1].date, date(2024, 2, 1));
    }

    #[test]
    fn window_outside_data_is_empty() {
        let history = sample_history();
        assert!(history.window(date(2023, 1, 1), date(2023, 12, 31)).is_empty());
        assert!(history.window(date(2024, 3, 1), date(2024, 3, 31)).is_empty());
    }

    #[test]
    fn month_rows_selects_one_month() {
        let history = sample_history();
        let january = history.month_rows(2024, 1);
        assert_eq!(january.len(), 2);
        let february = history.month_rows(2024, 2);
        assert_eq!(february.len(), 1);
        assert!(history.month_rows(2024, 3).is_empty());
    }

    #[test]
    fn empty_history() {
        let universe = two_ticker_universe();
        let history = PriceHistory::build(universe, vec![vec![], vec![], vec![], vec![]]);
        assert!(history.is_empty());
        assert_eq!(history.first_date(), None);
        assert_eq!(history.last_date(), None);
    }
}
