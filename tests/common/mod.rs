#![allow(dead_code)]

use chrono::NaiveDate;
use snowball::domain::backtest::{BacktestListEntry, StoredBacktest};
use snowball::domain::error::SnowballError;
use snowball::domain::params::BacktestParams;
pub use snowball::domain::price::PricePoint;
use snowball::domain::schedule::RebalanceEvent;
use snowball::domain::simulator::NavPoint;
use snowball::ports::price_port::PricePort;
use snowball::ports::result_port::ResultPort;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Default universe ticker order used by `with_row`.
pub const TICKERS: [&str; 5] = ["SPY", "QQQ", "GLD", "TIP", "BIL"];

pub struct MockPricePort {
    data: Mutex<HashMap<String, BTreeMap<NaiveDate, f64>>>,
    errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            errors: HashMap::new(),
        }
    }

    /// One observation per default universe ticker, in `TICKERS` order.
    pub fn with_row(self, date: NaiveDate, prices: [f64; 5]) -> Self {
        {
            let mut data = self.data.lock().unwrap();
            for (ticker, price) in TICKERS.iter().zip(prices) {
                data.entry(ticker.to_string()).or_default().insert(date, price);
            }
        }
        self
    }

    pub fn with_price(self, ticker: &str, date: NaiveDate, price: f64) -> Self {
        self.data
            .lock()
            .unwrap()
            .entry(ticker.to_string())
            .or_default()
            .insert(date, price);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SnowballError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SnowballError::Database {
                reason: reason.clone(),
            });
        }
        let data = self.data.lock().unwrap();
        Ok(data
            .get(ticker)
            .map(|series| {
                series
                    .range(start..=end)
                    .map(|(date, price)| PricePoint {
                        ticker: ticker.to_string(),
                        date: *date,
                        price: *price,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert_prices(&self, points: &[PricePoint]) -> Result<usize, SnowballError> {
        let mut data = self.data.lock().unwrap();
        for point in points {
            data.entry(point.ticker.clone())
                .or_default()
                .insert(point.date, point.price);
        }
        Ok(points.len())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SnowballError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SnowballError::Database {
                reason: reason.clone(),
            });
        }
        let data = self.data.lock().unwrap();
        match data.get(ticker) {
            Some(series) if !series.is_empty() => {
                let min = *series.keys().next().unwrap();
                let max = *series.keys().next_back().unwrap();
                Ok(Some((min, max, series.len())))
            }
            _ => Ok(None),
        }
    }
}

pub struct MockResultPort {
    stored: Mutex<Vec<StoredBacktest>>,
    next_id: Mutex<i64>,
}

impl MockResultPort {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }
}

impl ResultPort for MockResultPort {
    fn save_backtest(
        &self,
        params: &BacktestParams,
        nav_history: &[NavPoint],
        weight_history: &[RebalanceEvent],
    ) -> Result<i64, SnowballError> {
        let mut next = self.next_id.lock().unwrap();
        let data_id = *next;
        *next += 1;
        self.stored.lock().unwrap().push(StoredBacktest {
            data_id,
            params: params.clone(),
            nav_history: nav_history.to_vec(),
            weight_history: weight_history.to_vec(),
        });
        Ok(data_id)
    }

    fn load_backtest(&self, data_id: i64) -> Result<Option<StoredBacktest>, SnowballError> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.data_id == data_id)
            .cloned())
    }

    fn delete_backtest(&self, data_id: i64) -> Result<bool, SnowballError> {
        let mut stored = self.stored.lock().unwrap();
        let before = stored.len();
        stored.retain(|s| s.data_id != data_id);
        Ok(stored.len() < before)
    }

    fn list_backtests(&self) -> Result<Vec<BacktestListEntry>, SnowballError> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|s| BacktestListEntry {
                data_id: s.data_id,
                last_weights: s.last_weights(),
            })
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Parameters matching the `quarterly_port` fixture: quarterly rebalances
/// on the 15th starting 2020-01, no fees.
pub fn sample_params() -> BacktestParams {
    BacktestParams {
        start_year: 2020,
        start_month: 1,
        initial_investment: 10_000.0,
        trade_date: 15,
        trading_fee: 0.0,
        rebalance_period: 3,
    }
}

/// Four quarterly observations per ticker. With `sample_params` this yields
/// three rebalances: risk-on (QQQ and SPY lead), risk-off (TIP fell), then
/// risk-on again (SPY and QQQ lead).
pub fn quarterly_port() -> MockPricePort {
    MockPricePort::new()
        .with_row(date(2019, 10, 15), [100.0, 100.0, 100.0, 100.0, 100.0])
        .with_row(date(2020, 1, 15), [105.0, 108.0, 102.0, 101.0, 100.0])
        .with_row(date(2020, 4, 15), [95.0, 100.0, 104.0, 99.0, 100.0])
        .with_row(date(2020, 7, 15), [100.0, 105.0, 106.0, 100.0, 100.0])
}

pub fn nav(y: i32, m: u32, d: u32, value: f64) -> NavPoint {
    NavPoint {
        date: date(y, m, d),
        nav: value,
    }
}

pub fn event(y: i32, m: u32, d: u32, weights: &[(&str, f64)]) -> RebalanceEvent {
    RebalanceEvent {
        date: date(y, m, d),
        weights: weights
            .iter()
            .map(|(ticker, weight)| (ticker.to_string(), *weight))
            .collect(),
    }
}
