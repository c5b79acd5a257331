//! PostgreSQL storage adapter for prices and backtest results.

use crate::domain::backtest::{BacktestListEntry, StoredBacktest};
use crate::domain::error::SnowballError;
use crate::domain::params::BacktestParams;
use crate::domain::price::PricePoint;
use crate::domain::schedule::RebalanceEvent;
use crate::domain::simulator::NavPoint;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::result_port::ResultPort;
use chrono::NaiveDate;
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use std::sync::{Mutex, MutexGuard};

pub struct PostgresAdapter {
    client: Mutex<Client>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SnowballError> {
        // Try [postgres] connection_string first, fall back to [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| SnowballError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let client =
            Client::connect(&connection_string, NoTls).map_err(|e| SnowballError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: Mutex::new(client),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), SnowballError> {
        let mut client = self.lock_client()?;

        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS stock (
                    date DATE NOT NULL,
                    ticker TEXT NOT NULL,
                    price DOUBLE PRECISION NOT NULL,
                    PRIMARY KEY (date, ticker)
                );
                CREATE INDEX IF NOT EXISTS idx_stock_ticker_date ON stock(ticker, date);
                CREATE TABLE IF NOT EXISTS backtest_result (
                    data_id BIGSERIAL PRIMARY KEY,
                    start_year INTEGER NOT NULL,
                    start_month INTEGER NOT NULL,
                    initial_investment DOUBLE PRECISION NOT NULL,
                    trade_date INTEGER NOT NULL,
                    trading_fee DOUBLE PRECISION NOT NULL,
                    rebalance_period INTEGER NOT NULL,
                    nav_history TEXT NOT NULL,
                    rebalance_weights TEXT NOT NULL
                );",
            )
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn lock_client(&self) -> Result<MutexGuard<'_, Client>, SnowballError> {
        self.client.lock().map_err(|_| SnowballError::Database {
            reason: "postgres client mutex poisoned".into(),
        })
    }
}

impl PricePort for PostgresAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SnowballError> {
        let query = "SELECT date, ticker, price \
                     FROM stock \
                     WHERE ticker = $1 AND date >= $2 AND date <= $3 \
                     ORDER BY date ASC";

        let params: &[&(dyn ToSql + Sync)] = &[&ticker, &start, &end];
        let rows = self
            .lock_client()?
            .query(query, params)
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let points: Vec<PricePoint> = rows
            .into_iter()
            .map(|row| PricePoint {
                date: row.get(0),
                ticker: row.get(1),
                price: row.get(2),
            })
            .collect();

        Ok(points)
    }

    fn insert_prices(&self, points: &[PricePoint]) -> Result<usize, SnowballError> {
        let mut client = self.lock_client()?;

        let mut tx = client
            .transaction()
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut written: u64 = 0;
        for point in points {
            written += tx
                .execute(
                    "INSERT INTO stock (date, ticker, price) VALUES ($1, $2, $3) \
                     ON CONFLICT (date, ticker) DO UPDATE SET price = EXCLUDED.price",
                    &[&point.date, &point.ticker, &point.price],
                )
                .map_err(|e| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
        }

        tx.commit().map_err(|e| SnowballError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(written as usize)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SnowballError> {
        let query = "SELECT MIN(date), MAX(date), COUNT(*) FROM stock WHERE ticker = $1";

        let rows = self
            .lock_client()?
            .query(query, &[&ticker])
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        if rows.is_empty() {
            return Ok(None);
        }

        let row = &rows[0];
        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}

impl ResultPort for PostgresAdapter {
    fn save_backtest(
        &self,
        params: &BacktestParams,
        nav_history: &[NavPoint],
        weight_history: &[RebalanceEvent],
    ) -> Result<i64, SnowballError> {
        let nav_json =
            serde_json::to_string(nav_history).map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        let weights_json =
            serde_json::to_string(weight_history).map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let query = "INSERT INTO backtest_result \
                     (start_year, start_month, initial_investment, trade_date, trading_fee, \
                      rebalance_period, nav_history, rebalance_weights) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                     RETURNING data_id";

        // The u32 fields travel as INTEGER; the postgres crate has no u32 mapping.
        let start_month = params.start_month as i32;
        let trade_date = params.trade_date as i32;
        let rebalance_period = params.rebalance_period as i32;

        let row = self
            .lock_client()?
            .query_one(
                query,
                &[
                    &params.start_year,
                    &start_month,
                    &params.initial_investment,
                    &trade_date,
                    &params.trading_fee,
                    &rebalance_period,
                    &nav_json,
                    &weights_json,
                ],
            )
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(row.get(0))
    }

    fn load_backtest(&self, data_id: i64) -> Result<Option<StoredBacktest>, SnowballError> {
        let query = "SELECT data_id, start_year, start_month, initial_investment, trade_date, \
                            trading_fee, rebalance_period, nav_history, rebalance_weights \
                     FROM backtest_result \
                     WHERE data_id = $1";

        let row = self
            .lock_client()?
            .query_opt(query, &[&data_id])
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let nav_json: String = row.get(7);
        let weights_json: String = row.get(8);
        let nav_history: Vec<NavPoint> =
            serde_json::from_str(&nav_json).map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        let weight_history: Vec<RebalanceEvent> =
            serde_json::from_str(&weights_json).map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(Some(StoredBacktest {
            data_id: row.get(0),
            params: BacktestParams {
                start_year: row.get(1),
                start_month: row.get::<_, i32>(2) as u32,
                initial_investment: row.get(3),
                trade_date: row.get::<_, i32>(4) as u32,
                trading_fee: row.get(5),
                rebalance_period: row.get::<_, i32>(6) as u32,
            },
            nav_history,
            weight_history,
        }))
    }

    fn delete_backtest(&self, data_id: i64) -> Result<bool, SnowballError> {
        let deleted = self
            .lock_client()?
            .execute("DELETE FROM backtest_result WHERE data_id = $1", &[&data_id])
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(deleted > 0)
    }

    fn list_backtests(&self) -> Result<Vec<BacktestListEntry>, SnowballError> {
        let query = "SELECT data_id, rebalance_weights FROM backtest_result ORDER BY data_id ASC";

        let rows = self
            .lock_client()?
            .query(query, &[])
            .map_err(|e| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut entries = Vec::new();
        for row in rows {
            let data_id: i64 = row.get(0);
            let weights_json: String = row.get(1);
            let weight_history: Vec<RebalanceEvent> = serde_json::from_str(&weights_json)
                .map_err(|e| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            entries.push(BacktestListEntry {
                data_id,
                last_weights: weight_history
                    .last()
                    .map(|event| event.weights.clone())
                    .unwrap_or_default(),
            });
        }

        Ok(entries)
    }
}
