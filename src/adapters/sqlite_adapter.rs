//! SQLite storage adapter for prices and backtest results.

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
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SnowballError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| SnowballError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| SnowballError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SnowballError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stock (
                date TEXT NOT NULL,
                ticker TEXT NOT NULL,
                price REAL NOT NULL,
                PRIMARY KEY (date, ticker)
            );
            CREATE INDEX IF NOT EXISTS idx_stock_ticker_date ON stock(ticker, date);
            CREATE TABLE IF NOT EXISTS backtest_result (
                data_id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_year INTEGER NOT NULL,
                start_month INTEGER NOT NULL,
                initial_investment REAL NOT NULL,
                trade_date INTEGER NOT NULL,
                trading_fee REAL NOT NULL,
                rebalance_period INTEGER NOT NULL,
                nav_history TEXT NOT NULL,
                rebalance_weights TEXT NOT NULL
            );",
        )
        .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

impl PricePort for SqliteAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let start_str = start.format("%Y-%m-%d").to_string();
        let end_str = end.format("%Y-%m-%d").to_string();

        let query = "SELECT date, ticker, price
                     FROM stock
                     WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                     ORDER BY date ASC";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map(params![ticker, start_str, end_str], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(PricePoint {
                    date,
                    ticker: row.get(1)?,
                    price: row.get(2)?,
                })
            })
            .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut points = Vec::new();
        for row in rows {
            points.push(
                row.map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(points)
    }

    fn insert_prices(&self, points: &[PricePoint]) -> Result<usize, SnowballError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let mut written = 0;
        for point in points {
            written += tx
                .execute(
                    "INSERT OR REPLACE INTO stock (date, ticker, price) VALUES (?1, ?2, ?3)",
                    params![
                        point.date.format("%Y-%m-%d").to_string(),
                        point.ticker,
                        point.price
                    ],
                )
                .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(written)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let query = "SELECT MIN(date), MAX(date), COUNT(*) FROM stock WHERE ticker = ?1";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![ticker], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = NaiveDate::parse_from_str(&min_str, "%Y-%m-%d").map_err(
                    |e: chrono::ParseError| SnowballError::Database {
                        reason: e.to_string(),
                    },
                )?;
                let max = NaiveDate::parse_from_str(&max_str, "%Y-%m-%d").map_err(
                    |e: chrono::ParseError| SnowballError::Database {
                        reason: e.to_string(),
                    },
                )?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl ResultPort for SqliteAdapter {
    fn save_backtest(
        &self,
        params: &BacktestParams,
        nav_history: &[NavPoint],
        weight_history: &[RebalanceEvent],
    ) -> Result<i64, SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let nav_json = serde_json::to_string(nav_history).map_err(|e: serde_json::Error| {
            SnowballError::DatabaseQuery {
                reason: e.to_string(),
            }
        })?;
        let weights_json =
            serde_json::to_string(weight_history).map_err(|e: serde_json::Error| {
                SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                }
            })?;

        conn.execute(
            "INSERT INTO backtest_result
             (start_year, start_month, initial_investment, trade_date, trading_fee,
              rebalance_period, nav_history, rebalance_weights)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                params.start_year,
                params.start_month,
                params.initial_investment,
                params.trade_date,
                params.trading_fee,
                params.rebalance_period,
                nav_json,
                weights_json
            ],
        )
        .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(conn.last_insert_rowid())
    }

    fn load_backtest(&self, data_id: i64) -> Result<Option<StoredBacktest>, SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let query = "SELECT data_id, start_year, start_month, initial_investment, trade_date,
                            trading_fee, rebalance_period, nav_history, rebalance_weights
                     FROM backtest_result
                     WHERE data_id = ?1";

        let row = conn
            .query_row(query, params![data_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    BacktestParams {
                        start_year: row.get(1)?,
                        start_month: row.get(2)?,
                        initial_investment: row.get(3)?,
                        trade_date: row.get(4)?,
                        trading_fee: row.get(5)?,
                        rebalance_period: row.get(6)?,
                    },
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(SnowballError::DatabaseQuery {
                    reason: other.to_string(),
                }),
            })?;

        let Some((data_id, params, nav_json, weights_json)) = row else {
            return Ok(None);
        };

        let nav_history: Vec<NavPoint> =
            serde_json::from_str(&nav_json).map_err(|e: serde_json::Error| {
                SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                }
            })?;
        let weight_history: Vec<RebalanceEvent> =
            serde_json::from_str(&weights_json).map_err(|e: serde_json::Error| {
                SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                }
            })?;

        Ok(Some(StoredBacktest {
            data_id,
            params,
            nav_history,
            weight_history,
        }))
    }

    fn delete_backtest(&self, data_id: i64) -> Result<bool, SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let deleted = conn
            .execute(
                "DELETE FROM backtest_result WHERE data_id = ?1",
                params![data_id],
            )
            .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(deleted > 0)
    }

    fn list_backtests(&self) -> Result<Vec<BacktestListEntry>, SnowballError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| SnowballError::Database {
                reason: e.to_string(),
            })?;

        let query = "SELECT data_id, rebalance_weights FROM backtest_result ORDER BY data_id ASC";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut entries = Vec::new();
        for row in rows {
            let (data_id, weights_json) =
                row.map_err(|e: rusqlite::Error| SnowballError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            let weight_history: Vec<RebalanceEvent> = serde_json::from_str(&weights_json)
                .map_err(|e: serde_json::Error| SnowballError::DatabaseQuery {
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

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

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

    #[test]
    fn from_config_missing_path() {
        let config = EmptyConfig;
        let result = SqliteAdapter::from_config(&config);
        match result {
            Err(SnowballError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn in_memory_initialization() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn fetch_prices_returns_rows_in_date_order() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();

        let points = vec![
            point("SPY", 2024, 1, 5, 470.0),
            point("SPY", 2024, 1, 2, 465.0),
            point("QQQ", 2024, 1, 2, 400.0),
        ];
        assert_eq!(adapter.insert_prices(&points).unwrap(), 3);

        let fetched = adapter
            .fetch_prices("SPY", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].date, date(2024, 1, 2));
        assert_eq!(fetched[1].date, date(2024, 1, 5));
        assert!((fetched[1].price - 470.0).abs() < f64::EPSILON);
    }

    #[test]
    fn insert_prices_replaces_existing_observation() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();

        adapter
            .insert_prices(&[point("SPY", 2024, 1, 2, 465.0)])
            .unwrap();
        adapter
            .insert_prices(&[point("SPY", 2024, 1, 2, 466.5)])
            .unwrap();

        let fetched = adapter
            .fetch_prices("SPY", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(fetched.len(), 1);
        assert!((fetched[0].price - 466.5).abs() < f64::EPSILON);
    }

    #[test]
    fn data_range_reports_bounds_and_count() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();

        adapter
            .insert_prices(&[
                point("GLD", 2023, 6, 1, 180.0),
                point("GLD", 2024, 1, 5, 190.0),
            ])
            .unwrap();

        let (min, max, count) = adapter.data_range("GLD").unwrap().unwrap();
        assert_eq!(min, date(2023, 6, 1));
        assert_eq!(max, date(2024, 1, 5));
        assert_eq!(count, 2);
    }

    #[test]
    fn data_range_none_for_unknown_ticker() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        assert!(adapter.data_range("SPY").unwrap().is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();

        let params = BacktestParams {
            start_year: 2020,
            start_month: 1,
            initial_investment: 10_000.0,
            trade_date: 15,
            trading_fee: 0.001,
            rebalance_period: 3,
        };
        let nav_history = vec![
            NavPoint {
                date: date(2020, 1, 15),
                nav: 10_000.0,
            },
            NavPoint {
                date: date(2020, 4, 15),
                nav: 10_400.0,
            },
        ];
        let weight_history = vec![RebalanceEvent {
            date: date(2020, 1, 15),
            weights: vec![
                ("SPY".to_string(), 0.5),
                ("QQQ".to_string(), 0.5),
                ("GLD".to_string(), 0.0),
                ("BIL".to_string(), 0.0),
            ],
        }];

        let data_id = adapter
            .save_backtest(&params, &nav_history, &weight_history)
            .unwrap();
        assert!(data_id >= 1);

        let stored = adapter.load_backtest(data_id).unwrap().unwrap();
        assert_eq!(stored.data_id, data_id);
        assert_eq!(stored.params, params);
        assert_eq!(stored.nav_history, nav_history);
        assert_eq!(stored.weight_history, weight_history);
    }

    #[test]
    fn load_unknown_id_is_none() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        assert!(adapter.load_backtest(99).unwrap().is_none());
    }
}
