//! CSV price sheet reader.
//!
//! Ingests a wide sheet with a `Date` column and one price column per
//! universe ticker. Malformed rows are skipped and reported, not fatal.

use crate::domain::error::SnowballError;
use crate::domain::price::PricePoint;
use crate::domain::universe::Universe;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// A data row dropped during ingestion. `line` is 1-based within the file,
/// so the first data row of a headered sheet is line 2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub points: Vec<PricePoint>,
    pub skipped: Vec<SkippedRow>,
}

pub fn read_price_sheet(path: &Path, universe: &Universe) -> Result<IngestOutcome, SnowballError> {
    let content = fs::read_to_string(path)?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| SnowballError::PriceSheet {
            reason: format!("unreadable header: {}", e),
        })?
        .clone();

    let header_column = |name: &str| {
        headers
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(name))
    };

    let date_col = header_column("date").ok_or_else(|| SnowballError::PriceSheet {
        reason: "missing Date column".into(),
    })?;

    let mut ticker_cols = Vec::new();
    for ticker in universe.tickers() {
        let col = header_column(&ticker).ok_or_else(|| SnowballError::PriceSheet {
            reason: format!("missing column for {}", ticker),
        })?;
        ticker_cols.push((ticker, col));
    }

    let mut points = Vec::new();
    let mut skipped = Vec::new();

    'rows: for (i, result) in rdr.records().enumerate() {
        let line = i + 2;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                skipped.push(SkippedRow {
                    line,
                    reason: format!("unreadable row: {}", e),
                });
                continue;
            }
        };

        let date_str = record.get(date_col).unwrap_or("").trim();
        let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                skipped.push(SkippedRow {
                    line,
                    reason: format!("invalid date: {:?}", date_str),
                });
                continue;
            }
        };

        let mut row_points = Vec::with_capacity(ticker_cols.len());
        for (ticker, col) in &ticker_cols {
            let cell = record.get(*col).unwrap_or("").trim();
            let price = match cell.parse::<f64>() {
                Ok(price) if price.is_finite() => price,
                _ => {
                    skipped.push(SkippedRow {
                        line,
                        reason: format!("invalid {} value: {:?}", ticker, cell),
                    });
                    continue 'rows;
                }
            };
            row_points.push(PricePoint {
                ticker: ticker.clone(),
                date,
                price,
            });
        }

        points.extend(row_points);
    }

    Ok(IngestOutcome { points, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_sheet(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reads_columns_by_header_not_position() {
        let (_dir, path) = write_sheet(
            "Date,BIL,SPY,TIP,GLD,QQQ\n\
             2024-01-02,91.5,465.0,107.2,190.1,400.3\n\
             2024-01-03,91.6,467.2,107.0,189.8,402.8\n",
        );

        let outcome = read_price_sheet(&path, &Universe::default_etf()).unwrap();

        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.points.len(), 10);

        let spy_first = outcome
            .points
            .iter()
            .find(|p| p.ticker == "SPY" && p.date == date(2024, 1, 2))
            .unwrap();
        assert!((spy_first.price - 465.0).abs() < f64::EPSILON);

        let bil_last = outcome
            .points
            .iter()
            .find(|p| p.ticker == "BIL" && p.date == date(2024, 1, 3))
            .unwrap();
        assert!((bil_last.price - 91.6).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_cell_skips_the_whole_row() {
        let (_dir, path) = write_sheet(
            "Date,SPY,QQQ,GLD,TIP,BIL\n\
             2024-01-02,465.0,400.3,190.1,107.2,91.5\n\
             2024-01-03,467.2,n/a,189.8,107.0,91.6\n\
             2024-01-04,468.0,403.5,190.4,107.1,91.6\n",
        );

        let outcome = read_price_sheet(&path, &Universe::default_etf()).unwrap();

        assert_eq!(outcome.points.len(), 10);
        assert!(outcome.points.iter().all(|p| p.date != date(2024, 1, 3)));

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].line, 3);
        assert!(outcome.skipped[0].reason.contains("QQQ"));
    }

    #[test]
    fn bad_date_skips_the_row() {
        let (_dir, path) = write_sheet(
            "Date,SPY,QQQ,GLD,TIP,BIL\n\
             01/02/2024,465.0,400.3,190.1,107.2,91.5\n\
             2024-01-03,467.2,402.8,189.8,107.0,91.6\n",
        );

        let outcome = read_price_sheet(&path, &Universe::default_etf()).unwrap();

        assert_eq!(outcome.points.len(), 5);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].line, 2);
        assert!(outcome.skipped[0].reason.contains("date"));
    }

    #[test]
    fn non_finite_price_skips_the_row() {
        let (_dir, path) = write_sheet(
            "Date,SPY,QQQ,GLD,TIP,BIL\n\
             2024-01-02,NaN,400.3,190.1,107.2,91.5\n",
        );

        let outcome = read_price_sheet(&path, &Universe::default_etf()).unwrap();

        assert!(outcome.points.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].reason.contains("SPY"));
    }

    #[test]
    fn missing_ticker_column_is_fatal() {
        let (_dir, path) = write_sheet(
            "Date,SPY,QQQ,GLD,TIP\n\
             2024-01-02,465.0,400.3,190.1,107.2\n",
        );

        let result = read_price_sheet(&path, &Universe::default_etf());
        match result {
            Err(SnowballError::PriceSheet { reason }) => {
                assert!(reason.contains("BIL"));
            }
            other => panic!("expected PriceSheet error, got: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");

        let result = read_price_sheet(&path, &Universe::default_etf());
        assert!(matches!(result, Err(SnowballError::Io(_))));
    }
}
