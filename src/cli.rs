//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::SnowballError;

use crate::domain::params::BacktestParams;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
use crate::domain::backtest::{self as backtest_engine, AnalysisConfig};
#[cfg(any(feature = "sqlite", feature = "postgres"))]
use crate::domain::universe::Universe;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
use crate::ports::price_port::PricePort;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
use crate::ports::result_port::ResultPort;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "snowball", about = "Momentum ETF rotation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        start_month: u32,
        /// Initial investment amount
        #[arg(long)]
        invest: f64,
        /// Nominal day of month to trade on
        #[arg(long, default_value_t = 15)]
        trade_day: u32,
        /// Proportional fee per traded notional
        #[arg(long, default_value_t = 0.0)]
        fee: f64,
        /// Rebalance period in months
        #[arg(long, default_value_t = 3)]
        period: u32,
        /// Persist the result and print its data id
        #[arg(long)]
        save: bool,
    },
    /// Load the configured price sheet into the store
    Ingest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price sheet path, overrides [data] price_csv
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show stored data range per universe ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            start_year,
            start_month,
            invest,
            trade_day,
            fee,
            period,
            save,
        } => {
            let params = BacktestParams {
                start_year,
                start_month,
                initial_investment: invest,
                trade_date: trade_day,
                trading_fee: fee,
                rebalance_period: period,
            };
            run_backtest(&config, params, save)
        }
        Command::Ingest { config, file } => run_ingest(&config, file.as_ref()),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
        Command::Serve { config } => run_serve(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SnowballError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Opens the configured store and hands it out under both port traits.
/// Postgres wins when a connection string is configured, SQLite otherwise.
#[cfg(any(feature = "sqlite", feature = "postgres"))]
fn open_store(
    config: &FileConfigAdapter,
) -> Result<
    (
        Arc<dyn PricePort + Send + Sync>,
        Arc<dyn ResultPort + Send + Sync>,
    ),
    SnowballError,
> {
    #[cfg(feature = "postgres")]
    {
        use crate::adapters::postgres_adapter::PostgresAdapter;
        use crate::ports::config_port::ConfigPort;

        if config.get_string("postgres", "connection_string").is_some()
            || config.get_string("database", "conninfo").is_some()
        {
            let adapter = Arc::new(PostgresAdapter::from_config(config)?);
            adapter.initialize_schema()?;
            let price: Arc<dyn PricePort + Send + Sync> = adapter.clone();
            let result: Arc<dyn ResultPort + Send + Sync> = adapter;
            return Ok((price, result));
        }
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let adapter = Arc::new(SqliteAdapter::from_config(config)?);
        adapter.initialize_schema()?;
        let price: Arc<dyn PricePort + Send + Sync> = adapter.clone();
        let result: Arc<dyn ResultPort + Send + Sync> = adapter;
        Ok((price, result))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(SnowballError::ConfigMissing {
            section: "postgres".into(),
            key: "connection_string".into(),
        })
    }
}

fn run_backtest(config_path: &PathBuf, params: BacktestParams, save: bool) -> ExitCode {
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    {
        // Stage 1: Load config
        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        // Stage 2: Validate parameters
        if let Err(e) = params.validate() {
            eprintln!("error: {e}");
            return (&e).into();
        }

        // Stage 3: Open the store
        let (price_port, result_port) = match open_store(&config) {
            Ok(ports) => ports,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        // Stage 4: Run the engine
        let universe = Universe::default_etf();
        let analysis = AnalysisConfig::from_config(&config);

        eprintln!(
            "Running backtest from {}-{:02}, rebalancing every {} month(s)",
            params.start_year, params.start_month, params.rebalance_period
        );

        let run = match backtest_engine::run_backtest(
            price_port.as_ref(),
            &universe,
            &params,
            &analysis,
        ) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        // Stage 5: Print console summary to stderr
        let summary = &run.summary;
        eprintln!("\n=== Backtest Results ===");
        eprintln!("Rebalances:       {}", run.weight_history.len());
        eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
        eprintln!("CAGR:             {:.2}%", summary.cagr * 100.0);
        eprintln!("Volatility:       {:.2}%", summary.volatility * 100.0);
        match summary.sharpe_ratio {
            Some(sharpe) => eprintln!("Sharpe Ratio:     {:.2}", sharpe),
            None => eprintln!("Sharpe Ratio:     n/a (flat NAV)"),
        }
        eprintln!("Max Drawdown:     {:.1}%", summary.max_drawdown * 100.0);

        eprintln!("\nFinal target weights:");
        for (ticker, weight) in run.last_weights() {
            eprintln!("  {}: {:.0}%", ticker, weight * 100.0);
        }

        // Stage 6: Persist on request, data id on stdout
        if save {
            match result_port.save_backtest(&params, &run.nav_history, &run.weight_history) {
                Ok(data_id) => println!("{data_id}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }

        ExitCode::SUCCESS
    }

    #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
    {
        let _ = (config_path, params, save);
        eprintln!("error: a storage feature (sqlite or postgres) is required for backtest");
        ExitCode::from(1)
    }
}

fn run_ingest(config_path: &PathBuf, file_override: Option<&PathBuf>) -> ExitCode {
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    {
        use crate::adapters::csv_adapter::read_price_sheet;
        use crate::ports::config_port::ConfigPort;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        // The flag wins over [data] price_csv
        let sheet_path: PathBuf = match file_override {
            Some(p) => p.clone(),
            None => match config.get_string("data", "price_csv") {
                Some(p) => PathBuf::from(p),
                None => {
                    let err = SnowballError::ConfigMissing {
                        section: "data".into(),
                        key: "price_csv".into(),
                    };
                    eprintln!("error: {err}");
                    return (&err).into();
                }
            },
        };

        let universe = Universe::default_etf();

        eprintln!("Reading price sheet {}", sheet_path.display());
        let outcome = match read_price_sheet(&sheet_path, &universe) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let (price_port, _result_port) = match open_store(&config) {
            Ok(ports) => ports,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let inserted = match price_port.insert_prices(&outcome.points) {
            Ok(n) => n,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        eprintln!("{} price points inserted", inserted);
        if !outcome.skipped.is_empty() {
            eprintln!("{} rows skipped:", outcome.skipped.len());
            for skip in &outcome.skipped {
                eprintln!("  line {}: {}", skip.line, skip.reason);
            }
        }

        ExitCode::SUCCESS
    }

    #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
    {
        let _ = (config_path, file_override);
        eprintln!("error: a storage feature (sqlite or postgres) is required for ingest");
        ExitCode::from(1)
    }
}

fn run_info(config_path: &PathBuf, ticker: Option<&str>) -> ExitCode {
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let (price_port, _result_port) = match open_store(&config) {
            Ok(ports) => ports,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let universe = Universe::default_etf();
        let tickers: Vec<String> = match ticker {
            Some(t) => vec![t.to_uppercase()],
            None => universe.tickers(),
        };

        for t in &tickers {
            match price_port.data_range(t) {
                Ok(Some((min_date, max_date, count))) => {
                    println!("{}: {} rows, {} to {}", t, count, min_date, max_date);
                }
                Ok(None) => {
                    eprintln!("{}: no data found", t);
                }
                Err(e) => {
                    eprintln!("error querying {}: {}", t, e);
                }
            }
        }

        ExitCode::SUCCESS
    }

    #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
    {
        let _ = (config_path, ticker);
        eprintln!("error: a storage feature (sqlite or postgres) is required for info");
        ExitCode::from(1)
    }
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(all(feature = "web", any(feature = "sqlite", feature = "postgres")))]
    {
        use crate::adapters::web::{AppState, build_router};
        use crate::ports::config_port::ConfigPort;
        use std::net::SocketAddr;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let (price_port, result_port) = match open_store(&config) {
            Ok(ports) => ports,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let addr: SocketAddr = config
            .get_string("web", "listen")
            .unwrap_or_else(|| "127.0.0.1:8000".to_string())
            .parse()
            .unwrap_or_else(|_| "127.0.0.1:8000".parse().unwrap());

        eprintln!("Starting web server on {}", addr);

        let state = AppState {
            price_port,
            result_port,
            config: Arc::new(config),
            universe: Universe::default_etf(),
        };

        let router = build_router(state);

        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        ExitCode::SUCCESS
    }

    #[cfg(not(all(feature = "web", any(feature = "sqlite", feature = "postgres"))))]
    {
        let _ = config_path;
        eprintln!("error: the web feature and a storage backend are required for serve");
        ExitCode::from(1)
    }
}
