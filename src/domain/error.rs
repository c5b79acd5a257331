//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for snowball.
#[derive(Debug, thiserror::Error)]
pub enum SnowballError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient history: lookback window has {observations} observations, need at least 2")]
    InsufficientHistory { observations: usize },

    #[error("invalid price for {ticker} on {date}: {price}")]
    InvalidPrice {
        ticker: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("unknown ticker in weight set: {ticker}")]
    UnknownTicker { ticker: String },

    #[error("insufficient data: have {points} portfolio values, need {minimum}")]
    InsufficientData { points: usize, minimum: usize },

    #[error("degenerate time span: portfolio history covers zero days")]
    DegenerateTimeSpan,

    #[error("backtest {data_id} not found")]
    NotFound { data_id: i64 },

    #[error("price sheet error: {reason}")]
    PriceSheet { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn exit_code(err: &SnowballError) -> u8 {
    match err {
        SnowballError::Io(_) => 1,
        SnowballError::ConfigParse { .. }
        | SnowballError::ConfigMissing { .. }
        | SnowballError::ConfigInvalid { .. } => 2,
        SnowballError::Database { .. } | SnowballError::DatabaseQuery { .. } => 3,
        SnowballError::InvalidParameter { .. } => 4,
        SnowballError::NoData { .. }
        | SnowballError::InsufficientHistory { .. }
        | SnowballError::InvalidPrice { .. }
        | SnowballError::UnknownTicker { .. }
        | SnowballError::InsufficientData { .. }
        | SnowballError::DegenerateTimeSpan
        | SnowballError::NotFound { .. }
        | SnowballError::PriceSheet { .. } => 5,
    }
}

impl From<&SnowballError> for std::process::ExitCode {
    fn from(err: &SnowballError) -> Self {
        std::process::ExitCode::from(exit_code(err))
    }
}
