//! Core domain types and logic.

pub mod backtest;
pub mod error;
pub mod momentum;
pub mod params;
pub mod performance;
pub mod price;
pub mod schedule;
pub mod simulator;
pub mod universe;
