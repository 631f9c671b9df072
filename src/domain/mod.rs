//! Core domain types and logic.

pub mod ohlcv;
pub mod error;
pub mod indicator;
pub mod pattern;
pub mod pipeline;
pub mod signal;
pub mod recommendation;
pub mod trend;
pub mod divergence;
pub mod aggregator;
pub mod order_book;
pub mod backtest;
pub mod config_validation;
