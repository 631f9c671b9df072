//! Backtest engine: replays per-bar decisions through an [`OrderBook`].
//!
//! `BacktestConfig` selects the aggregation policy and forced-exit bounds.
//! `run_backtest` goes from raw bars to a full `BacktestResult`; `simulate`
//! accepts snapshots that already carry recommendations.

use chrono::NaiveDate;

use crate::domain::aggregator::{process_series, AggregationPolicy};
use crate::domain::error::FuseError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::order_book::{Action, ClosedTrade, ExitThresholds, OrderBook};
use crate::domain::pipeline::{IndicatorSnapshot, PipelineConfig};
use crate::domain::recommendation::{OrderType, Recommendation, SignalKey};
use crate::domain::signal::Signal;

/// Trailing bars whose active signals are reported with the result.
pub const SIGNAL_SUMMARY_BARS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub algo_label: String,
    pub policy: AggregationPolicy,
    pub pipeline: PipelineConfig,
    pub thresholds: ExitThresholds,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            algo_label: "fusion".into(),
            policy: AggregationPolicy::default(),
            pipeline: PipelineConfig::default(),
            thresholds: ExitThresholds::default(),
        }
    }
}

/// One simulated bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRecord {
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
    pub action: Action,
    pub signal: Option<OrderType>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub algo_label: String,
    pub code: String,
    pub exchange: String,
    pub net: f64,
    pub total_invested: f64,
    pub returns: f64,
    pub trade_count: usize,
    pub profitable_trades: usize,
    /// Worst realized per-trade return; `None` when nothing closed.
    pub max_drawdown: Option<f64>,
    pub average_move: f64,
    pub buy_signals: Vec<SignalKey>,
    pub sell_signals: Vec<SignalKey>,
    /// Decision on the final bar.
    pub recommendation: OrderType,
    /// Lots still held at the end; not realized.
    pub open_lots: Vec<f64>,
    pub records: Vec<BarRecord>,
    pub trades: Vec<ClosedTrade>,
    /// Snapshots the run was decided on, in bar order.
    pub signals: Vec<IndicatorSnapshot>,
}

/// Full run: indicators, trend, aggregation and simulation.
pub fn run_backtest(
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestResult, FuseError> {
    let snapshots = process_series(bars, &config.pipeline, config.policy)?;
    let result = simulate(bars, &snapshots, config)?;
    log::info!(
        "[backtest] {} {}.{}: {} bars, {} trades ({} profitable), net {:.2}, returns {:.4}",
        result.algo_label,
        result.code,
        result.exchange,
        result.records.len(),
        result.trade_count,
        result.profitable_trades,
        result.net,
        result.returns
    );
    if !result.open_lots.is_empty() {
        log::info!(
            "[backtest] {} lots left open at {}",
            result.open_lots.len(),
            result.records.last().map(|r| r.date.to_string()).unwrap_or_default()
        );
    }
    Ok(result)
}

/// Walk `snapshots` in order. Snapshots without a recommendation act as
/// all-neutral with no decision.
///
/// `bars` is the full input series, warm-up included; it only feeds
/// `average_move`.
pub fn simulate(
    bars: &[PriceBar],
    snapshots: &[IndicatorSnapshot],
    config: &BacktestConfig,
) -> Result<BacktestResult, FuseError> {
    let mut book = OrderBook::new();
    let mut records = Vec::with_capacity(snapshots.len());

    for snapshot in snapshots {
        let recommendation = snapshot.recommendation.unwrap_or_default();
        let outcome = book.step(
            &snapshot.bar,
            recommendation.recommendation,
            &config.thresholds,
        )?;
        records.push(BarRecord {
            index: snapshot.index,
            date: snapshot.bar.date,
            close: snapshot.bar.close,
            action: outcome.action,
            signal: outcome.signal,
            recommendation,
        });
    }

    let returns = if book.total_invested > 0.0 {
        book.net / book.total_invested
    } else {
        0.0
    };
    let tail = &records[records.len().saturating_sub(SIGNAL_SUMMARY_BARS)..];
    let (code, exchange) = snapshots
        .first()
        .map(|s| (s.bar.code.clone(), s.bar.exchange.clone()))
        .unwrap_or_default();

    Ok(BacktestResult {
        algo_label: config.algo_label.clone(),
        code,
        exchange,
        net: book.net,
        total_invested: book.total_invested,
        returns,
        trade_count: book.trade_count,
        profitable_trades: book.profitable_trades,
        max_drawdown: book.max_drawdown,
        average_move: average_move(bars),
        buy_signals: active_signals(tail, Signal::Bullish),
        sell_signals: active_signals(tail, Signal::Bearish),
        recommendation: records
            .last()
            .map_or(OrderType::None, |r| r.recommendation.recommendation),
        open_lots: book.open_lots,
        records,
        trades: book.closed_trades,
        signals: snapshots.to_vec(),
    })
}

/// Mean high-low range, or the last bar's range if the mean is not finite.
fn average_move(bars: &[PriceBar]) -> f64 {
    let Some(last) = bars.last() else {
        return 0.0;
    };
    let mean = bars.iter().map(PriceBar::range).sum::<f64>() / bars.len() as f64;
    if mean.is_finite() { mean } else { last.range() }
}

fn active_signals(records: &[BarRecord], wanted: Signal) -> Vec<SignalKey> {
    SignalKey::ALL
        .into_iter()
        .filter(|&key| records.iter().any(|r| r.recommendation.get(key) == wanted))
        .collect()
}
