//! CSV backtest report.
//!
//! Writes the per-bar ledger to the requested path and a one-row summary
//! next to it as `<stem>.summary.csv`.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::{BacktestResult, BarRecord};
use crate::domain::error::FuseError;
use crate::domain::recommendation::SignalKey;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    algo_label: &'a str,
    code: &'a str,
    exchange: &'a str,
    bars: usize,
    trade_count: usize,
    profitable_trades: usize,
    net: f64,
    total_invested: f64,
    returns: f64,
    max_drawdown: Option<f64>,
    average_move: f64,
    open_lots: usize,
    recommendation: String,
    buy_signals: String,
    sell_signals: String,
}

impl<'a> SummaryRow<'a> {
    fn from_result(result: &'a BacktestResult) -> Self {
        SummaryRow {
            algo_label: &result.algo_label,
            code: &result.code,
            exchange: &result.exchange,
            bars: result.records.len(),
            trade_count: result.trade_count,
            profitable_trades: result.profitable_trades,
            net: result.net,
            total_invested: result.total_invested,
            returns: result.returns,
            max_drawdown: result.max_drawdown,
            average_move: result.average_move,
            open_lots: result.open_lots.len(),
            recommendation: result.recommendation.to_string(),
            buy_signals: join_keys(&result.buy_signals),
            sell_signals: join_keys(&result.sell_signals),
        }
    }
}

fn join_keys(keys: &[SignalKey]) -> String {
    keys.iter().map(|k| k.name()).collect::<Vec<_>>().join(";")
}

fn ledger_header() -> Vec<&'static str> {
    let mut header = vec!["index", "date", "close", "action", "signal", "decision"];
    header.extend(SignalKey::ALL.iter().map(|k| k.name()));
    header
}

fn ledger_row(record: &BarRecord) -> Vec<String> {
    let mut row = vec![
        record.index.to_string(),
        record.date.to_string(),
        record.close.to_string(),
        record.action.to_string(),
        record.signal.map(|s| s.to_string()).unwrap_or_default(),
        record.recommendation.recommendation.to_string(),
    ];
    row.extend(record.recommendation.signals().map(|(_, s)| s.to_string()));
    row
}

pub fn summary_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".into());
    output_path.with_file_name(format!("{}.summary.csv", stem))
}

fn report_err(e: csv::Error) -> FuseError {
    FuseError::Report {
        reason: e.to_string(),
    }
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), FuseError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut ledger = csv::Writer::from_path(output_path).map_err(report_err)?;
        ledger.write_record(ledger_header()).map_err(report_err)?;
        for record in &result.records {
            ledger.write_record(ledger_row(record)).map_err(report_err)?;
        }
        ledger.flush()?;

        let mut summary = csv::Writer::from_path(summary_path(output_path)).map_err(report_err)?;
        summary
            .serialize(SummaryRow::from_result(result))
            .map_err(report_err)?;
        summary.flush()?;

        log::info!(
            "[report] wrote {} bars to {}",
            result.records.len(),
            output_path.display()
        );
        Ok(())
    }
}
