#![allow(dead_code)]

use chrono::NaiveDate;
use fusetrader::domain::error::FuseError;
pub use fusetrader::domain::ohlcv::PriceBar;
use fusetrader::ports::quote_port::QuoteSource;
use std::collections::HashMap;

pub struct MockQuoteSource {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl QuoteSource for MockQuoteSource {
    fn fetch_bars(
        &self,
        code: &str,
        exchange: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, FuseError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(FuseError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<PriceBar> = self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start_date.is_none_or(|s| b.date >= s))
                    .filter(|b| end_date.is_none_or(|e| b.date <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(FuseError::NoData {
                code: code.to_string(),
                exchange: exchange.to_string(),
            });
        }
        Ok(bars)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(code: &str, date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        code: code.to_string(),
        exchange: "ASX".to_string(),
        date,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// One bar per calendar day from 2024-01-01.
pub fn generate_bars(code: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(code, start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

/// A steady climb that drops back to its starting price on the last bar.
pub fn plunge(n: usize) -> Vec<f64> {
    let mut closes = ramp(n - 1);
    closes.push(100.0);
    closes
}

/// Slow oscillation around 100 with a gentle drift.
pub fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            100.0 + 0.05 * x + 8.0 * (x / 6.0).sin()
        })
        .collect()
}

pub fn write_quotes_csv(dir: &std::path::Path, bars: &[PriceBar]) {
    let Some(first) = bars.first() else {
        return;
    };
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    let path = dir.join(format!("{}_{}.csv", first.code, first.exchange));
    std::fs::write(path, content).unwrap();
}
