//! CSV quote source.
//!
//! Reads `{code}_{exchange}.csv` under a base directory. Expected header:
//! `date,open,high,low,close,volume` with ISO dates.

use crate::domain::config_validation::DATE_FORMAT;
use crate::domain::error::FuseError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::quote_port::QuoteSource;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct QuoteRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, exchange: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, exchange))
    }
}

impl QuoteSource for CsvAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        exchange: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, FuseError> {
        let path = self.csv_path(code, exchange);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| FuseError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<QuoteRow>().enumerate() {
            let row = result.map_err(|e| FuseError::Data {
                reason: format!("{} row {}: {}", path.display(), line + 1, e),
            })?;
            let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FORMAT).map_err(|e| {
                FuseError::Data {
                    reason: format!("{} row {}: invalid date: {}", path.display(), line + 1, e),
                }
            })?;

            if start_date.is_some_and(|start| date < start)
                || end_date.is_some_and(|end| date > end)
            {
                continue;
            }

            bars.push(PriceBar {
                code: code.to_string(),
                exchange: exchange.to_string(),
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        if bars.is_empty() {
            return Err(FuseError::NoData {
                code: code.to_string(),
                exchange: exchange.to_string(),
            });
        }

        bars.sort_by_key(|b| b.date);
        log::debug!(
            "loaded {} bars for {}.{} from {}",
            bars.len(),
            code,
            exchange,
            path.display()
        );
        Ok(bars)
    }
}
