//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::indicator::{
    calculate_ema, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, MacdPoint,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// How far back to look for the bar the histogram last changed sign on.
pub const CROSS_LOOKBACK: usize = 3;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let ema_fast = ema_raw_values(bars, fast);
    let ema_slow = ema_raw_values(bars, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();

    let k = 2.0 / (signal_period as f64 + 1.0);
    let mut signal_line = vec![0.0; bars.len()];
    let macd_warmup = slow - 1;

    if macd_warmup + signal_period <= bars.len() {
        let seed: f64 = macd_line[macd_warmup..macd_warmup + signal_period]
            .iter()
            .sum();
        let mut signal_ema = seed / signal_period as f64;
        signal_line[macd_warmup + signal_period - 1] = signal_ema;

        for i in (macd_warmup + signal_period)..bars.len() {
            signal_ema = macd_line[i] * k + signal_ema * (1.0 - k);
            signal_line[i] = signal_ema;
        }
    }

    let signal_warmup = slow - 1 + signal_period - 1;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            date: bar.date,
            valid: i >= signal_warmup,
            value: IndicatorValue::Macd {
                line: macd_line[i],
                signal: signal_line[i],
                histogram: macd_line[i] - signal_line[i],
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[PriceBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// The comparison point for a MACD cross on the last bar.
///
/// Scans up to [`CROSS_LOOKBACK`] bars back for the first whose histogram is
/// on the other side of zero (`> 0` vs `<= 0`). Falls back to the bar
/// immediately before when no sign change is found.
pub fn previous_cross_point(series: &IndicatorSeries) -> Option<MacdPoint> {
    let current = series.macd_at_offset(0)?;
    let positive = current.histogram > 0.0;

    (1..=CROSS_LOOKBACK)
        .filter_map(|offset| series.macd_at_offset(offset))
        .find(|p| (p.histogram > 0.0) != positive)
        .or_else(|| series.macd_at_offset(1))
}

fn ema_raw_values(bars: &[PriceBar], period: usize) -> Vec<f64> {
    calculate_ema(bars, period)
        .values
        .iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) => v,
            _ => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                code: "TEST".into(),
                exchange: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn macd_series(histograms: &[f64]) -> IndicatorSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        IndicatorSeries {
            indicator_type: IndicatorType::Macd {
                fast: DEFAULT_FAST,
                slow: DEFAULT_SLOW,
                signal: DEFAULT_SIGNAL,
            },
            values: histograms
                .iter()
                .enumerate()
                .map(|(i, &h)| IndicatorPoint {
                    date: start + chrono::Duration::days(i as i64),
                    valid: true,
                    value: IndicatorValue::Macd {
                        line: h,
                        signal: 0.0,
                        histogram: h,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn macd_warmup_default() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = calculate_macd_default(&make_bars(&prices));
        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        assert!(!series.values[warmup - 1].valid);
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let series = calculate_macd_default(&make_bars(&prices));
        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn macd_zero_period_is_empty() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        assert!(calculate_macd(&bars, 0, 26, 9).values.is_empty());
        assert!(calculate_macd(&bars, 12, 26, 0).values.is_empty());
    }

    #[test]
    fn previous_cross_finds_sign_change_within_lookback() {
        let series = macd_series(&[-0.5, 0.2, 0.3, 0.4]);
        let prev = previous_cross_point(&series).unwrap();
        assert!((prev.histogram + 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn previous_cross_defaults_to_prior_bar() {
        let series = macd_series(&[-0.5, 0.1, 0.2, 0.3, 0.4]);
        let prev = previous_cross_point(&series).unwrap();
        assert!((prev.histogram - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn previous_cross_treats_zero_as_non_positive() {
        let series = macd_series(&[0.0, -0.1, 0.2]);
        let prev = previous_cross_point(&series).unwrap();
        assert!((prev.histogram + 0.1).abs() < f64::EPSILON);
    }
}
