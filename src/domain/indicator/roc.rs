//! ROC (Rate of Change) indicator.
//!
//! ROC(n)[i] = (C[i] - C[i-n]) / C[i-n], kept as a fraction. Only the sign
//! and ratios of ROC values feed the classifiers.
//! If C[i-n] == 0 the point is invalid.
//! Warmup: first n bars invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_roc(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let base = if i >= period && period > 0 {
            Some(bars[i - period].close)
        } else {
            None
        };

        let (valid, value) = match base {
            Some(prev) if prev != 0.0 => (true, (bar.close - prev) / prev),
            _ => (false, 0.0),
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(value),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                code: "TEST".into(),
                exchange: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn roc_warmup() {
        let series = calculate_roc(&make_bars(&[100.0, 105.0, 110.0, 115.0]), 3);
        assert!(!series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn roc_is_fractional() {
        let series = calculate_roc(&make_bars(&[100.0, 105.0, 110.0]), 2);
        assert_abs_diff_eq!(series.last_simple().unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn roc_negative_change() {
        let series = calculate_roc(&make_bars(&[100.0, 90.0, 80.0]), 2);
        assert_abs_diff_eq!(series.last_simple().unwrap(), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn roc_zero_base_is_unavailable() {
        let series = calculate_roc(&make_bars(&[0.0, 100.0, 110.0]), 2);
        assert_eq!(series.last_simple(), None);
    }
}
