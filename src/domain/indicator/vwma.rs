//! Volume-Weighted Moving Average indicator.
//!
//! VWMA(n) = sum(C * V) / sum(V) over the last n bars, maintained with
//! running sums. A window with zero total volume has no value.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 70;

pub fn calculate_vwma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Vwma(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut weighted_sum = 0.0;
    let mut volume_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        weighted_sum += bar.close * bar.volume as f64;
        volume_sum += bar.volume as f64;
        if i >= period {
            let old = &bars[i - period];
            weighted_sum -= old.close * old.volume as f64;
            volume_sum -= old.volume as f64;
        }

        let valid = i + 1 >= period && volume_sum > 0.0;
        let vwma = if valid { weighted_sum / volume_sum } else { 0.0 };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(vwma),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Vwma(period),
        values,
    }
}
