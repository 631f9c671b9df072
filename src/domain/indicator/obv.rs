//! OBV (On-Balance Volume) indicator.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

/// Bars in the OBV window the snapshot pipeline reads.
pub const DEFAULT_WINDOW: usize = 14;

/// Calculate OBV (On-Balance Volume) over the given bars.
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; all bars are valid. The result depends on where the
/// slice starts, so callers choose the window deliberately.
pub fn calculate_obv(bars: &[PriceBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            obv = bar.volume as f64;
        } else if bar.close > bars[i - 1].close {
            obv += bar.volume as f64;
        } else if bar.close < bars[i - 1].close {
            obv -= bar.volume as f64;
        }

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(obv),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}

/// OBV over a `window`-bar slice that ends one bar before the last bar.
pub fn calculate_shifted_obv(bars: &[PriceBar], window: usize) -> IndicatorSeries {
    if window == 0 || bars.len() < window + 1 {
        return IndicatorSeries::empty(IndicatorType::Obv);
    }
    let end = bars.len() - 1;
    calculate_obv(&bars[end - window..end])
}
