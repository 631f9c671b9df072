//! MFI (Money Flow Index) indicator.
//!
//! Raw money flow = typical price × volume. A bar's flow is positive when its
//! typical price rose from the previous bar, negative when it fell, ignored
//! when unchanged.
//!
//! MFI = 100 - 100 / (1 + positive_flow / negative_flow) over n changes.
//! 100 when only positive flow exists, 50 when there is no flow at all.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;
/// Long MFI used as the "low" baseline.
pub const LOW_PERIOD: usize = 75;

pub fn calculate_mfi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Mfi(period));
    }

    let flows: Vec<(f64, f64)> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                return (0.0, 0.0);
            }
            let tp = bar.typical_price();
            let prev_tp = bars[i - 1].typical_price();
            let raw = tp * bar.volume as f64;
            if tp > prev_tp {
                (raw, 0.0)
            } else if tp < prev_tp {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i < period {
                return IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                };
            }
            let (positive, negative) = flows[i + 1 - period..=i]
                .iter()
                .fold((0.0, 0.0), |(p, n), (fp, fn_)| (p + fp, n + fn_));
            IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(money_flow_index(positive, negative)),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Mfi(period),
        values,
    }
}

fn money_flow_index(positive: f64, negative: f64) -> f64 {
    if negative == 0.0 {
        if positive == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + positive / negative)
    }
}
