//! Bollinger lower-band breakout after an oversold money-flow reading.

use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::indicator::Bands;
use crate::domain::ohlcv::PriceBar;

/// MFI must previously have been below this level.
pub const OVERSOLD_MFI: f64 = 16.0;

/// True when price crosses back above the lower band while money flow
/// recovers from an oversold reading.
///
/// The previous band is recomputed on `bars` minus the last bar. If that
/// window is too short, the previous close is compared to the current lower
/// band instead.
pub fn detect_bband_breakout(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
    current: Option<Bands>,
    mfi: Option<f64>,
    mfi_previous: Option<f64>,
) -> bool {
    let (Some(mfi), Some(mfi_previous), Some(current)) = (mfi, mfi_previous, current) else {
        return false;
    };
    if !(mfi_previous < OVERSOLD_MFI && mfi > mfi_previous) || bars.len() < 2 {
        return false;
    }

    let last = bars.len() - 1;
    let previous_close = bars[last - 1].close;
    let current_close = bars[last].close;
    let previous_lower = calculate_bollinger(&bars[..last], period, stddev_mult_x100)
        .last_bands()
        .map_or(current.lower, |b| b.lower);

    previous_close < previous_lower && current_close > current.lower
}
