//! DeMark-9 perfected setup detection.
//!
//! Looks at the last 13 bars. Bars 0-8 must show nine strictly monotonic
//! closes; bars 10-12 must each confirm exhaustion against the bar before
//! (starting from bar 9):
//! - perfect sell: rising closes, then three bars of lower high, lower low
//!   and lower close
//! - perfect buy: falling closes, then three bars of higher high, higher low
//!   and higher close

use crate::domain::ohlcv::PriceBar;

pub const SETUP_BARS: usize = 9;
pub const CONFIRM_BARS: usize = 3;
/// Bars consumed by one evaluation.
pub const WINDOW: usize = SETUP_BARS + 1 + CONFIRM_BARS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeMark9 {
    pub perfect_buy: bool,
    pub perfect_sell: bool,
}

/// Evaluate the setup on the trailing window; `None` when fewer than
/// [`WINDOW`] bars are available.
pub fn calculate_demark9(bars: &[PriceBar]) -> Option<DeMark9> {
    if bars.len() < WINDOW {
        return None;
    }
    let window = &bars[bars.len() - WINDOW..];
    let (setup, confirm) = window.split_at(SETUP_BARS);

    let rising = setup.windows(2).all(|w| w[1].close > w[0].close);
    let falling = setup.windows(2).all(|w| w[1].close < w[0].close);

    let weakening = confirm
        .windows(2)
        .all(|w| w[1].high < w[0].high && w[1].low < w[0].low && w[1].close < w[0].close);
    let strengthening = confirm
        .windows(2)
        .all(|w| w[1].high > w[0].high && w[1].low > w[0].low && w[1].close > w[0].close);

    Some(DeMark9 {
        perfect_buy: falling && strengthening,
        perfect_sell: rising && weakening,
    })
}
