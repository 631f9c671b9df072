//! Stateful detectors folded over the processed snapshot series.
//!
//! Each detector takes `snapshots[..=i]` and replays it from the start, so the
//! opinion at bar `i` never depends on bars after it.

use crate::domain::indicator::Bands;
use crate::domain::pipeline::IndicatorSnapshot;
use crate::domain::signal::{classify_mfi, classify_mfi_low, percent_change, Signal};

pub const MEAN_REVERSION_BAND: f64 = 0.10;
pub const MEAN_REVERSION_BAND_WIDE: f64 = 0.15;
pub const CLOSE_STREAK: usize = 3;

/// Flipped MFI, Bollinger mean reversion and price-vs-MFI extremes, fused
/// by unanimity.
pub fn mfi_divergence(series: &[IndicatorSnapshot]) -> Signal {
    let Some(last) = series.last() else {
        return Signal::Neutral;
    };
    Signal::unanimous(
        flipped_mfi(series),
        mean_reversion(last.close(), last.bband, MEAN_REVERSION_BAND),
        extreme_tracking(series),
    )
}

/// MFI baseline, wide mean reversion and close streaks, fused by unanimity.
/// The baseline only ever reads Bullish, so neither does this detector read
/// Bearish.
pub fn mfi_divergence2(series: &[IndicatorSnapshot]) -> Signal {
    let Some(last) = series.last() else {
        return Signal::Neutral;
    };
    Signal::unanimous(
        mfi_baseline(last),
        mean_reversion(last.close(), last.bband, MEAN_REVERSION_BAND_WIDE),
        close_streak(series),
    )
}

/// Follow-through after the last MFI extreme: higher lows under an oversold
/// anchor, lower highs under an overbought one.
pub fn mfi_trade(series: &[IndicatorSnapshot]) -> Signal {
    series
        .iter()
        .fold(TradeState::default(), |mut state, s| {
            state.update(s);
            state
        })
        .opinion
}

fn flipped_mfi(series: &[IndicatorSnapshot]) -> Signal {
    series
        .iter()
        .rev()
        .map(|s| classify_mfi(s.mfi))
        .find(|signal| *signal != Signal::Neutral)
        .map_or(Signal::Neutral, Signal::flip)
}

fn mean_reversion(close: f64, bands: Option<Bands>, band: f64) -> Signal {
    let Some(bands) = bands else {
        return Signal::Neutral;
    };
    match percent_change(bands.middle, close) {
        Some(pct) if pct.abs() < band && close > bands.middle => Signal::Bullish,
        Some(pct) if pct.abs() < band && close < bands.middle => Signal::Bearish,
        _ => Signal::Neutral,
    }
}

fn mfi_baseline(snapshot: &IndicatorSnapshot) -> Signal {
    classify_mfi_low(snapshot.mfi, snapshot.mfi_low)
}

#[derive(Debug, Clone, Copy)]
struct Extremes {
    high_close: f64,
    high_mfi: f64,
    low_close: f64,
    low_mfi: f64,
}

fn extreme_tracking(series: &[IndicatorSnapshot]) -> Signal {
    let mut extremes: Option<Extremes> = None;
    let mut opinion = Signal::Neutral;

    for s in series {
        let Some(mfi) = s.mfi else {
            continue;
        };
        let close = s.close();
        let e = extremes.get_or_insert(Extremes {
            high_close: close,
            high_mfi: mfi,
            low_close: close,
            low_mfi: mfi,
        });

        if close > e.high_close {
            opinion = if mfi > e.high_mfi {
                Signal::Bullish
            } else {
                Signal::Bearish
            };
            e.high_close = close;
            e.high_mfi = e.high_mfi.max(mfi);
        } else if close < e.low_close {
            opinion = if mfi > e.low_mfi {
                Signal::Bullish
            } else {
                Signal::Bearish
            };
            e.low_close = close;
            e.low_mfi = e.low_mfi.min(mfi);
        }
    }
    opinion
}

fn close_streak(series: &[IndicatorSnapshot]) -> Signal {
    let (up, down) = series.windows(2).fold((0usize, 0usize), |(up, down), w| {
        if w[1].close() > w[0].close() {
            (up + 1, 0)
        } else if w[1].close() < w[0].close() {
            (0, down + 1)
        } else {
            (0, 0)
        }
    });
    if up >= CLOSE_STREAK {
        Signal::Bullish
    } else if down >= CLOSE_STREAK {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TradeState {
    anchor: Signal,
    highest_low: f64,
    lowest_high: f64,
    opinion: Signal,
}

impl TradeState {
    fn update(&mut self, s: &IndicatorSnapshot) {
        let signal = classify_mfi(s.mfi);
        if signal != Signal::Neutral && signal != self.anchor {
            self.anchor = signal;
            self.highest_low = s.bar.low;
            self.lowest_high = s.bar.high;
            self.opinion = Signal::Neutral;
            return;
        }

        match self.anchor {
            Signal::Bullish if s.bar.low > self.highest_low => {
                self.highest_low = s.bar.low;
                self.opinion = Signal::Bullish;
            }
            Signal::Bullish if s.bar.low < self.highest_low => self.opinion = Signal::Neutral,
            Signal::Bearish if s.bar.high < self.lowest_high => {
                self.lowest_high = s.bar.high;
                self.opinion = Signal::Bearish;
            }
            Signal::Bearish if s.bar.high > self.lowest_high => self.opinion = Signal::Neutral,
            _ => {}
        }
    }
}
