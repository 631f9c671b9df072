//! Ternary signals and the stateless classifiers that produce them.
//!
//! Every classifier is total: missing inputs degrade to `Neutral`.
//! Ratios are rounded to four decimal places before they meet a threshold.

use std::fmt;

use crate::domain::indicator::demark::DeMark9;
use crate::domain::indicator::{Bands, MacdPoint};
use crate::domain::ohlcv::PriceBar;
use crate::domain::pattern::flag_pennant::FlagPennant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Signal {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Signal {
    pub fn flip(self) -> Signal {
        match self {
            Signal::Bullish => Signal::Bearish,
            Signal::Bearish => Signal::Bullish,
            Signal::Neutral => Signal::Neutral,
        }
    }

    pub fn is_bullish(self) -> bool {
        self == Signal::Bullish
    }

    pub fn is_bearish(self) -> bool {
        self == Signal::Bearish
    }

    /// -1 / 0 / 1 encoding for feature vectors.
    pub fn as_feature(self) -> f64 {
        match self {
            Signal::Bullish => 1.0,
            Signal::Bearish => -1.0,
            Signal::Neutral => 0.0,
        }
    }

    /// Bullish when all three agree Bullish, Bearish when all agree Bearish.
    pub fn unanimous(a: Signal, b: Signal, c: Signal) -> Signal {
        if a == b && b == c { a } else { Signal::Neutral }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bullish => write!(f, "BULLISH"),
            Signal::Bearish => write!(f, "BEARISH"),
            Signal::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

pub const MFI_OVERSOLD: f64 = 23.0;
pub const MFI_OVERBOUGHT: f64 = 75.0;
pub const ROC_MOMENTUM_MFI_CEILING: f64 = 65.0;
pub const ROC_CROSSOVER_MFI_HIGH: f64 = 78.0;
pub const PROXIMITY: f64 = 0.03;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `(to - from) / from` rounded to four places; `None` when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 || !from.is_finite() || !to.is_finite() {
        return None;
    }
    Some(round_to((to - from) / from, 4))
}

pub fn classify_mfi(mfi: Option<f64>) -> Signal {
    match mfi {
        Some(v) if v < MFI_OVERSOLD => Signal::Bullish,
        Some(v) if v > MFI_OVERBOUGHT => Signal::Bearish,
        _ => Signal::Neutral,
    }
}

/// Ratio of the larger to the smaller of the two ROC values, by magnitude.
/// Its sign is positive when both rates point the same way.
fn roc_ratio(roc_short: f64, roc_long: f64) -> Option<f64> {
    let (larger, smaller) = if roc_short.abs() >= roc_long.abs() {
        (roc_short, roc_long)
    } else {
        (roc_long, roc_short)
    };
    if smaller == 0.0 {
        return None;
    }
    Some(round_to(larger / smaller, 4))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RocInputs {
    pub roc10: Option<f64>,
    pub roc10_previous: Option<f64>,
    pub roc70: Option<f64>,
    pub roc70_previous: Option<f64>,
    pub mfi: Option<f64>,
    pub mfi_previous: Option<f64>,
}

pub fn classify_roc_momentum(inputs: &RocInputs) -> Signal {
    let (Some(r10), Some(r10p), Some(r70), Some(r70p), Some(mfi), Some(mfi_prev)) = (
        inputs.roc10,
        inputs.roc10_previous,
        inputs.roc70,
        inputs.roc70_previous,
        inputs.mfi,
        inputs.mfi_previous,
    ) else {
        return Signal::Neutral;
    };
    let (Some(now), Some(before)) = (roc_ratio(r10, r70), roc_ratio(r10p, r70p)) else {
        return Signal::Neutral;
    };

    if before > 0.0 && now <= 0.0 && mfi_prev > mfi {
        Signal::Bearish
    } else if before <= 0.0 && now > 0.0 && mfi < ROC_MOMENTUM_MFI_CEILING && mfi > mfi_prev {
        Signal::Bullish
    } else {
        Signal::Neutral
    }
}

pub fn classify_roc_crossover(inputs: &RocInputs) -> Signal {
    let (Some(now), Some(before), Some(mfi)) = (inputs.roc70, inputs.roc70_previous, inputs.mfi)
    else {
        return Signal::Neutral;
    };
    if before > 0.0 && now <= 0.0 && mfi > ROC_CROSSOVER_MFI_HIGH {
        Signal::Bearish
    } else if before <= 0.0 && now > 0.0 && mfi < MFI_OVERSOLD {
        Signal::Bullish
    } else {
        Signal::Neutral
    }
}

/// Momentum rule first; the plain ROC(70) crossover fills in when it is silent.
pub fn classify_roc(inputs: &RocInputs) -> Signal {
    match classify_roc_momentum(inputs) {
        Signal::Neutral => classify_roc_crossover(inputs),
        signal => signal,
    }
}

pub fn classify_bband(close: f64, bands: Option<Bands>) -> Signal {
    match bands {
        Some(b) if close <= b.lower => Signal::Bullish,
        Some(b) if close >= b.upper => Signal::Bearish,
        _ => Signal::Neutral,
    }
}

pub fn classify_vwma(close: f64, vwma: Option<f64>) -> Signal {
    let Some(vwma) = vwma else {
        return Signal::Neutral;
    };
    match percent_change(close, vwma) {
        Some(pct) if pct.abs() < PROXIMITY => {
            if close < vwma {
                Signal::Bullish
            } else {
                Signal::Bearish
            }
        }
        _ => Signal::Neutral,
    }
}

pub fn classify_macd(current: Option<MacdPoint>, previous: Option<MacdPoint>) -> Signal {
    let (Some(new), Some(old)) = (current, previous) else {
        return Signal::Neutral;
    };
    if new.histogram > 0.0 && old.histogram <= 0.0 {
        Signal::Bullish
    } else if new.histogram <= 0.0 && old.histogram > 0.0 {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

pub fn classify_demark(demark: Option<DeMark9>) -> Signal {
    match demark {
        Some(d) if d.perfect_sell => Signal::Bearish,
        Some(d) if d.perfect_buy => Signal::Bullish,
        _ => Signal::Neutral,
    }
}

/// Short MFI sitting on its long baseline. There is no bearish reading.
pub fn classify_mfi_low(mfi: Option<f64>, mfi_low: Option<f64>) -> Signal {
    let (Some(mfi), Some(low)) = (mfi, mfi_low) else {
        return Signal::Neutral;
    };
    match percent_change(mfi, low) {
        Some(pct) if pct.abs() < PROXIMITY => Signal::Bullish,
        _ => Signal::Neutral,
    }
}

fn straddles(bar: &PriceBar, level: f64) -> bool {
    bar.low <= level && level <= bar.high
}

pub fn classify_support(bar: &PriceBar, support: &[f64]) -> Signal {
    if support
        .iter()
        .any(|&level| straddles(bar, level) && bar.close < level)
    {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

pub fn classify_resistance(bar: &PriceBar, resistance: &[f64]) -> Signal {
    if resistance
        .iter()
        .any(|&level| straddles(bar, level) && bar.close > level)
    {
        Signal::Bullish
    } else {
        Signal::Neutral
    }
}

pub fn classify_flag_pennant(pattern: &FlagPennant) -> Signal {
    if pattern.steep_trend && pattern.formation && pattern.breakout {
        Signal::Bullish
    } else {
        Signal::Neutral
    }
}

/// Bullish-only, like the MFI-low rule.
pub fn classify_bband_breakout(breakout: bool) -> Signal {
    if breakout { Signal::Bullish } else { Signal::Neutral }
}

pub fn classify_trend(mfi_trend: Option<bool>) -> Signal {
    match mfi_trend {
        Some(true) => Signal::Bullish,
        Some(false) => Signal::Bearish,
        None => Signal::Neutral,
    }
}
