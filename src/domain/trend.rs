//! MFI-led trend state carried across bars.

use crate::domain::pipeline::IndicatorSnapshot;
use crate::domain::signal::{classify_bband, classify_macd, classify_mfi, Signal};

/// Bars below this index never update the trend.
pub const WARMUP_INDEX: usize = 80;
/// A marker this recent keeps the tracker alive.
pub const RECENT_BARS: usize = 5;
pub const MACD_CONFIRM_BARS: usize = 3;
pub const WIDE_CONFIRM_MIN: usize = 6;
pub const WIDE_CONFIRM_MAX: usize = 33;
pub const CLUSTER_BARS: usize = 6;

/// Bar index at which each event last fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendMarkers {
    pub mfi_low: Option<usize>,
    pub mfi_high: Option<usize>,
    pub macd_buy: Option<usize>,
    pub macd_sell: Option<usize>,
    pub bband_buy: Option<usize>,
}

impl TrendMarkers {
    fn all(&self) -> [Option<usize>; 5] {
        [
            self.mfi_low,
            self.mfi_high,
            self.macd_buy,
            self.macd_sell,
            self.bband_buy,
        ]
    }
}

fn age(marker: Option<usize>, index: usize) -> Option<usize> {
    marker.and_then(|m| index.checked_sub(m))
}

fn within(marker: Option<usize>, index: usize, bars: usize) -> bool {
    age(marker, index).is_some_and(|a| a <= bars)
}

#[derive(Debug, Clone, Default)]
pub struct TrendTracker {
    pub markers: TrendMarkers,
    pub trend: Option<bool>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance over one snapshot and return the trend after it.
    pub fn step(&mut self, snapshot: &IndicatorSnapshot) -> Option<bool> {
        let i = snapshot.index;
        match classify_mfi(snapshot.mfi) {
            Signal::Bullish => self.markers.mfi_low = Some(i),
            Signal::Bearish => self.markers.mfi_high = Some(i),
            Signal::Neutral => {}
        }
        let macd = classify_macd(snapshot.macd, snapshot.macd_previous);
        let m = &mut self.markers;

        if !m.all().iter().any(|&marker| within(marker, i, RECENT_BARS)) {
            self.trend = None;
        } else if within(m.mfi_low, i, RECENT_BARS)
            && (macd.is_bullish() || within(m.macd_buy, i, MACD_CONFIRM_BARS))
        {
            self.trend = Some(true);
        } else if within(m.mfi_high, i, RECENT_BARS)
            && (macd.is_bearish() || within(m.macd_sell, i, MACD_CONFIRM_BARS))
        {
            self.trend = Some(false);
        } else if macd.is_bullish() {
            m.macd_buy = Some(i);
        } else if macd.is_bearish() {
            m.macd_sell = Some(i);
        } else if classify_bband(snapshot.close(), snapshot.bband).is_bullish() {
            m.bband_buy = Some(i);
        } else if wide_confirmation(m, i) || clustered(m) {
            self.trend = Some(true);
        }
        self.trend
    }
}

fn wide_confirmation(m: &TrendMarkers, index: usize) -> bool {
    let Some(low) = m.mfi_low else {
        return false;
    };
    let aged = age(m.mfi_low, index)
        .is_some_and(|a| (WIDE_CONFIRM_MIN..=WIDE_CONFIRM_MAX).contains(&a));
    aged && (m.bband_buy.is_some_and(|b| b >= low) || m.macd_buy.is_some_and(|b| b >= low))
}

fn clustered(m: &TrendMarkers) -> bool {
    let (Some(a), Some(b), Some(c)) = (m.mfi_low, m.bband_buy, m.macd_buy) else {
        return false;
    };
    a.abs_diff(b) <= CLUSTER_BARS && a.abs_diff(c) <= CLUSTER_BARS && b.abs_diff(c) <= CLUSTER_BARS
}

/// Run a fresh tracker over `snapshots`, writing each bar's trend.
pub fn track_trend(snapshots: &mut [IndicatorSnapshot]) {
    let mut tracker = TrendTracker::new();
    for snapshot in snapshots.iter_mut() {
        if snapshot.index < WARMUP_INDEX {
            continue;
        }
        snapshot.mfi_trend = tracker.step(snapshot);
    }
}
