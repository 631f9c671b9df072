//! Indicator pipeline: one [`IndicatorSnapshot`] per evaluable bar.
//!
//! Each snapshot is computed from a trailing window ending at its bar, so
//! snapshots are independent of each other and are built in parallel. The
//! trend tracker and aggregator fill in `mfi_trend` and `recommendation`
//! afterwards.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{FuseError, IndicatorDegraded};
use crate::domain::indicator::bollinger;
use crate::domain::indicator::demark::{calculate_demark9, DeMark9};
use crate::domain::indicator::macd::{calculate_macd_default, previous_cross_point};
use crate::domain::indicator::mfi::{self, calculate_mfi};
use crate::domain::indicator::obv::{self, calculate_shifted_obv};
use crate::domain::indicator::roc::calculate_roc;
use crate::domain::indicator::rsi::{self, calculate_rsi};
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::vwma::{self, calculate_vwma};
use crate::domain::indicator::{Bands, IndicatorType, MacdPoint};
use crate::domain::ohlcv::{validate_bars, PriceBar};
use crate::domain::pattern::breakout::detect_bband_breakout;
use crate::domain::pattern::flag_pennant::{detect_flag_pennant, FlagPennant, FlagPennantConfig};
use crate::domain::pattern::support_resistance::{find_levels, SupportResistanceConfig};
use crate::domain::recommendation::Recommendation;
use crate::domain::signal::RocInputs;

pub const ROC_SHORT: usize = 24;
pub const ROC_LONG: usize = 70;
pub const SMA_SHORT: usize = 10;
pub const SMA_LONG: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BarInterval {
    #[default]
    Daily,
    Intraday,
}

impl BarInterval {
    pub fn min_quotes(self) -> usize {
        match self {
            BarInterval::Daily => 79,
            BarInterval::Intraday => 80,
        }
    }

    /// Bars needed before the first snapshot: `min_quotes + 1`.
    pub fn required_bars(self) -> usize {
        self.min_quotes() + 1
    }
}

impl FromStr for BarInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(BarInterval::Daily),
            "intraday" => Ok(BarInterval::Intraday),
            other => Err(format!("unknown interval '{}'", other)),
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarInterval::Daily => write!(f, "daily"),
            BarInterval::Intraday => write!(f, "intraday"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub interval: BarInterval,
    pub levels: SupportResistanceConfig,
    pub flag: FlagPennantConfig,
}

impl PipelineConfig {
    /// Trailing bars handed to each snapshot: one more than the minimum so
    /// the breakout check can recompute the previous bar's bands.
    pub fn window_bars(&self) -> usize {
        self.interval.required_bars() + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    /// Position of `bar` in the full series.
    pub index: usize,
    pub bar: PriceBar,
    pub bband: Option<Bands>,
    pub sma10: Option<f64>,
    pub sma50: Option<f64>,
    pub roc10: Option<f64>,
    pub roc10_previous: Option<f64>,
    pub roc70: Option<f64>,
    pub roc70_previous: Option<f64>,
    pub vwma: Option<f64>,
    pub macd: Option<MacdPoint>,
    pub macd_previous: Option<MacdPoint>,
    pub rsi: Option<f64>,
    pub obv: Option<f64>,
    pub demark9: Option<DeMark9>,
    pub mfi: Option<f64>,
    pub mfi_previous: Option<f64>,
    pub mfi_low: Option<f64>,
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub bband_breakout: bool,
    pub flag_pennant: FlagPennant,
    pub mfi_trend: Option<bool>,
    pub recommendation: Option<Recommendation>,
    pub degraded: Vec<IndicatorDegraded>,
}

impl IndicatorSnapshot {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn roc_inputs(&self) -> RocInputs {
        RocInputs {
            roc10: self.roc10,
            roc10_previous: self.roc10_previous,
            roc70: self.roc70,
            roc70_previous: self.roc70_previous,
            mfi: self.mfi,
            mfi_previous: self.mfi_previous,
        }
    }
}

/// Build the snapshot for the last bar of `window`.
///
/// `index` is the bar's position in the full series. The window must hold at
/// least `config.interval.required_bars()` bars.
pub fn compute_snapshot(
    window: &[PriceBar],
    index: usize,
    config: &PipelineConfig,
) -> Result<IndicatorSnapshot, FuseError> {
    validate_bars(window)?;
    build_snapshot(window, index, config)
}

/// Snapshots for every bar from `required_bars() - 1` onward, in bar order.
pub fn compute_snapshots(
    bars: &[PriceBar],
    config: &PipelineConfig,
) -> Result<Vec<IndicatorSnapshot>, FuseError> {
    let required = config.interval.required_bars();
    if bars.len() < required {
        return Err(FuseError::InsufficientHistory {
            bars: bars.len(),
            minimum: required,
        });
    }
    validate_bars(bars)?;

    let window = config.window_bars();
    let snapshots = (required - 1..bars.len())
        .into_par_iter()
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            build_snapshot(&bars[start..=i], i, config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let degraded: usize = snapshots.iter().map(|s| s.degraded.len()).sum();
    if degraded > 0 {
        log::debug!(
            "pipeline: {} snapshots, {} degraded indicator readings",
            snapshots.len(),
            degraded
        );
    }
    Ok(snapshots)
}

fn build_snapshot(
    window: &[PriceBar],
    index: usize,
    config: &PipelineConfig,
) -> Result<IndicatorSnapshot, FuseError> {
    let required = config.interval.required_bars();
    let Some(bar) = window.last() else {
        return Err(FuseError::InsufficientHistory {
            bars: 0,
            minimum: required,
        });
    };
    if window.len() < required {
        return Err(FuseError::InsufficientHistory {
            bars: window.len(),
            minimum: required,
        });
    }

    let mut degraded = Degradations::new(bar.date);

    let shifted = &window[..window.len() - 1];

    let bband_series = bollinger::calculate_bollinger_default(window);
    let bband_type = bband_series.indicator_type;
    let bband = degraded.check(bband_series.last_bands(), bband_type);

    let sma10 = degraded.check(
        calculate_sma(window, SMA_SHORT).last_simple(),
        IndicatorType::Sma(SMA_SHORT),
    );
    let sma50 = degraded.check(
        calculate_sma(window, SMA_LONG).last_simple(),
        IndicatorType::Sma(SMA_LONG),
    );

    let roc10 = degraded.check(
        calculate_roc(window, ROC_SHORT).last_simple(),
        IndicatorType::Roc(ROC_SHORT),
    );
    let roc10_previous = degraded.check(
        calculate_roc(shifted, ROC_SHORT).last_simple(),
        IndicatorType::Roc(ROC_SHORT),
    );
    let roc70 = degraded.check(
        calculate_roc(window, ROC_LONG).last_simple(),
        IndicatorType::Roc(ROC_LONG),
    );
    let roc70_previous = degraded.check(
        calculate_roc(shifted, ROC_LONG).last_simple(),
        IndicatorType::Roc(ROC_LONG),
    );

    let vwma = degraded.check(
        calculate_vwma(window, vwma::DEFAULT_PERIOD).last_simple(),
        IndicatorType::Vwma(vwma::DEFAULT_PERIOD),
    );

    let macd_series = calculate_macd_default(window);
    let macd_type = macd_series.indicator_type;
    let macd = degraded.check(macd_series.macd_at_offset(0), macd_type);
    let macd_previous = degraded.check(previous_cross_point(&macd_series), macd_type);

    let rsi = degraded.check(
        calculate_rsi(window, rsi::DEFAULT_PERIOD).last_simple(),
        IndicatorType::Rsi(rsi::DEFAULT_PERIOD),
    );
    let obv = degraded.check(
        calculate_shifted_obv(window, obv::DEFAULT_WINDOW).last_simple(),
        IndicatorType::Obv,
    );

    let mfi_series = calculate_mfi(window, mfi::DEFAULT_PERIOD);
    let mfi_type = IndicatorType::Mfi(mfi::DEFAULT_PERIOD);
    let mfi = degraded.check(mfi_series.last_simple(), mfi_type);
    let mfi_previous =
        degraded.check(mfi_series.simple_at_offset(mfi::DEFAULT_PERIOD), mfi_type);
    let mfi_low = degraded.check(
        calculate_mfi(window, mfi::LOW_PERIOD).last_simple(),
        IndicatorType::Mfi(mfi::LOW_PERIOD),
    );

    let demark9 = degraded.check(calculate_demark9(window), IndicatorType::DeMark9);

    let levels = find_levels(window, &config.levels);
    let bband_breakout = detect_bband_breakout(
        window,
        bollinger::DEFAULT_PERIOD,
        bollinger::DEFAULT_MULT_X100,
        bband,
        mfi,
        mfi_previous,
    );
    let flag_pennant = detect_flag_pennant(window, &config.flag);

    Ok(IndicatorSnapshot {
        index,
        bar: bar.clone(),
        bband,
        sma10,
        sma50,
        roc10,
        roc10_previous,
        roc70,
        roc70_previous,
        vwma,
        macd,
        macd_previous,
        rsi,
        obv,
        demark9,
        mfi,
        mfi_previous,
        mfi_low,
        support: levels.support,
        resistance: levels.resistance,
        bband_breakout,
        flag_pennant,
        mfi_trend: None,
        recommendation: None,
        degraded: degraded.items,
    })
}

struct Degradations {
    date: NaiveDate,
    items: Vec<IndicatorDegraded>,
}

impl Degradations {
    fn new(date: NaiveDate) -> Self {
        Degradations {
            date,
            items: Vec::new(),
        }
    }

    fn check<T>(&mut self, value: Option<T>, indicator: IndicatorType) -> Option<T> {
        if value.is_none() {
            log::debug!("{} unavailable on {}", indicator, self.date);
            self.items.push(IndicatorDegraded {
                indicator,
                date: self.date,
            });
        }
        value
    }
}

/// Snapshot with every indicator missing, for classifier-level tests.
#[cfg(test)]
pub(crate) fn bare_snapshot(index: usize, close: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        index,
        bar: PriceBar {
            code: "TEST".into(),
            exchange: "ASX".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
                + chrono::Duration::days(index as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        },
        bband: None,
        sma10: None,
        sma50: None,
        roc10: None,
        roc10_previous: None,
        roc70: None,
        roc70_previous: None,
        vwma: None,
        macd: None,
        macd_previous: None,
        rsi: None,
        obv: None,
        demark9: None,
        mfi: None,
        mfi_previous: None,
        mfi_low: None,
        support: Vec::new(),
        resistance: Vec::new(),
        bband_breakout: false,
        flag_pennant: FlagPennant::default(),
        mfi_trend: None,
        recommendation: None,
        degraded: Vec::new(),
    }
}
