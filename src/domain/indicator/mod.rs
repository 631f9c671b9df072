//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every calculator takes the full bar slice and returns one point per bar,
//! flagging warmup points as invalid. The snapshot pipeline reads the last
//! valid point through [`IndicatorSeries::last_simple`] and friends.

pub mod sma;
pub mod ema;
pub mod bollinger;
pub mod roc;
pub mod vwma;
pub mod macd;
pub mod rsi;
pub mod obv;
pub mod mfi;
pub mod demark;

pub use ema::calculate_ema;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Roc(usize),
    Vwma(usize),
    Rsi(usize),
    Mfi(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    DeMark9,
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

/// Bollinger band triple at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// MACD components at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl IndicatorSeries {
    pub fn empty(indicator_type: IndicatorType) -> Self {
        IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// The final point, if it is past warmup.
    pub fn last_valid(&self) -> Option<&IndicatorPoint> {
        self.values.last().filter(|p| p.valid)
    }

    pub fn last_simple(&self) -> Option<f64> {
        self.simple_at_offset(0)
    }

    pub fn last_bands(&self) -> Option<Bands> {
        match self.last_valid()?.value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } if upper.is_finite() && middle.is_finite() && lower.is_finite() => Some(Bands {
                upper,
                middle,
                lower,
            }),
            _ => None,
        }
    }

    /// Valid point `offset` bars before the last one (0 = last).
    pub fn point_at_offset(&self, offset: usize) -> Option<&IndicatorPoint> {
        let idx = self.values.len().checked_sub(1 + offset)?;
        Some(&self.values[idx]).filter(|p| p.valid)
    }

    pub fn simple_at_offset(&self, offset: usize) -> Option<f64> {
        match self.point_at_offset(offset)?.value {
            IndicatorValue::Simple(v) if v.is_finite() => Some(v),
            _ => None,
        }
    }

    pub fn macd_at_offset(&self, offset: usize) -> Option<MacdPoint> {
        match self.point_at_offset(offset)?.value {
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } if histogram.is_finite() => Some(MacdPoint {
                line,
                signal,
                histogram,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Vwma(period) => write!(f, "VWMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::DeMark9 => write!(f, "DEMARK9"),
        }
    }
}
