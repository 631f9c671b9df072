//! Standalone numeric pattern detectors: swing-point support/resistance,
//! flag/pennant trendline fitting, and the Bollinger breakout check.

pub mod support_resistance;
pub mod flag_pennant;
pub mod breakout;
