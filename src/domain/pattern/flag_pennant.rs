//! Flag/pennant continuation pattern.
//!
//! The trailing window is split into three consecutive parts:
//!
//! ```text
//! | trend_period bars | formation_period bars | breakout bar |
//! ```
//!
//! The pattern needs a steep preceding rise, a formation whose high and low
//! trendlines run roughly parallel or converge, and a breakout close above
//! the projected upper trendline. Checks run in that order and stop at the
//! first failure.

use crate::domain::ohlcv::PriceBar;

/// Formations shorter than this are never confirmed.
pub const MIN_FORMATION_PERIOD: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct FlagPennantConfig {
    pub formation_period: usize,
    pub trend_period: usize,
    pub convergence_threshold: f64,
    pub steepness_threshold: f64,
}

impl Default for FlagPennantConfig {
    fn default() -> Self {
        FlagPennantConfig {
            formation_period: 15,
            trend_period: 20,
            convergence_threshold: 0.1,
            steepness_threshold: 0.5,
        }
    }
}

impl FlagPennantConfig {
    pub fn required_bars(&self) -> usize {
        self.trend_period + self.formation_period + 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagPennant {
    pub steep_trend: bool,
    pub formation: bool,
    pub breakout: bool,
    pub measured_rule_target_met: bool,
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
}

impl Trendline {
    pub fn project(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `(i, values[i])`. `None` for fewer than two points.
pub fn linear_regression(values: &[f64]) -> Option<Trendline> {
    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if values.len() < 2 || denominator == 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(Trendline { slope, intercept })
}

/// Upper and lower trendlines when their slopes agree within `threshold`.
pub fn confirm_formation(
    highs: &[f64],
    lows: &[f64],
    threshold: f64,
) -> Option<(Trendline, Trendline)> {
    if highs.len() < MIN_FORMATION_PERIOD || lows.len() < MIN_FORMATION_PERIOD {
        return None;
    }
    let upper = linear_regression(highs)?;
    let lower = linear_regression(lows)?;
    ((upper.slope - lower.slope).abs() <= threshold).then_some((upper, lower))
}

/// Mean bar-over-bar close change across `bars`.
pub fn mean_close_delta(bars: &[PriceBar]) -> Option<f64> {
    if bars.len() < 2 {
        return None;
    }
    let total: f64 = bars.windows(2).map(|w| w[1].close - w[0].close).sum();
    Some(total / (bars.len() - 1) as f64)
}

pub fn detect_flag_pennant(bars: &[PriceBar], config: &FlagPennantConfig) -> FlagPennant {
    let mut result = FlagPennant::default();
    if bars.len() < config.required_bars() {
        return result;
    }

    let breakout_idx = bars.len() - 1;
    let formation_start = breakout_idx - config.formation_period;
    let trend_start = formation_start - config.trend_period;

    result.steep_trend = mean_close_delta(&bars[trend_start..formation_start])
        .is_some_and(|delta| delta >= config.steepness_threshold);
    if !result.steep_trend {
        return result;
    }

    let formation = &bars[formation_start..breakout_idx];
    let highs: Vec<f64> = formation.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = formation.iter().map(|b| b.low).collect();
    let Some((upper, _lower)) = confirm_formation(&highs, &lows, config.convergence_threshold)
    else {
        return result;
    };
    result.formation = true;

    result.breakout = bars[breakout_idx].close > upper.project(config.formation_period as f64);
    result.measured_rule_target_met = result.breakout;
    result
}
