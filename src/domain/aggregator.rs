//! Fuses classified signals into per-bar trade decisions.

use std::fmt;
use std::str::FromStr;

use crate::domain::divergence::{mfi_divergence, mfi_divergence2, mfi_trade};
use crate::domain::error::FuseError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::pipeline::{compute_snapshots, IndicatorSnapshot, PipelineConfig};
use crate::domain::recommendation::{OrderType, Recommendation};
use crate::domain::signal::{
    classify_bband, classify_bband_breakout, classify_demark, classify_flag_pennant,
    classify_macd, classify_mfi, classify_mfi_low, classify_resistance, classify_roc,
    classify_roc_momentum, classify_support, classify_trend, classify_vwma, Signal,
};
use crate::domain::trend::track_trend;

/// Snapshots summed by the trailing-window rule, current bar included.
/// Shorter histories decide nothing.
pub const TRAILING_WINDOW: usize = 5;
/// MFI and close are compared against this many bars back.
pub const TRAILING_LOOKBACK: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationPolicy {
    Intraday,
    #[default]
    TrailingWindow,
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intraday" => Ok(AggregationPolicy::Intraday),
            "trailing" => Ok(AggregationPolicy::TrailingWindow),
            other => Err(format!("unknown policy '{}'", other)),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::Intraday => write!(f, "intraday"),
            AggregationPolicy::TrailingWindow => write!(f, "trailing"),
        }
    }
}

/// Classify every signal for the last snapshot of `series`.
///
/// The decision field is left at `OrderType::None`; see [`recommend_all`].
pub fn build_signals(series: &[IndicatorSnapshot]) -> Recommendation {
    let Some(s) = series.last() else {
        return Recommendation::default();
    };
    let close = s.close();
    Recommendation {
        mfi: classify_mfi(s.mfi),
        roc: classify_roc(&s.roc_inputs()),
        bband: classify_bband(close, s.bband),
        vwma: classify_vwma(close, s.vwma),
        macd: classify_macd(s.macd, s.macd_previous),
        demark9: classify_demark(s.demark9),
        mfi_low: classify_mfi_low(s.mfi, s.mfi_low),
        mfi_trade: mfi_trade(series),
        mfi_divergence: mfi_divergence(series),
        mfi_divergence2: mfi_divergence2(series),
        bband_breakout: classify_bband_breakout(s.bband_breakout),
        flag_pennant: classify_flag_pennant(&s.flag_pennant),
        break_support: classify_support(&s.bar, &s.support),
        break_resistance: classify_resistance(&s.bar, &s.resistance),
        recommendation: OrderType::None,
    }
}

fn count(signals: &[Signal]) -> (usize, usize) {
    signals.iter().fold((0, 0), |(bull, bear), s| match s {
        Signal::Bullish => (bull + 1, bear),
        Signal::Bearish => (bull, bear + 1),
        Signal::Neutral => (bull, bear),
    })
}

/// Single-bar vote over the fast-moving signals.
pub fn intraday_vote(snapshot: &IndicatorSnapshot, signals: &Recommendation) -> OrderType {
    let votes = [
        signals.mfi,
        classify_roc_momentum(&snapshot.roc_inputs()),
        signals.bband,
        signals.macd,
        signals.demark9,
        classify_trend(snapshot.mfi_trend),
        signals.bband_breakout,
        signals.break_support,
        signals.break_resistance,
    ];
    let (bull, bear) = count(&votes);
    if bull > 1 && bear < 2 {
        OrderType::Buy
    } else if bear > 1 && bear > bull {
        OrderType::Sell
    } else {
        OrderType::None
    }
}

/// Decision for the last snapshot of `series` from the signals of the
/// trailing [`TRAILING_WINDOW`] snapshots.
///
/// Snapshots without a recommendation contribute nothing. Fewer than
/// [`TRAILING_WINDOW`] snapshots yield `None`.
pub fn trailing_window_confirmation(series: &[IndicatorSnapshot]) -> OrderType {
    let n = series.len();
    if n < TRAILING_WINDOW {
        return OrderType::None;
    }
    let current = &series[n - 1];
    let past = &series[n - 1 - TRAILING_LOOKBACK];
    let (Some(mfi_now), Some(mfi_then)) = (current.mfi, past.mfi) else {
        return OrderType::None;
    };

    let (bull, bear) = series[n - TRAILING_WINDOW..]
        .iter()
        .filter_map(|s| s.recommendation.as_ref())
        .map(Recommendation::tally)
        .fold((0usize, 0usize), |(b, s), (bull, bear)| (b + bull, s + bear));

    let rising = mfi_then < mfi_now && past.close() < current.close();
    let falling = mfi_then > mfi_now && past.close() > current.close();

    if bull > 4 && bull.saturating_sub(bear) > 3 && rising {
        OrderType::Buy
    } else if bear > 4 && bear.saturating_sub(bull) > 3 && falling {
        OrderType::Sell
    } else {
        OrderType::None
    }
}

/// Fill `recommendation` on every snapshot, in bar order.
///
/// Expects `mfi_trend` to be populated already.
pub fn recommend_all(snapshots: &mut [IndicatorSnapshot], policy: AggregationPolicy) {
    for i in 0..snapshots.len() {
        let signals = build_signals(&snapshots[..=i]);
        snapshots[i].recommendation = Some(signals);

        let decision = match policy {
            AggregationPolicy::Intraday => intraday_vote(&snapshots[i], &signals),
            AggregationPolicy::TrailingWindow => trailing_window_confirmation(&snapshots[..=i]),
        };
        if let Some(rec) = snapshots[i].recommendation.as_mut() {
            rec.recommendation = decision;
        }
    }
}

/// Pipeline, trend tracking and aggregation over a full bar series.
pub fn process_series(
    bars: &[PriceBar],
    config: &PipelineConfig,
    policy: AggregationPolicy,
) -> Result<Vec<IndicatorSnapshot>, FuseError> {
    let mut snapshots = compute_snapshots(bars, config)?;
    track_trend(&mut snapshots);
    recommend_all(&mut snapshots, policy);
    Ok(snapshots)
}

/// Recommendation for the most recent bar.
pub fn latest_recommendation(
    bars: &[PriceBar],
    config: &PipelineConfig,
    policy: AggregationPolicy,
) -> Result<Recommendation, FuseError> {
    process_series(bars, config, policy)?
        .last()
        .and_then(|s| s.recommendation)
        .ok_or_else(|| FuseError::Computation {
            reason: "no snapshot produced".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::Bands;
    use crate::domain::pipeline::bare_snapshot;

    fn with_rec(index: usize, close: f64, mfi: f64, rec: Recommendation) -> IndicatorSnapshot {
        let mut s = bare_snapshot(index, close);
        s.mfi = Some(mfi);
        s.recommendation = Some(rec);
        s
    }

    fn bullish_pair() -> Recommendation {
        Recommendation {
            mfi: Signal::Bullish,
            vwma: Signal::Bullish,
            ..Default::default()
        }
    }

    #[test]
    fn policy_parse() {
        assert_eq!(
            "trailing".parse::<AggregationPolicy>(),
            Ok(AggregationPolicy::TrailingWindow)
        );
        assert_eq!(
            " Intraday ".parse::<AggregationPolicy>(),
            Ok(AggregationPolicy::Intraday)
        );
        assert!("weekly".parse::<AggregationPolicy>().is_err());
    }

    #[test]
    fn bare_snapshot_signals_neutral() {
        let series = vec![bare_snapshot(80, 100.0)];
        let rec = build_signals(&series);
        assert_eq!(rec.tally(), (0, 0));
        assert_eq!(build_signals(&[]), Recommendation::default());
    }

    #[test]
    fn build_signals_reads_last_snapshot() {
        let mut s = bare_snapshot(80, 94.0);
        s.mfi = Some(20.0);
        s.bband = Some(Bands {
            upper: 120.0,
            middle: 110.0,
            lower: 95.0,
        });
        s.bband_breakout = true;
        let rec = build_signals(&[s]);
        assert_eq!(rec.mfi, Signal::Bullish);
        assert_eq!(rec.bband, Signal::Bullish);
        assert_eq!(rec.bband_breakout, Signal::Bullish);
    }

    #[test]
    fn intraday_vote_thresholds() {
        let mut s = bare_snapshot(80, 100.0);
        let signals = Recommendation {
            mfi: Signal::Bullish,
            bband: Signal::Bullish,
            ..Default::default()
        };
        assert_eq!(intraday_vote(&s, &signals), OrderType::Buy);

        s.mfi_trend = Some(false);
        let signals = Recommendation {
            mfi: Signal::Bullish,
            bband: Signal::Bullish,
            macd: Signal::Bearish,
            ..Default::default()
        };
        // two bearish votes block the buy, but do not outnumber the bulls
        assert_eq!(intraday_vote(&s, &signals), OrderType::None);

        let signals = Recommendation {
            macd: Signal::Bearish,
            break_support: Signal::Bearish,
            ..Default::default()
        };
        assert_eq!(intraday_vote(&s, &signals), OrderType::Sell);
    }

    #[test]
    fn intraday_vote_ignores_slow_signals() {
        let s = bare_snapshot(80, 100.0);
        let signals = Recommendation {
            vwma: Signal::Bullish,
            flag_pennant: Signal::Bullish,
            mfi_divergence: Signal::Bullish,
            ..Default::default()
        };
        assert_eq!(intraday_vote(&s, &signals), OrderType::None);
    }

    #[test]
    fn trailing_window_buy() {
        let series: Vec<_> = (0..5)
            .map(|i| with_rec(80 + i, 100.0 + i as f64, 30.0 + i as f64, bullish_pair()))
            .collect();
        assert_eq!(trailing_window_confirmation(&series), OrderType::Buy);
    }

    #[test]
    fn trailing_window_needs_full_window() {
        // four bars already carry eight bulls with MFI and close rising
        let series: Vec<_> = (0..5)
            .map(|i| with_rec(80 + i, 100.0 + i as f64, 30.0 + i as f64, bullish_pair()))
            .collect();
        assert_eq!(trailing_window_confirmation(&series[1..]), OrderType::None);
        assert_eq!(trailing_window_confirmation(&series[2..]), OrderType::None);
        assert_eq!(trailing_window_confirmation(&series), OrderType::Buy);
    }

    #[test]
    fn trailing_window_needs_rising_mfi_and_close() {
        let series: Vec<_> = (0..5)
            .map(|i| with_rec(80 + i, 100.0 + i as f64, 50.0 - i as f64, bullish_pair()))
            .collect();
        assert_eq!(trailing_window_confirmation(&series), OrderType::None);
    }

    #[test]
    fn trailing_window_sell() {
        let bearish = Recommendation {
            mfi: Signal::Bearish,
            macd: Signal::Bearish,
            ..Default::default()
        };
        let series: Vec<_> = (0..5)
            .map(|i| with_rec(80 + i, 100.0 - i as f64, 80.0 - i as f64, bearish))
            .collect();
        assert_eq!(trailing_window_confirmation(&series), OrderType::Sell);
    }

    #[test]
    fn recommend_all_fills_every_snapshot() {
        let mut series: Vec<_> = (0..6).map(|i| bare_snapshot(80 + i, 100.0)).collect();
        recommend_all(&mut series, AggregationPolicy::TrailingWindow);
        assert!(
            series
                .iter()
                .all(|s| s.recommendation == Some(Recommendation::default()))
        );
    }
}
