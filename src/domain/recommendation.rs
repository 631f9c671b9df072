//! Per-bar signal vector and trade decision.

use std::fmt;

use crate::domain::signal::Signal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrderType {
    Buy,
    Sell,
    #[default]
    None,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Buy => write!(f, "BUY"),
            OrderType::Sell => write!(f, "SELL"),
            OrderType::None => write!(f, "NONE"),
        }
    }
}

/// Fixed-order identity of every signal a [`Recommendation`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKey {
    Mfi,
    Roc,
    Bband,
    Vwma,
    Macd,
    Demark9,
    MfiLow,
    MfiTrade,
    MfiDivergence,
    MfiDivergence2,
    BbandBreakout,
    FlagPennant,
    BreakSupport,
    BreakResistance,
}

impl SignalKey {
    pub const ALL: [SignalKey; 14] = [
        SignalKey::Mfi,
        SignalKey::Roc,
        SignalKey::Bband,
        SignalKey::Vwma,
        SignalKey::Macd,
        SignalKey::Demark9,
        SignalKey::MfiLow,
        SignalKey::MfiTrade,
        SignalKey::MfiDivergence,
        SignalKey::MfiDivergence2,
        SignalKey::BbandBreakout,
        SignalKey::FlagPennant,
        SignalKey::BreakSupport,
        SignalKey::BreakResistance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SignalKey::Mfi => "mfi",
            SignalKey::Roc => "roc",
            SignalKey::Bband => "bband",
            SignalKey::Vwma => "vwma",
            SignalKey::Macd => "macd",
            SignalKey::Demark9 => "demark9",
            SignalKey::MfiLow => "mfiLow",
            SignalKey::MfiTrade => "mfiTrade",
            SignalKey::MfiDivergence => "mfiDivergence",
            SignalKey::MfiDivergence2 => "mfiDivergence2",
            SignalKey::BbandBreakout => "bbandBreakout",
            SignalKey::FlagPennant => "flagPennant",
            SignalKey::BreakSupport => "breakSupport",
            SignalKey::BreakResistance => "breakResistance",
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recommendation {
    pub mfi: Signal,
    pub roc: Signal,
    pub bband: Signal,
    pub vwma: Signal,
    pub macd: Signal,
    pub demark9: Signal,
    pub mfi_low: Signal,
    pub mfi_trade: Signal,
    pub mfi_divergence: Signal,
    pub mfi_divergence2: Signal,
    pub bband_breakout: Signal,
    pub flag_pennant: Signal,
    pub break_support: Signal,
    pub break_resistance: Signal,
    pub recommendation: OrderType,
}

impl Recommendation {
    pub fn get(&self, key: SignalKey) -> Signal {
        match key {
            SignalKey::Mfi => self.mfi,
            SignalKey::Roc => self.roc,
            SignalKey::Bband => self.bband,
            SignalKey::Vwma => self.vwma,
            SignalKey::Macd => self.macd,
            SignalKey::Demark9 => self.demark9,
            SignalKey::MfiLow => self.mfi_low,
            SignalKey::MfiTrade => self.mfi_trade,
            SignalKey::MfiDivergence => self.mfi_divergence,
            SignalKey::MfiDivergence2 => self.mfi_divergence2,
            SignalKey::BbandBreakout => self.bband_breakout,
            SignalKey::FlagPennant => self.flag_pennant,
            SignalKey::BreakSupport => self.break_support,
            SignalKey::BreakResistance => self.break_resistance,
        }
    }

    /// Signals in [`SignalKey::ALL`] order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalKey, Signal)> + '_ {
        SignalKey::ALL.iter().map(move |&key| (key, self.get(key)))
    }

    /// (bullish, bearish) counts over every signal.
    pub fn tally(&self) -> (usize, usize) {
        self.signals().fold((0, 0), |(bull, bear), (_, s)| match s {
            Signal::Bullish => (bull + 1, bear),
            Signal::Bearish => (bull, bear + 1),
            Signal::Neutral => (bull, bear),
        })
    }

    /// Numeric feature vector for downstream model input.
    pub fn features(&self) -> Vec<f64> {
        self.signals().map(|(_, s)| s.as_feature()).collect()
    }
}
