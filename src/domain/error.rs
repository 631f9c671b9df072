//! Domain error types and non-fatal diagnostics.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::indicator::IndicatorType;

/// Top-level error type for fusetrader.
#[derive(Debug, thiserror::Error)]
pub enum FuseError {
    #[error("invalid input at bar {index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    #[error("insufficient history: have {bars} bars, need {minimum}")]
    InsufficientHistory { bars: usize, minimum: usize },

    #[error("computation error: {reason}")]
    Computation { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code} on {exchange}")]
    NoData { code: String, exchange: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FuseError> for std::process::ExitCode {
    fn from(err: &FuseError) -> Self {
        let code: u8 = match err {
            FuseError::Io(_) | FuseError::Report { .. } => 1,
            FuseError::ConfigParse { .. }
            | FuseError::ConfigMissing { .. }
            | FuseError::ConfigInvalid { .. } => 2,
            FuseError::Data { .. } | FuseError::NoData { .. } => 3,
            FuseError::InvalidInput { .. } | FuseError::InsufficientHistory { .. } => 4,
            FuseError::Computation { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// A sub-indicator produced no usable value for a bar.
///
/// Not an error: the dependent classifier reports Neutral and the scan continues.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDegraded {
    pub indicator: IndicatorType,
    pub date: NaiveDate,
}

impl fmt::Display for IndicatorDegraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable on {}", self.indicator, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn insufficient_history_message() {
        let err = FuseError::InsufficientHistory {
            bars: 12,
            minimum: 80,
        };
        assert_eq!(err.to_string(), "insufficient history: have 12 bars, need 80");
    }

    #[test]
    fn invalid_input_message() {
        let err = FuseError::InvalidInput {
            index: 3,
            reason: "non-finite price".into(),
        };
        assert_eq!(err.to_string(), "invalid input at bar 3: non-finite price");
    }

    #[test]
    fn exit_codes_group_by_kind() {
        let config = FuseError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        };
        let history = FuseError::InsufficientHistory {
            bars: 1,
            minimum: 80,
        };
        assert_eq!(
            format!("{:?}", ExitCode::from(&config)),
            format!("{:?}", ExitCode::from(2))
        );
        assert_eq!(
            format!("{:?}", ExitCode::from(&history)),
            format!("{:?}", ExitCode::from(4))
        );
    }

    #[test]
    fn degraded_display() {
        let d = IndicatorDegraded {
            indicator: IndicatorType::Vwma(70),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        assert_eq!(d.to_string(), "VWMA(70) unavailable on 2024-03-01");
    }
}
