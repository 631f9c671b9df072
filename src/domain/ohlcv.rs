//! Price bar representation and input validation.

use chrono::NaiveDate;

use crate::domain::error::FuseError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub code: String,
    pub exchange: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Reject series the indicator pipeline cannot index meaningfully.
///
/// Prices must be finite, `high >= low`, volume non-negative and dates
/// non-decreasing.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), FuseError> {
    for (index, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(FuseError::InvalidInput {
                index,
                reason: "non-finite price".into(),
            });
        }
        if bar.high < bar.low {
            return Err(FuseError::InvalidInput {
                index,
                reason: format!("high {} below low {}", bar.high, bar.low),
            });
        }
        if bar.volume < 0 {
            return Err(FuseError::InvalidInput {
                index,
                reason: format!("negative volume {}", bar.volume),
            });
        }
        if index > 0 && bar.date < bars[index - 1].date {
            return Err(FuseError::InvalidInput {
                index,
                reason: format!("date {} precedes {}", bar.date, bars[index - 1].date),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar {
            code: "BHP".into(),
            exchange: "ASX".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
        }
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn range_is_high_minus_low() {
        assert!((sample_bar().range() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_ordered_series() {
        let first = sample_bar();
        let second = PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            ..sample_bar()
        };
        assert!(validate_bars(&[first, second]).is_ok());
    }

    #[test]
    fn validate_rejects_nan_close() {
        let bar = PriceBar {
            close: f64::NAN,
            ..sample_bar()
        };
        let err = validate_bars(&[bar]).unwrap_err();
        assert!(matches!(err, FuseError::InvalidInput { index: 0, .. }));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let bar = PriceBar {
            high: 80.0,
            ..sample_bar()
        };
        assert!(matches!(
            validate_bars(&[bar]),
            Err(FuseError::InvalidInput { .. })
        ));
    }

    #[test]
    fn validate_rejects_negative_volume() {
        let bar = PriceBar {
            volume: -1,
            ..sample_bar()
        };
        assert!(validate_bars(&[bar]).is_err());
    }

    #[test]
    fn validate_rejects_out_of_order_dates() {
        let first = PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            ..sample_bar()
        };
        let second = sample_bar();
        let err = validate_bars(&[first, second]).unwrap_err();
        assert!(matches!(err, FuseError::InvalidInput { index: 1, .. }));
    }
}
