//! Quote source port.

use crate::domain::error::FuseError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

/// Supplies date-ordered bars for one security.
pub trait QuoteSource {
    /// Bars for `code` on `exchange`, oldest first. Bounds are inclusive;
    /// `None` leaves that side unbounded.
    fn fetch_bars(
        &self,
        code: &str,
        exchange: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, FuseError>;
}
