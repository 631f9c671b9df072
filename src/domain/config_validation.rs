//! Configuration validation.
//!
//! Validates every `[data]`, `[backtest]` and `[indicators]` key before a run.

use crate::domain::aggregator::AggregationPolicy;
use crate::domain::error::FuseError;
use crate::domain::pattern::flag_pennant::MIN_FORMATION_PERIOD;
use crate::domain::pipeline::BarInterval;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FuseError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_indicator_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), FuseError> {
    require_string(config, "data", "path")?;
    require_string(config, "data", "code")?;
    require_string(config, "data", "exchange")?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FuseError> {
    validate_policy(config)?;
    validate_interval(config)?;
    validate_thresholds(config)?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), FuseError> {
    for key in ["swing_window", "max_levels", "trend_period"] {
        if config.get_int("indicators", key, 1) < 1 {
            return Err(invalid("indicators", key, format!("{} must be at least 1", key)));
        }
    }
    let formation =
        config.get_int("indicators", "formation_period", MIN_FORMATION_PERIOD as i64);
    if formation < MIN_FORMATION_PERIOD as i64 {
        return Err(invalid(
            "indicators",
            "formation_period",
            format!("formation_period must be at least {}", MIN_FORMATION_PERIOD),
        ));
    }
    let tolerance = config.get_double("indicators", "cluster_tolerance", 0.0);
    if !(0.0..1.0).contains(&tolerance) {
        return Err(invalid(
            "indicators",
            "cluster_tolerance",
            "cluster_tolerance must be between 0 and 1".into(),
        ));
    }
    for key in ["convergence_threshold", "steepness_threshold"] {
        let value = config.get_double("indicators", key, 0.0);
        if !value.is_finite() || value < 0.0 {
            return Err(invalid("indicators", key, format!("{} must be non-negative", key)));
        }
    }
    Ok(())
}

fn validate_policy(config: &dyn ConfigPort) -> Result<(), FuseError> {
    if let Some(value) = config.get_string("backtest", "policy") {
        value
            .parse::<AggregationPolicy>()
            .map_err(|reason| invalid("backtest", "policy", reason))?;
    }
    Ok(())
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), FuseError> {
    if let Some(value) = config.get_string("backtest", "interval") {
        value
            .parse::<BarInterval>()
            .map_err(|reason| invalid("backtest", "interval", reason))?;
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), FuseError> {
    if let Some(loss) = optional_double(config, "backtest", "loss_threshold")? {
        if loss >= 0.0 {
            return Err(invalid(
                "backtest",
                "loss_threshold",
                "loss_threshold must be negative".into(),
            ));
        }
    }
    if let Some(profit) = optional_double(config, "backtest", "profit_threshold")? {
        if profit <= 0.0 {
            return Err(invalid(
                "backtest",
                "profit_threshold",
                "profit_threshold must be positive".into(),
            ));
        }
    }
    Ok(())
}

/// Optional `[data]` date bounds, checked for format and order.
pub fn validate_dates(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), FuseError> {
    let start = optional_date(config, "data", "start_date")?;
    let end = optional_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must be before end_date".into(),
            ));
        }
    }
    Ok((start, end))
}

/// Non-empty string value, or `ConfigMissing`.
pub fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, FuseError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(FuseError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Absent or blank is `None`; present but unparsable is `ConfigInvalid`.
pub fn optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, FuseError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(section, key, format!("{} must be a number", key))),
        _ => Ok(None),
    }
}

pub fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, FuseError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                invalid(
                    section,
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
        _ => Ok(None),
    }
}

fn invalid(section: &str, key: &str, reason: String) -> FuseError {
    FuseError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
