//! Engine configuration and named presets

use crate::calendar::{default_events, CalendarEvent};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest accepted refresh interval, ten years in hours
pub const MAX_REFRESH_INTERVAL_HOURS: i64 = 10 * 366 * 24;

/// Longest accepted trailing window, about a century
pub const MAX_TRAILING_WINDOW_DAYS: i64 = 36_500;

/// Named parameter sets for the forecasting pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Defaults, no safety margin
    #[default]
    Standard,
    /// Shaves 10% off every forecast and flags anomalies more eagerly
    Conservative,
    /// Enables the season fallback and the week-of-month factor
    Advanced,
}

/// Every tunable of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width of the `mean ± k·stddev` anomaly band
    pub anomaly_k: f64,
    /// Lower percentile of the percentile anomaly band
    pub lower_percentile: f64,
    /// Upper percentile of the percentile anomaly band
    pub upper_percentile: f64,
    /// Observations below which statistics fall back to fixed values
    pub min_observations: usize,
    /// Distinct filtered days required before a trend is fitted
    pub trend_min_days: usize,
    /// Bounds the trend multiplier is clamped to
    pub trend_clamp: (f64, f64),
    /// Age after which a cached calibration is stale
    pub refresh_interval_hours: i64,
    /// Length of the trailing window the cache recalibrates on
    pub trailing_window_days: i64,
    /// Price of one unit, used to derive unit counts from revenue
    pub unit_price: Decimal,
    /// Final multiplier applied to every forecast
    pub safety_factor: f64,
    /// Use the season multiplier when the target month has no history
    pub season_fallback: bool,
    /// Derive and apply a week-of-month multiplier
    pub week_of_month_factor: bool,
    /// Known high/low demand dates
    pub calendar_events: Vec<CalendarEvent>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anomaly_k: 2.5,
            lower_percentile: 5.0,
            upper_percentile: 95.0,
            min_observations: 3,
            trend_min_days: 7,
            trend_clamp: (0.8, 1.3),
            refresh_interval_hours: 12,
            trailing_window_days: 60,
            unit_price: Decimal::from(2000),
            safety_factor: 1.0,
            season_fallback: false,
            week_of_month_factor: false,
            calendar_events: default_events(),
        }
    }
}

impl EngineConfig {
    /// Configuration for a named preset
    pub fn preset(preset: Preset) -> Self {
        let base = Self::default();
        match preset {
            Preset::Standard => base,
            Preset::Conservative => Self {
                anomaly_k: 2.0,
                safety_factor: 0.9,
                ..base
            },
            Preset::Advanced => Self {
                season_fallback: true,
                week_of_month_factor: true,
                ..base
            },
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Refresh interval as a duration
    ///
    /// Out-of-range values are clamped, so an unvalidated config cannot overflow.
    pub fn refresh_interval(&self) -> Duration {
        let hours = self
            .refresh_interval_hours
            .clamp(0, MAX_REFRESH_INTERVAL_HOURS);
        Duration::try_hours(hours).unwrap_or_else(Duration::zero)
    }

    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.anomaly_k.is_finite() && self.anomaly_k > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "anomaly_k must be positive, got {}",
                self.anomaly_k
            )));
        }

        if !(0.0..100.0).contains(&self.lower_percentile)
            || !(self.lower_percentile < self.upper_percentile && self.upper_percentile <= 100.0)
        {
            return Err(ForecastError::InvalidParameter(format!(
                "Percentile band must satisfy 0 <= lower < upper <= 100, got ({}, {})",
                self.lower_percentile, self.upper_percentile
            )));
        }

        if self.min_observations < 3 {
            return Err(ForecastError::InvalidParameter(format!(
                "min_observations must be at least 3, got {}",
                self.min_observations
            )));
        }

        if self.trend_min_days < 2 {
            return Err(ForecastError::InvalidParameter(
                "trend_min_days must be at least 2".to_string(),
            ));
        }

        let (low, high) = self.trend_clamp;
        if !(low > 0.0 && low <= 1.0 && high >= 1.0 && high.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "trend_clamp must contain 1.0 and be positive, got ({}, {})",
                low, high
            )));
        }

        if !(1..=MAX_REFRESH_INTERVAL_HOURS).contains(&self.refresh_interval_hours) {
            return Err(ForecastError::InvalidParameter(format!(
                "refresh_interval_hours must be between 1 and {}, got {}",
                MAX_REFRESH_INTERVAL_HOURS, self.refresh_interval_hours
            )));
        }

        if !(1..=MAX_TRAILING_WINDOW_DAYS).contains(&self.trailing_window_days) {
            return Err(ForecastError::InvalidParameter(format!(
                "trailing_window_days must be between 1 and {}, got {}",
                MAX_TRAILING_WINDOW_DAYS, self.trailing_window_days
            )));
        }

        if self.unit_price <= Decimal::ZERO {
            return Err(ForecastError::InvalidParameter(
                "unit_price must be positive".to_string(),
            ));
        }

        if !(self.safety_factor.is_finite() && self.safety_factor > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "safety_factor must be positive, got {}",
                self.safety_factor
            )));
        }

        for event in &self.calendar_events {
            // 2024 is a leap year so Feb 29 is accepted
            if NaiveDate::from_ymd_opt(2024, event.month, event.day).is_none() {
                return Err(ForecastError::ConfigError(format!(
                    "Calendar event '{}' has an invalid date {}-{}",
                    event.name, event.month, event.day
                )));
            }
            if !(event.multiplier.is_finite() && event.multiplier >= 0.0) {
                return Err(ForecastError::ConfigError(format!(
                    "Calendar event '{}' has a negative multiplier",
                    event.name
                )));
            }
        }

        Ok(())
    }
}
