//! Point forecasts with intervals and confidence
//!
//! The composer holds no state: a forecast is a pure function of the statistics,
//! the factor set, the configuration and the target date.

use crate::config::EngineConfig;
use crate::error::{ForecastError, Result};
use crate::factors::{FactorDimension, FactorSet};
use crate::statistics::StatisticsReport;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Confidence lost when the target date is a calendar event
const CALENDAR_EVENT_PENALTY: i32 = 10;

/// Confidence lost when the target date repeats a past anomaly
const ANOMALY_PATTERN_PENALTY: i32 = 15;

/// Ceiling on confidence when the statistics are degraded
const DEGRADED_CONFIDENCE_CAP: i32 = 50;

/// Relative change between first and last forecast that counts as a direction
const DIRECTION_TOLERANCE: f64 = 0.05;

/// Inclusive range around a point estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastInterval {
    pub low: f64,
    pub high: f64,
}

/// Forecast of daily order volume for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub target_date: NaiveDate,
    pub segment: Option<String>,
    /// Filtered median the multipliers were applied to
    pub baseline: f64,
    pub point_estimate: u32,
    pub interval: ForecastInterval,
    pub confidence_percent: u32,
    /// Every multiplier applied, in application order
    pub factor_breakdown: Vec<(FactorDimension, f64)>,
    /// Name of the calendar event on the target date, if any
    pub calendar_event: Option<String>,
}

impl ForecastResult {
    /// Product of every applied multiplier
    pub fn combined_multiplier(&self) -> f64 {
        self.factor_breakdown.iter().map(|(_, m)| m).product()
    }

    /// Multiplier applied for a dimension, if it was applied
    pub fn multiplier(&self, dimension: FactorDimension) -> Option<f64> {
        self.factor_breakdown
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, m)| *m)
    }
}

/// Direction of a multi-day forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonDirection {
    Rising,
    Falling,
    Flat,
}

/// Consecutive daily forecasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonForecast {
    pub forecasts: Vec<ForecastResult>,
    pub mean_point_estimate: f64,
    pub direction: HorizonDirection,
}

/// Forecast order volume for the target date
pub fn forecast(
    target_date: NaiveDate,
    segment: Option<&str>,
    statistics: &StatisticsReport,
    factors: &FactorSet,
    config: &EngineConfig,
) -> ForecastResult {
    let baseline = statistics.baseline();
    let mut breakdown = Vec::with_capacity(7);

    breakdown.push((
        FactorDimension::DayOfWeek,
        factors.day_of_week_multiplier(target_date),
    ));

    match factors.month_multiplier(target_date) {
        Some(m) => breakdown.push((FactorDimension::Month, m)),
        None => match factors.season_multiplier(target_date) {
            Some(s) if config.season_fallback => breakdown.push((FactorDimension::Season, s)),
            _ => breakdown.push((FactorDimension::Month, 1.0)),
        },
    }

    if config.week_of_month_factor {
        breakdown.push((
            FactorDimension::WeekOfMonth,
            factors.week_of_month_multiplier(target_date),
        ));
    }

    breakdown.push((FactorDimension::Trend, factors.trend));

    let segment = segment.map(str::to_lowercase);
    if let Some(label) = &segment {
        let multiplier = factors.segment_multiplier(label).unwrap_or(1.0);
        breakdown.push((FactorDimension::ClientSegment, multiplier));
    }

    let event = factors.calendar_event_for(target_date);
    if let Some(event) = event {
        breakdown.push((FactorDimension::CalendarEvent, event.multiplier));
    }

    if config.safety_factor != 1.0 {
        breakdown.push((FactorDimension::Safety, config.safety_factor));
    }

    let product: f64 = breakdown.iter().map(|(_, m)| m).product();
    let raw = baseline * product;
    let point = if raw.is_finite() { raw.max(0.0).round() } else { 0.0 };

    let spread = statistics.filtered.std_dev.abs();
    let interval = ForecastInterval {
        low: (point - spread).max(0.0),
        high: point + spread,
    };

    let confidence_percent = confidence(
        statistics,
        event.is_some(),
        statistics.matches_anomaly_pattern(target_date),
    );

    debug!(
        %target_date,
        baseline,
        product,
        point,
        confidence = confidence_percent,
        "composed forecast"
    );

    ForecastResult {
        target_date,
        segment,
        baseline,
        point_estimate: point as u32,
        interval,
        confidence_percent,
        factor_breakdown: breakdown,
        calendar_event: event.map(|e| e.name.clone()),
    }
}

/// Forecast `days` consecutive dates starting at `start`
pub fn forecast_horizon(
    start: NaiveDate,
    days: usize,
    segment: Option<&str>,
    statistics: &StatisticsReport,
    factors: &FactorSet,
    config: &EngineConfig,
) -> Result<HorizonForecast> {
    if days == 0 {
        return Err(ForecastError::InvalidParameter(
            "Horizon must cover at least one day".to_string(),
        ));
    }

    let forecasts: Vec<ForecastResult> = (0..days as i64)
        .map(|offset| {
            forecast(
                start + Duration::days(offset),
                segment,
                statistics,
                factors,
                config,
            )
        })
        .collect();

    let points: Vec<f64> = forecasts.iter().map(|f| f64::from(f.point_estimate)).collect();
    let mean_point_estimate = points.iter().sum::<f64>() / points.len() as f64;

    let first = points[0];
    let last = points[points.len() - 1];
    let direction = if last > first * (1.0 + DIRECTION_TOLERANCE) {
        HorizonDirection::Rising
    } else if last < first * (1.0 - DIRECTION_TOLERANCE) {
        HorizonDirection::Falling
    } else {
        HorizonDirection::Flat
    };

    Ok(HorizonForecast {
        forecasts,
        mean_point_estimate,
        direction,
    })
}

/// Confidence tier from the filtered coefficient of variation, less penalties
fn confidence(statistics: &StatisticsReport, calendar_event: bool, anomaly_pattern: bool) -> u32 {
    let mut score = match statistics.filtered.coefficient_of_variation() {
        None => 60,
        Some(cov) if cov < 0.2 => 95,
        Some(cov) if cov < 0.3 => 85,
        Some(cov) if cov < 0.4 => 75,
        Some(cov) if cov < 0.5 => 65,
        Some(_) => 55,
    };

    if calendar_event {
        score -= CALENDAR_EVENT_PENALTY;
    }
    if anomaly_pattern {
        score -= ANOMALY_PATTERN_PENALTY;
    }
    if statistics.is_insufficient() {
        score = score.min(DEGRADED_CONFIDENCE_CAP);
    }

    score.clamp(0, 100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DailyAggregate;
    use crate::factors::compute_factors;
    use crate::statistics::compute_statistics;

    fn constant(days: i64, count: u32) -> Vec<DailyAggregate> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        (0..days)
            .map(|i| DailyAggregate::with_orders(start + Duration::days(i), count))
            .collect()
    }

    #[test]
    fn test_safety_factor_is_last() {
        let history = constant(30, 10);
        let config = EngineConfig {
            safety_factor: 0.9,
            ..EngineConfig::default()
        };
        let stats = compute_statistics(&history, &config);
        let factors = compute_factors(&history, &[], &config);
        let target = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();

        let result = forecast(target, None, &stats, &factors, &config);
        assert_eq!(result.point_estimate, 9);
        assert_eq!(result.factor_breakdown.last(), Some(&(FactorDimension::Safety, 0.9)));
    }

    #[test]
    fn test_calendar_event_lowers_confidence() {
        let history = constant(30, 10);
        let config = EngineConfig::default();
        let stats = compute_statistics(&history, &config);
        let factors = compute_factors(&history, &[], &config);

        let eve = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap();
        let plain = forecast(eve, None, &stats, &factors, &config);
        let christmas = forecast(eve.succ_opt().unwrap(), None, &stats, &factors, &config);

        assert_eq!(christmas.point_estimate, 8);
        assert_eq!(christmas.calendar_event.as_deref(), Some("Christmas"));
        assert_eq!(plain.confidence_percent - christmas.confidence_percent, 10);
    }

    #[test]
    fn test_unknown_segment_is_neutral_but_listed() {
        let history = constant(30, 10);
        let config = EngineConfig::default();
        let stats = compute_statistics(&history, &config);
        let factors = compute_factors(&history, &[], &config);
        let target = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();

        let result = forecast(target, Some("Wholesale"), &stats, &factors, &config);
        assert_eq!(result.multiplier(FactorDimension::ClientSegment), Some(1.0));
        assert_eq!(result.segment.as_deref(), Some("wholesale"));
    }

    #[test]
    fn test_empty_horizon_is_rejected() {
        let config = EngineConfig::default();
        let stats = compute_statistics(&[], &config);
        let factors = FactorSet::neutral(Vec::new());
        let start = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        assert!(forecast_horizon(start, 0, None, &stats, &factors, &config).is_err());
    }
}
