//! Robust statistics over daily order counts
//!
//! Anomalous days are found with whichever of two bands is narrower: the
//! `mean ± k·stddev` band or the percentile band. The filtered summary, computed
//! without those days, is the forecasting baseline.

use crate::aggregate::{order_counts, DailyAggregate};
use crate::config::EngineConfig;
use chrono::{Datelike, NaiveDate};
use demand_math::{coefficient_of_variation, mean, median, percentile, sample_std_dev};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Baseline used when there is no history at all
pub const DEFAULT_BASELINE: f64 = 6.39;

/// Dispersion used when it cannot be estimated
pub const DEFAULT_STD_DEV: f64 = 2.94;

/// Central tendency and dispersion of a set of daily counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl Summary {
    /// Summary used when nothing has been observed
    pub fn fallback() -> Self {
        Self {
            count: 0,
            mean: DEFAULT_BASELINE,
            median: DEFAULT_BASELINE,
            std_dev: DEFAULT_STD_DEV,
        }
    }

    /// Summarize the values; single observations get the default dispersion
    fn of(values: &[f64]) -> Self {
        let (Ok(mean), Ok(median)) = (mean(values), median(values)) else {
            return Self::fallback();
        };
        let std_dev = sample_std_dev(values).unwrap_or(DEFAULT_STD_DEV);

        Self {
            count: values.len(),
            mean,
            median,
            std_dev,
        }
    }

    pub fn coefficient_of_variation(&self) -> Option<f64> {
        coefficient_of_variation(self.mean, self.std_dev)
    }
}

/// Why the statistics had to be degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Degradation {
    /// Too few days to detect anomalies; the summary is a fallback
    InsufficientData { observed: usize, required: usize },
    /// Every filtered day has the same count
    ZeroVariance,
    /// The filtered mean is zero
    ZeroMean,
}

/// Which band decided the anomaly bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundMethod {
    Sigma,
    Percentile,
}

/// Inclusive range of non-anomalous daily counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyBounds {
    pub lower: f64,
    pub upper: f64,
    pub method: BoundMethod,
}

impl AnomalyBounds {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Statistics over a window of daily aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Summary of every day in the window
    pub raw: Summary,
    /// Summary excluding anomalous days
    pub filtered: Summary,
    pub bounds: Option<AnomalyBounds>,
    /// Days excluded from the filtered summary, ascending
    pub anomalies: Vec<NaiveDate>,
    pub degradations: Vec<Degradation>,
}

impl StatisticsReport {
    /// Robust baseline: median of the filtered window
    pub fn baseline(&self) -> f64 {
        self.filtered.median
    }

    pub fn is_anomaly(&self, date: NaiveDate) -> bool {
        self.anomalies.binary_search(&date).is_ok()
    }

    /// Whether the date falls on the same day of the year as a past anomaly
    pub fn matches_anomaly_pattern(&self, date: NaiveDate) -> bool {
        self.anomalies
            .iter()
            .any(|a| a.month() == date.month() && a.day() == date.day())
    }

    /// Statistics were computed from too little data
    pub fn is_insufficient(&self) -> bool {
        self.degradations
            .iter()
            .any(|d| matches!(d, Degradation::InsufficientData { .. }))
    }
}

/// Compute raw and filtered statistics plus the anomalous days
pub fn compute_statistics(aggregates: &[DailyAggregate], config: &EngineConfig) -> StatisticsReport {
    let values = order_counts(aggregates);
    let required = config.min_observations.max(3);

    if values.len() < required {
        let summary = if values.is_empty() {
            Summary::fallback()
        } else {
            Summary::of(&values)
        };
        warn!(
            observed = values.len(),
            required,
            baseline = summary.median,
            "not enough days for robust statistics, using fallback"
        );

        return StatisticsReport {
            raw: summary,
            filtered: summary,
            bounds: None,
            anomalies: Vec::new(),
            degradations: vec![Degradation::InsufficientData {
                observed: values.len(),
                required,
            }],
        };
    }

    let raw = Summary::of(&values);
    let bounds = anomaly_bounds(&values, &raw, config);
    debug!(
        lower = bounds.lower,
        upper = bounds.upper,
        method = ?bounds.method,
        "anomaly bounds"
    );

    let mut anomalies = Vec::new();
    let mut kept = Vec::with_capacity(values.len());
    for (day, &value) in aggregates.iter().zip(values.iter()) {
        if bounds.contains(value) {
            kept.push(value);
        } else {
            anomalies.push(day.date);
        }
    }

    let filtered = if kept.len() < required {
        warn!(
            anomalies = anomalies.len(),
            kept = kept.len(),
            "anomaly exclusion would leave too few days, keeping all of them"
        );
        anomalies.clear();
        raw
    } else {
        Summary::of(&kept)
    };
    anomalies.sort();

    let mut degradations = Vec::new();
    if filtered.std_dev == 0.0 {
        degradations.push(Degradation::ZeroVariance);
    }
    if filtered.mean == 0.0 {
        degradations.push(Degradation::ZeroMean);
    }

    if !anomalies.is_empty() {
        info!(count = anomalies.len(), "excluded anomalous days from baseline");
    }

    StatisticsReport {
        raw,
        filtered,
        bounds: Some(bounds),
        anomalies,
        degradations,
    }
}

/// The narrower of the sigma band and the percentile band
fn anomaly_bounds(values: &[f64], raw: &Summary, config: &EngineConfig) -> AnomalyBounds {
    let sigma = AnomalyBounds {
        lower: raw.mean - config.anomaly_k * raw.std_dev,
        upper: raw.mean + config.anomaly_k * raw.std_dev,
        method: BoundMethod::Sigma,
    };

    let percentile_band = match (
        percentile(values, config.lower_percentile),
        percentile(values, config.upper_percentile),
    ) {
        (Ok(lower), Ok(upper)) => Some(AnomalyBounds {
            lower,
            upper,
            method: BoundMethod::Percentile,
        }),
        _ => None,
    };

    match percentile_band {
        Some(band) if band.width() <= sigma.width() => band,
        _ => sigma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(counts: &[u32]) -> Vec<DailyAggregate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| DailyAggregate::with_orders(start + chrono::Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn test_empty_history_falls_back() {
        let report = compute_statistics(&[], &EngineConfig::default());
        assert_eq!(report.baseline(), DEFAULT_BASELINE);
        assert_eq!(report.filtered.std_dev, DEFAULT_STD_DEV);
        assert!(report.is_insufficient());
    }

    #[test]
    fn test_single_value_is_the_baseline() {
        let report = compute_statistics(&days(&[8]), &EngineConfig::default());
        assert_eq!(report.baseline(), 8.0);
        assert!(report.filtered.std_dev.is_finite());
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_constant_series_has_no_anomalies() {
        let report = compute_statistics(&days(&[10; 30]), &EngineConfig::default());
        assert!(report.anomalies.is_empty());
        assert_eq!(report.baseline(), 10.0);
        assert_eq!(report.degradations, vec![Degradation::ZeroVariance]);
    }

    #[test]
    fn test_spike_is_excluded() {
        let mut counts = vec![10; 40];
        counts[17] = 1000;
        let history = days(&counts);
        let report = compute_statistics(&history, &EngineConfig::default());

        assert_eq!(report.anomalies, vec![history[17].date]);
        assert_eq!(report.filtered.mean, 10.0);
        assert!(report.raw.mean > 30.0);
        assert!(report.is_anomaly(history[17].date));
    }
}
