//! Tracking of issued forecasts against the volumes that actually happened
//!
//! The tracker is an in-memory ledger. It serializes with serde so the host can
//! persist it wherever it likes.

use crate::composer::ForecastResult;
use crate::error::Result;
use crate::validation::{error_percent, QualityBucket};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Verified predictions needed before the tracker's metrics are trusted
const MIN_VERIFIED: usize = 10;

/// A forecast as recorded, plus its outcome once known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPrediction {
    pub date: NaiveDate,
    pub segment: Option<String>,
    pub predicted: u32,
    pub confidence_percent: u32,
    pub actual: Option<u32>,
    pub error_percent: Option<f64>,
    pub quality: Option<QualityBucket>,
    pub effectiveness: Option<f64>,
}

impl TrackedPrediction {
    pub fn is_verified(&self) -> bool {
        self.actual.is_some()
    }
}

/// Aggregate view over every tracked prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerMetrics {
    pub total: usize,
    pub verified: usize,
    pub pending: usize,
    pub mean_error_percent: Option<f64>,
    pub mean_effectiveness: Option<f64>,
    pub counts_by_quality: BTreeMap<QualityBucket, usize>,
    /// Share of verified predictions per bucket, in percent
    pub percent_by_quality: BTreeMap<QualityBucket, f64>,
}

/// Guidance derived from the tracked record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    LowEffectiveness,
    ManyPoorPredictions,
    NeedMoreData,
    PerformingWell,
    Stable,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::LowEffectiveness => "Effectiveness is below 50%; review the factor configuration",
            Advisory::ManyPoorPredictions => "More than 30% of predictions are poor; check for unusual demand",
            Advisory::NeedMoreData => "Fewer than 10 verified predictions; keep recording actuals",
            Advisory::PerformingWell => "Forecasts are performing well",
            Advisory::Stable => "Forecast quality is stable",
        }
    }
}

/// Ledger of forecasts and their outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionTracker {
    predictions: Vec<TrackedPrediction>,
}

impl PredictionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn predictions(&self) -> &[TrackedPrediction] {
        &self.predictions
    }

    /// Record a forecast, replacing any earlier one for the same date and segment
    pub fn record_prediction(&mut self, forecast: &ForecastResult) {
        let tracked = TrackedPrediction {
            date: forecast.target_date,
            segment: forecast.segment.clone(),
            predicted: forecast.point_estimate,
            confidence_percent: forecast.confidence_percent,
            actual: None,
            error_percent: None,
            quality: None,
            effectiveness: None,
        };

        match self
            .predictions
            .iter_mut()
            .find(|p| p.date == tracked.date && p.segment == tracked.segment)
        {
            Some(existing) => *existing = tracked,
            None => self.predictions.push(tracked),
        }
    }

    /// Verify every prediction for the date; returns how many were verified
    pub fn record_actual(&mut self, date: NaiveDate, actual: u32) -> usize {
        let mut verified = 0;

        for prediction in self.predictions.iter_mut().filter(|p| p.date == date) {
            let error = error_percent(f64::from(prediction.predicted), f64::from(actual));
            let quality = QualityBucket::classify(error);

            prediction.actual = Some(actual);
            prediction.error_percent = Some(error);
            prediction.quality = Some(quality);
            prediction.effectiveness = Some(quality.effectiveness_score());
            verified += 1;
        }

        debug!(%date, actual, verified, "recorded actual demand");
        verified
    }

    pub fn metrics(&self) -> TrackerMetrics {
        let verified: Vec<&TrackedPrediction> =
            self.predictions.iter().filter(|p| p.is_verified()).collect();

        let mut counts_by_quality: BTreeMap<QualityBucket, usize> =
            QualityBucket::ALL.iter().map(|b| (*b, 0)).collect();
        for quality in verified.iter().filter_map(|p| p.quality) {
            *counts_by_quality.entry(quality).or_insert(0) += 1;
        }

        let percent_by_quality = counts_by_quality
            .iter()
            .map(|(bucket, count)| {
                let share = if verified.is_empty() {
                    0.0
                } else {
                    *count as f64 / verified.len() as f64 * 100.0
                };
                (*bucket, share)
            })
            .collect();

        TrackerMetrics {
            total: self.predictions.len(),
            verified: verified.len(),
            pending: self.predictions.len() - verified.len(),
            mean_error_percent: mean_of(verified.iter().filter_map(|p| p.error_percent)),
            mean_effectiveness: mean_of(verified.iter().filter_map(|p| p.effectiveness)),
            counts_by_quality,
            percent_by_quality,
        }
    }

    /// The `n` most recent predictions by date, newest first
    pub fn recent(&self, n: usize) -> Vec<&TrackedPrediction> {
        let mut sorted: Vec<&TrackedPrediction> = self.predictions.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted.truncate(n);
        sorted
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        let metrics = self.metrics();
        if metrics.verified == 0 {
            return vec![Advisory::NeedMoreData];
        }

        let mut advisories = Vec::new();
        let effectiveness = metrics.mean_effectiveness.unwrap_or(0.0);

        if effectiveness < 50.0 {
            advisories.push(Advisory::LowEffectiveness);
        }
        if metrics.percent_by_quality.get(&QualityBucket::Poor).copied().unwrap_or(0.0) > 30.0 {
            advisories.push(Advisory::ManyPoorPredictions);
        }
        if metrics.verified < MIN_VERIFIED {
            advisories.push(Advisory::NeedMoreData);
        }
        if effectiveness > 70.0 {
            advisories.push(Advisory::PerformingWell);
        }
        if advisories.is_empty() {
            advisories.push(Advisory::Stable);
        }

        advisories
    }
}

fn mean_of<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
