//! Backtesting on a chronological train/test split

use crate::aggregate::{sorted_by_date, DailyAggregate, DateWindow};
use crate::composer::forecast;
use crate::config::EngineConfig;
use crate::error::{ForecastError, Result};
use crate::factors::compute_factors_with;
use crate::statistics::compute_statistics;
use crate::utils::{forecast_accuracy, ForecastAccuracy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Quality of a single prediction by its percentage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBucket {
    /// Error of at most 15%
    Excellent,
    /// Error of at most 30%
    Good,
    /// Error of at most 50%
    Acceptable,
    Poor,
}

impl QualityBucket {
    pub const ALL: [QualityBucket; 4] = [
        QualityBucket::Excellent,
        QualityBucket::Good,
        QualityBucket::Acceptable,
        QualityBucket::Poor,
    ];

    pub fn classify(error_percent: f64) -> Self {
        if error_percent <= 15.0 {
            QualityBucket::Excellent
        } else if error_percent <= 30.0 {
            QualityBucket::Good
        } else if error_percent <= 50.0 {
            QualityBucket::Acceptable
        } else {
            QualityBucket::Poor
        }
    }

    /// Effectiveness score given to a prediction in this bucket
    pub fn effectiveness_score(&self) -> f64 {
        match self {
            QualityBucket::Excellent => 100.0,
            QualityBucket::Good => 75.0,
            QualityBucket::Acceptable => 50.0,
            QualityBucket::Poor => 25.0,
        }
    }
}

impl std::fmt::Display for QualityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QualityBucket::Excellent => "excellent",
            QualityBucket::Good => "good",
            QualityBucket::Acceptable => "acceptable",
            QualityBucket::Poor => "poor",
        };
        f.pad(name)
    }
}

/// `|predicted - actual| / actual` in percent; a zero actual is 100% unless the prediction is also zero
pub fn error_percent(predicted: f64, actual: f64) -> f64 {
    if actual == 0.0 {
        if predicted > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (predicted - actual).abs() / actual * 100.0
    }
}

/// One backtested date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayValidation {
    pub date: NaiveDate,
    pub predicted: u32,
    pub actual: u32,
    pub error_percent: f64,
    pub quality: QualityBucket,
}

/// Outcome of a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub train_window: DateWindow,
    pub test_window: DateWindow,
    pub per_day: Vec<DayValidation>,
    /// Every bucket is present, possibly with a zero count
    pub counts_by_quality: BTreeMap<QualityBucket, usize>,
    /// Share of test days that were excellent or good
    pub overall_effectiveness_percent: f64,
    pub mean_error_percent: f64,
    pub accuracy: ForecastAccuracy,
}

impl ValidationReport {
    pub fn count(&self, bucket: QualityBucket) -> usize {
        self.counts_by_quality.get(&bucket).copied().unwrap_or(0)
    }
}

/// Fit on all but the last `test_days` dates and score forecasts for those dates
pub fn validate(
    history: &[DailyAggregate],
    test_days: usize,
    config: &EngineConfig,
) -> Result<ValidationReport> {
    if test_days == 0 {
        return Err(ForecastError::InvalidParameter(
            "test_days must be at least 1".to_string(),
        ));
    }

    let days = sorted_by_date(history);
    if days.len() < test_days + 1 {
        return Err(ForecastError::InsufficientData {
            required: test_days + 1,
            available: days.len(),
        });
    }

    let (train, test) = days.split_at(days.len() - test_days);
    let train_window = DateWindow::new(train[0].date, train[train.len() - 1].date)?;
    let test_window = DateWindow::new(test[0].date, test[test.len() - 1].date)?;

    let statistics = compute_statistics(train, config);
    let factors = compute_factors_with(train, &[], &statistics, config);

    let mut per_day = Vec::with_capacity(test.len());
    let mut counts_by_quality: BTreeMap<QualityBucket, usize> =
        QualityBucket::ALL.iter().map(|b| (*b, 0)).collect();

    for day in test {
        let predicted = forecast(day.date, None, &statistics, &factors, config).point_estimate;
        let error = error_percent(f64::from(predicted), f64::from(day.order_count));
        let quality = QualityBucket::classify(error);
        *counts_by_quality.entry(quality).or_insert(0) += 1;

        per_day.push(DayValidation {
            date: day.date,
            predicted,
            actual: day.order_count,
            error_percent: error,
            quality,
        });
    }

    let hits = counts_by_quality[&QualityBucket::Excellent] + counts_by_quality[&QualityBucket::Good];
    let overall_effectiveness_percent = hits as f64 / test_days as f64 * 100.0;
    let mean_error_percent =
        per_day.iter().map(|d| d.error_percent).sum::<f64>() / per_day.len() as f64;

    let predicted: Vec<f64> = per_day.iter().map(|d| f64::from(d.predicted)).collect();
    let actual: Vec<f64> = per_day.iter().map(|d| f64::from(d.actual)).collect();
    let accuracy = forecast_accuracy(&predicted, &actual)?;

    info!(
        train_days = train.len(),
        test_days,
        effectiveness = overall_effectiveness_percent,
        mean_error = mean_error_percent,
        "backtest complete"
    );

    Ok(ValidationReport {
        train_window,
        test_window,
        per_day,
        counts_by_quality,
        overall_effectiveness_percent,
        mean_error_percent,
        accuracy,
    })
}
