//! Utility functions for the demand_forecast crate

use crate::error::{ForecastError, Result};
use crate::events::OrderEvent;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // Days with zero actual orders have no defined percentage error
    let nonzero: Vec<f64> = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .collect();
    let mape = if nonzero.is_empty() {
        None
    } else {
        Some(nonzero.iter().sum::<f64>() / nonzero.len() as f64)
    };

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let scale = a.abs() + f.abs();
            if scale == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / scale
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over days with orders
    pub mape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE:  {:.4}%", mape)?,
            None => writeln!(f, "  MAPE:  n/a")?,
        }
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

/// Shape of a generated order history
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticProfile {
    /// Mean orders on an ordinary day
    pub daily_mean: f64,
    /// Standard deviation of the daily count, 0 for an exact series
    pub noise: f64,
    /// Per-weekday scaling of `daily_mean`
    pub weekday_scale: [f64; 7],
    /// Customer ids cycled through the generated orders
    pub customers: usize,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            daily_mean: 10.0,
            noise: 0.0,
            weekday_scale: [1.0; 7],
            customers: 25,
        }
    }
}

impl SyntheticProfile {
    /// Constant daily volume
    pub fn constant(daily_mean: f64) -> Self {
        Self {
            daily_mean,
            ..Self::default()
        }
    }

    /// Scale one weekday
    pub fn with_weekday(mut self, weekday: Weekday, scale: f64) -> Self {
        self.weekday_scale[weekday.num_days_from_monday() as usize] = scale;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }
}

/// Reproducible order history: `days` consecutive days starting at `start`
pub fn synthetic_events(
    start: NaiveDate,
    days: usize,
    profile: &SyntheticProfile,
    seed: u64,
) -> Result<Vec<OrderEvent>> {
    let noise = Normal::new(0.0, profile.noise.max(0.0))
        .map_err(|e| ForecastError::InvalidParameter(format!("Invalid noise: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let customers = profile.customers.max(1);

    let mut events = Vec::new();
    let mut serial = 0usize;
    for offset in 0..days as i64 {
        let date = start + Duration::days(offset);
        let scale = profile.weekday_scale[date.weekday().num_days_from_monday() as usize];
        let expected = profile.daily_mean * scale;
        let count = if profile.noise > 0.0 {
            (expected + noise.sample(&mut rng)).round().max(0.0) as usize
        } else {
            expected.round().max(0.0) as usize
        };

        for _ in 0..count {
            let customer = format!("c{:03}", rng.gen_range(0..customers));
            let units = rng.gen_range(1..=3u32);
            events.push(
                OrderEvent::new(&format!("syn-{}", serial), date, Some(&customer))
                    .with_units(units, Decimal::from(units) * Decimal::from(2000)),
            );
            serial += 1;
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use approx::assert_relative_eq;

    #[test]
    fn test_accuracy_metrics() {
        let accuracy = forecast_accuracy(&[10.0, 12.0], &[10.0, 8.0]).unwrap();
        assert_relative_eq!(accuracy.mae, 2.0);
        assert_relative_eq!(accuracy.rmse, 8.0_f64.sqrt());
        assert_relative_eq!(accuracy.mape.unwrap(), 25.0);
    }

    #[test]
    fn test_accuracy_requires_matching_lengths() {
        assert!(forecast_accuracy(&[1.0], &[]).is_err());
        assert!(forecast_accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_zero_actuals_have_no_mape() {
        let accuracy = forecast_accuracy(&[0.0, 0.0], &[0.0, 0.0]).unwrap();
        assert_eq!(accuracy.mape, None);
        assert_eq!(accuracy.smape, 0.0);
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let profile = SyntheticProfile::constant(10.0).with_noise(2.0);
        let a = synthetic_events(start, 20, &profile, 7).unwrap();
        let b = synthetic_events(start, 20, &profile, 7).unwrap();
        assert_eq!(a, b);

        let exact = synthetic_events(start, 20, &SyntheticProfile::constant(10.0), 7).unwrap();
        assert!(aggregate(&exact, None).iter().all(|d| d.order_count == 10));
    }
}
