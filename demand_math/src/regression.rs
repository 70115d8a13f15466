//! Least-squares trend fitting
//!
//! Fits `y = slope * x + intercept` where `x` is the chronological index of each
//! observation (0, 1, 2, ...). Used to estimate whether daily demand is drifting.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Linear Regression over a chronologically indexed series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    observations: usize,
    slope: f64,
    intercept: f64,
    y_mean: f64,
    r_squared: Option<f64>,
}

impl LinearRegression {
    /// Fit a regression line to the values, indexed 0..n
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(MathError::InsufficientData(format!(
                "Linear regression requires at least 2 points, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Values must be finite numbers".to_string(),
            ));
        }

        let n = values.len() as f64;

        // Calculate means
        let x_mean = (values.len() - 1) as f64 / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for (i, &y) in values.iter().enumerate() {
            let x = i as f64;
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        if denominator.abs() < 1e-10 {
            return Err(MathError::CalculationError(
                "Cannot calculate slope: x values are too similar".to_string(),
            ));
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;

        let mut ss_total = 0.0;
        let mut ss_residual = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let y_pred = slope * i as f64 + intercept;
            ss_total += (y - y_mean).powi(2);
            ss_residual += (y - y_pred).powi(2);
        }

        // A flat series has no variance to explain
        let r_squared = if ss_total.abs() < 1e-10 {
            None
        } else {
            Some(1.0 - ss_residual / ss_total)
        };

        Ok(Self {
            observations: values.len(),
            slope,
            intercept,
            y_mean,
            r_squared,
        })
    }

    /// Change in value per step of the index
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Fitted value at index 0
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Mean of the fitted values
    pub fn y_mean(&self) -> f64 {
        self.y_mean
    }

    /// Number of points the line was fitted on
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Coefficient of determination, `None` for a flat series
    pub fn r_squared(&self) -> Option<f64> {
        self.r_squared
    }

    /// Fitted value at an arbitrary index
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Predict the value n periods after the last observation
    pub fn forecast(&self, periods_ahead: usize) -> f64 {
        self.predict((self.observations + periods_ahead - 1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_line() {
        let values: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let fit = LinearRegression::fit(&values).unwrap();

        assert_relative_eq!(fit.slope(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.intercept(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.r_squared().unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.forecast(1), 23.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_series() {
        let fit = LinearRegression::fit(&[7.0; 12]).unwrap();
        assert_eq!(fit.slope(), 0.0);
        assert_eq!(fit.r_squared(), None);
        assert_eq!(fit.y_mean(), 7.0);
    }

    #[test]
    fn test_requires_two_points() {
        assert!(matches!(
            LinearRegression::fit(&[1.0]),
            Err(MathError::InsufficientData(_))
        ));
    }
}
