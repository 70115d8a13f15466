//! Descriptive statistics over daily observations
//!
//! Mean and standard deviation delegate to `statrs`; order statistics (median,
//! percentiles) are computed on a sorted copy with linear interpolation between
//! the closest ranks.

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Mean requires at least one value".to_string(),
        ));
    }
    check_finite(values)?;

    Ok(values.iter().mean())
}

/// Median of the values
pub fn median(values: &[f64]) -> Result<f64> {
    percentile(values, 50.0)
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample standard deviation requires at least 2 values, got {}",
            values.len()
        )));
    }
    check_finite(values)?;

    Ok(values.iter().std_dev())
}

/// Percentile `p` (0..=100) using linear interpolation between closest ranks
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Percentile requires at least one value".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(MathError::InvalidInput(format!(
            "Percentile must be within 0 and 100, got {}",
            p
        )));
    }
    check_finite(values)?;

    let sorted = sorted_copy(values);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return Ok(sorted[lower]);
    }

    let weight = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Coefficient of variation (`std_dev / mean`), `None` when the mean is not positive
pub fn coefficient_of_variation(mean: f64, std_dev: f64) -> Option<f64> {
    if mean > 0.0 && mean.is_finite() && std_dev.is_finite() {
        Some(std_dev / mean)
    } else {
        None
    }
}

/// Ascending copy of the values
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn check_finite(values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(MathError::InvalidInput(
            "Values must be finite numbers".to_string(),
        ))
    }
}
