//! # Demand Math
//!
//! Numeric building blocks for demand forecasting: descriptive statistics over
//! daily counts and an ordinary least-squares trend line. Everything here works on
//! plain `f64` slices so the forecasting crate can stay free of numeric detail.

use thiserror::Error;

pub mod descriptive;
pub mod regression;

pub use descriptive::{
    coefficient_of_variation, mean, median, percentile, sample_std_dev, sorted_copy,
};
pub use regression::LinearRegression;

/// Errors that can occur in demand calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for demand math operations
pub type Result<T> = std::result::Result<T, MathError>;
