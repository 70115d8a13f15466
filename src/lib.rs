//! # Order Demand
//!
//! `order_demand` bundles the demand forecasting engine and its numeric helpers.
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use order_demand::prelude::*;
//!
//! let records: Vec<RawOrderRecord> = (1..=28)
//!     .map(|day| RawOrderRecord::new(&format!("{:02}-02-2024", day), "2000"))
//!     .collect();
//!
//! let target = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
//! let forecast = forecast_from_records(&records, target, None).unwrap();
//! assert_eq!(forecast.point_estimate, 1);
//! ```

pub use demand_forecast;
pub use demand_math;

use chrono::{NaiveDate, Utc};
use demand_forecast::{DemandEngine, EngineConfig, ForecastResult, RawOrderRecord, Result};

/// Commonly used types from both crates
pub mod prelude {
    pub use crate::forecast_from_records;
    pub use demand_forecast::{
        DemandEngine, EngineConfig, FactorDimension, ForecastError, ForecastResult, OrderEvent,
        Preset, RawOrderRecord, ValidationReport,
    };
    pub use demand_math::{mean, median, percentile, LinearRegression};
}

/// One-shot forecast from raw records with the default configuration.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use order_demand::forecast_from_records;
///
/// let target = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
/// let forecast = forecast_from_records(&[], target, None).unwrap();
/// assert!(forecast.point_estimate > 0);
/// ```
pub fn forecast_from_records(
    records: &[RawOrderRecord],
    target: NaiveDate,
    segment: Option<&str>,
) -> Result<ForecastResult> {
    let mut engine = DemandEngine::new(EngineConfig::default())?;
    engine.ingest(records);
    Ok(engine.forecast(target, segment, Utc::now()))
}
