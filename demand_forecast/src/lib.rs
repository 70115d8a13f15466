//! # Demand Forecast
//!
//! Explainable forecasting of daily order volume for a small delivery business.
//!
//! ## Features
//!
//! - Normalization of raw order records (mixed date formats, string prices)
//! - Daily aggregation of order counts, units and revenue
//! - Robust statistics with anomaly exclusion and documented fallbacks
//! - Multiplicative factors: day of week, month/season, week of month, trend,
//!   client segment and calendar events
//! - Point forecasts with an interval, a confidence score and a factor breakdown
//! - A time-boxed recalibration cache
//! - Backtesting on a chronological train/test split and a prediction tracker
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{NaiveDate, Utc};
//! use demand_forecast::{DemandEngine, Preset, RawOrderRecord};
//!
//! let mut engine = DemandEngine::with_preset(Preset::Standard)?;
//! engine.ingest(&[
//!     RawOrderRecord::new("01-03-2024", "4000").with_customer("c1"),
//!     RawOrderRecord::new("02-03-2024", "2000").with_customer("c2"),
//! ]);
//!
//! let target = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//! let forecast = engine.forecast(target, None, Utc::now());
//! assert!(forecast.interval.low <= forecast.interval.high);
//! # Ok::<(), demand_forecast::ForecastError>(())
//! ```

pub mod aggregate;
pub mod cache;
pub mod calendar;
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod factors;
pub mod loader;
pub mod segments;
pub mod statistics;
pub mod tracker;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use crate::aggregate::{aggregate, DailyAggregate, DateWindow};
pub use crate::cache::{CacheEntry, CacheState, Calibration, RecalibrationCache};
pub use crate::calendar::{CalendarEvent, Season};
pub use crate::composer::{forecast, forecast_horizon, ForecastResult, HorizonDirection, HorizonForecast};
pub use crate::config::{EngineConfig, Preset};
pub use crate::engine::DemandEngine;
pub use crate::error::{ForecastError, RecordError, Result};
pub use crate::events::{normalize, NormalizeReport, Normalizer, OrderEvent, RawOrderRecord};
pub use crate::factors::{compute_factors, FactorDimension, FactorSet};
pub use crate::loader::RecordLoader;
pub use crate::statistics::{compute_statistics, Degradation, StatisticsReport};
pub use crate::tracker::{Advisory, PredictionTracker};
pub use crate::validation::{validate, QualityBucket, ValidationReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
