//! Demand engine: the normalized history, its configuration and one calibration cache

use crate::aggregate::aggregate;
use crate::cache::{CacheState, Calibration, RecalibrationCache};
use crate::composer::{self, ForecastResult, HorizonForecast};
use crate::config::{EngineConfig, Preset};
use crate::error::Result;
use crate::events::{NormalizeReport, Normalizer, OrderEvent, RawOrderRecord};
use crate::statistics::StatisticsReport;
use crate::validation::{self, ValidationReport};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

/// Forecasting pipeline over one order history
#[derive(Debug)]
pub struct DemandEngine {
    config: EngineConfig,
    events: Vec<OrderEvent>,
    cache: RecalibrationCache,
}

impl DemandEngine {
    /// Create an engine with a validated configuration and no history
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: RecalibrationCache::new(config.clone()),
            config,
            events: Vec::new(),
        })
    }

    pub fn with_preset(preset: Preset) -> Result<Self> {
        Self::new(EngineConfig::preset(preset))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// Normalize raw records and make them the history; the cache is invalidated
    pub fn ingest(&mut self, records: &[RawOrderRecord]) -> NormalizeReport {
        let report = Normalizer::from_config(&self.config).normalize(records);
        info!(
            events = report.events.len(),
            skipped = report.skipped.len(),
            duplicates = report.duplicates_dropped,
            "ingested order records"
        );
        self.replace_events(report.events.clone());
        report
    }

    /// Replace the history with already-normalized events
    pub fn replace_events(&mut self, events: Vec<OrderEvent>) {
        self.events = events;
        self.cache.invalidate();
    }

    /// Current calibration, recomputed if stale at `now`
    pub fn calibration(&self, now: DateTime<Utc>) -> Arc<Calibration> {
        self.cache.get_or_refresh(&self.events, now)
    }

    pub fn forecast(
        &self,
        target_date: NaiveDate,
        segment: Option<&str>,
        now: DateTime<Utc>,
    ) -> ForecastResult {
        let calibration = self.calibration(now);
        composer::forecast(
            target_date,
            segment,
            &calibration.statistics,
            &calibration.factors,
            &self.config,
        )
    }

    pub fn forecast_horizon(
        &self,
        start: NaiveDate,
        days: usize,
        segment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<HorizonForecast> {
        let calibration = self.calibration(now);
        composer::forecast_horizon(
            start,
            days,
            segment,
            &calibration.statistics,
            &calibration.factors,
            &self.config,
        )
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> StatisticsReport {
        self.calibration(now).statistics.clone()
    }

    /// Backtest over the whole history, bypassing the cache
    pub fn validate(&self, test_days: usize) -> Result<ValidationReport> {
        let history = aggregate(&self.events, None);
        validation::validate(&history, test_days, &self.config)
    }

    pub fn cache_state(&self, now: DateTime<Utc>) -> CacheState {
        self.cache.state(now)
    }
}
