//! Time-boxed recalibration cache
//!
//! Holds one calibration (statistics plus factors over a trailing window). Once
//! `refresh_interval` has passed since it was computed the entry is stale and is
//! recomputed, under the lock, by the next request that needs it.

use crate::aggregate::{aggregate, DailyAggregate, DateWindow};
use crate::config::EngineConfig;
use crate::events::OrderEvent;
use crate::factors::{compute_factors_with, FactorSet};
use crate::statistics::{compute_statistics, StatisticsReport};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Whether a cached calibration may still be served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Fresh,
    Stale,
}

/// Everything derived from one window of history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Trailing window the calibration covers, `None` without history
    pub window: Option<DateWindow>,
    pub aggregates: Vec<DailyAggregate>,
    pub statistics: StatisticsReport,
    pub factors: FactorSet,
}

impl Calibration {
    /// Calibrate on the trailing window ending at the latest event
    pub fn compute(events: &[OrderEvent], config: &EngineConfig) -> Self {
        let window = DateWindow::spanning(events.iter().map(|e| e.date))
            .map(|span| DateWindow::trailing(span.end, config.trailing_window_days));

        let aggregates = aggregate(events, window);
        let statistics = compute_statistics(&aggregates, config);
        let factors = compute_factors_with(&aggregates, events, &statistics, config);

        Self {
            window,
            aggregates,
            statistics,
            factors,
        }
    }
}

/// A calibration with the time it was computed
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub calibration: Arc<Calibration>,
    pub computed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Stale once strictly more than `refresh_interval` has elapsed
    pub fn state(&self, now: DateTime<Utc>, config: &EngineConfig) -> CacheState {
        if now - self.computed_at > config.refresh_interval() {
            CacheState::Stale
        } else {
            CacheState::Fresh
        }
    }
}

#[derive(Debug, Default)]
struct CacheSlot {
    entry: Option<CacheEntry>,
    refreshes: u64,
}

/// Process-lifetime cache of the latest calibration
#[derive(Debug)]
pub struct RecalibrationCache {
    config: EngineConfig,
    slot: Mutex<CacheSlot>,
}

impl RecalibrationCache {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// State at `now`; an empty cache is stale
    pub fn state(&self, now: DateTime<Utc>) -> CacheState {
        match &self.slot.lock().entry {
            Some(entry) => entry.state(now, &self.config),
            None => CacheState::Stale,
        }
    }

    /// Snapshot of the current entry
    pub fn entry(&self) -> Option<CacheEntry> {
        self.slot.lock().entry.clone()
    }

    /// Number of recomputations performed so far
    pub fn refresh_count(&self) -> u64 {
        self.slot.lock().refreshes
    }

    /// The cached calibration, recomputed first if it is stale
    pub fn get_or_refresh(&self, events: &[OrderEvent], now: DateTime<Utc>) -> Arc<Calibration> {
        let mut slot = self.slot.lock();

        if let Some(entry) = &slot.entry {
            if entry.state(now, &self.config) == CacheState::Fresh {
                debug!(computed_at = %entry.computed_at, "calibration cache hit");
                return Arc::clone(&entry.calibration);
            }
        }

        self.recompute(&mut slot, events, now)
    }

    /// Recompute regardless of staleness
    pub fn refresh(&self, events: &[OrderEvent], now: DateTime<Utc>) -> Arc<Calibration> {
        let mut slot = self.slot.lock();
        self.recompute(&mut slot, events, now)
    }

    /// Drop the cached entry so the next request recomputes
    pub fn invalidate(&self) {
        self.slot.lock().entry = None;
    }

    fn recompute(
        &self,
        slot: &mut CacheSlot,
        events: &[OrderEvent],
        now: DateTime<Utc>,
    ) -> Arc<Calibration> {
        let calibration = Arc::new(Calibration::compute(events, &self.config));
        slot.refreshes += 1;

        info!(
            days = calibration.aggregates.len(),
            anomalies = calibration.statistics.anomalies.len(),
            refreshes = slot.refreshes,
            "recalibrated demand factors"
        );

        slot.entry = Some(CacheEntry {
            calibration: Arc::clone(&calibration),
            computed_at: now,
        });
        calibration
    }
}
