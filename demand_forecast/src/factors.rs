//! Multiplicative demand factors derived from the filtered history
//!
//! Each categorical multiplier is the mean daily order count of the days in that
//! category divided by the mean over the whole filtered window, so the
//! day-weighted average of a dimension is 1.0. Categories never observed are
//! neutral (1.0).

use crate::aggregate::{sorted_by_date, DailyAggregate};
use crate::calendar::{event_for, week_of_month, CalendarEvent, Season};
use crate::config::EngineConfig;
use crate::events::OrderEvent;
use crate::segments::resolve_labels;
use crate::statistics::{compute_statistics, StatisticsReport};
use chrono::{Datelike, NaiveDate};
use demand_math::{mean, LinearRegression};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// The dimensions a forecast can be scaled along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorDimension {
    DayOfWeek,
    Month,
    Season,
    WeekOfMonth,
    Trend,
    ClientSegment,
    CalendarEvent,
    Safety,
}

impl std::fmt::Display for FactorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FactorDimension::DayOfWeek => "day_of_week",
            FactorDimension::Month => "month",
            FactorDimension::Season => "season",
            FactorDimension::WeekOfMonth => "week_of_month",
            FactorDimension::Trend => "trend",
            FactorDimension::ClientSegment => "client_segment",
            FactorDimension::CalendarEvent => "calendar_event",
            FactorDimension::Safety => "safety",
        };
        f.pad(name)
    }
}

/// How often each category was observed, used to weight multipliers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub day_of_week: BTreeMap<u32, usize>,
    pub month: BTreeMap<u32, usize>,
    pub season: BTreeMap<Season, usize>,
    pub week_of_month: BTreeMap<u32, usize>,
    /// Distinct customers per segment
    pub client_segment: BTreeMap<String, usize>,
}

/// Multipliers per dimension and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSet {
    /// Keyed by days from Monday (0 = Monday, 6 = Sunday)
    pub day_of_week: BTreeMap<u32, f64>,
    /// Keyed by calendar month (1-12)
    pub month: BTreeMap<u32, f64>,
    pub season: BTreeMap<Season, f64>,
    /// Empty unless the week-of-month factor is enabled
    pub week_of_month: BTreeMap<u32, f64>,
    pub client_segment: BTreeMap<String, f64>,
    pub trend: f64,
    pub calendar_event: Vec<CalendarEvent>,
    pub weights: CategoryWeights,
    /// Filtered days the factors were derived from
    pub observed_days: usize,
}

impl FactorSet {
    /// All multipliers neutral
    pub fn neutral(calendar_event: Vec<CalendarEvent>) -> Self {
        Self {
            day_of_week: BTreeMap::new(),
            month: BTreeMap::new(),
            season: BTreeMap::new(),
            week_of_month: BTreeMap::new(),
            client_segment: BTreeMap::new(),
            trend: 1.0,
            calendar_event,
            weights: CategoryWeights::default(),
            observed_days: 0,
        }
    }

    pub fn day_of_week_multiplier(&self, date: NaiveDate) -> f64 {
        lookup(&self.day_of_week, &date.weekday().num_days_from_monday())
    }

    /// Month multiplier, or `None` when the month was never observed
    pub fn month_multiplier(&self, date: NaiveDate) -> Option<f64> {
        self.month.get(&date.month()).copied()
    }

    pub fn season_multiplier(&self, date: NaiveDate) -> Option<f64> {
        self.season.get(&Season::of(date)).copied()
    }

    pub fn week_of_month_multiplier(&self, date: NaiveDate) -> f64 {
        lookup(&self.week_of_month, &week_of_month(date))
    }

    /// Segment multiplier, or `None` for an unknown segment
    pub fn segment_multiplier(&self, segment: &str) -> Option<f64> {
        self.client_segment.get(&segment.to_lowercase()).copied()
    }

    /// Calendar event falling on the date, if any
    pub fn calendar_event_for(&self, date: NaiveDate) -> Option<&CalendarEvent> {
        event_for(&self.calendar_event, date)
    }

    /// Observation-weighted mean multiplier of a categorical dimension
    pub fn weighted_mean(&self, dimension: FactorDimension) -> Option<f64> {
        match dimension {
            FactorDimension::DayOfWeek => {
                weighted(&self.day_of_week, &self.weights.day_of_week)
            }
            FactorDimension::Month => weighted(&self.month, &self.weights.month),
            FactorDimension::Season => weighted(&self.season, &self.weights.season),
            FactorDimension::WeekOfMonth => {
                weighted(&self.week_of_month, &self.weights.week_of_month)
            }
            FactorDimension::ClientSegment => {
                weighted(&self.client_segment, &self.weights.client_segment)
            }
            FactorDimension::Trend | FactorDimension::CalendarEvent | FactorDimension::Safety => {
                None
            }
        }
    }
}

/// Derive factors from the aggregates; anomalous days are excluded first
pub fn compute_factors(
    aggregates: &[DailyAggregate],
    events: &[OrderEvent],
    config: &EngineConfig,
) -> FactorSet {
    let statistics = compute_statistics(aggregates, config);
    compute_factors_with(aggregates, events, &statistics, config)
}

/// Derive factors using statistics already computed over the same aggregates
pub fn compute_factors_with(
    aggregates: &[DailyAggregate],
    events: &[OrderEvent],
    statistics: &StatisticsReport,
    config: &EngineConfig,
) -> FactorSet {
    let filtered: Vec<DailyAggregate> = sorted_by_date(aggregates)
        .into_iter()
        .filter(|day| !statistics.is_anomaly(day.date))
        .collect();

    if filtered.len() < config.min_observations.max(3) {
        debug!(days = filtered.len(), "too few filtered days, factors are neutral");
        return FactorSet::neutral(config.calendar_events.clone());
    }

    let counts: Vec<f64> = filtered.iter().map(|d| f64::from(d.order_count)).collect();
    let overall = match mean(&counts) {
        Ok(m) if m > 0.0 => m,
        _ => {
            debug!("filtered window has no orders, factors are neutral");
            return FactorSet::neutral(config.calendar_events.clone());
        }
    };

    let (day_of_week, dow_weights) =
        category_multipliers(&filtered, overall, |d| d.weekday().num_days_from_monday());
    let (month, month_weights) = category_multipliers(&filtered, overall, |d| d.month());
    let (season, season_weights) = category_multipliers(&filtered, overall, Season::of);
    let (week_of_month, wom_weights) = if config.week_of_month_factor {
        category_multipliers(&filtered, overall, week_of_month)
    } else {
        (BTreeMap::new(), BTreeMap::new())
    };

    let trend = trend_multiplier(&counts, overall, config);

    let filtered_dates: HashSet<NaiveDate> = filtered.iter().map(|d| d.date).collect();
    let window_events: Vec<OrderEvent> = events
        .iter()
        .filter(|e| filtered_dates.contains(&e.date))
        .cloned()
        .collect();
    let (client_segment, segment_weights) = segment_multipliers(&window_events);

    debug!(
        days = filtered.len(),
        baseline_mean = overall,
        trend,
        segments = client_segment.len(),
        "computed demand factors"
    );

    FactorSet {
        day_of_week,
        month,
        season,
        week_of_month,
        client_segment,
        trend,
        calendar_event: config.calendar_events.clone(),
        weights: CategoryWeights {
            day_of_week: dow_weights,
            month: month_weights,
            season: season_weights,
            week_of_month: wom_weights,
            client_segment: segment_weights,
        },
        observed_days: filtered.len(),
    }
}

/// Mean count per category divided by the overall mean, plus days per category
fn category_multipliers<K, F>(
    days: &[DailyAggregate],
    overall: f64,
    key: F,
) -> (BTreeMap<K, f64>, BTreeMap<K, usize>)
where
    K: Ord + Copy,
    F: Fn(NaiveDate) -> K,
{
    let mut grouped: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for day in days {
        grouped
            .entry(key(day.date))
            .or_default()
            .push(f64::from(day.order_count));
    }

    let mut multipliers = BTreeMap::new();
    let mut weights = BTreeMap::new();
    for (category, counts) in grouped {
        let multiplier = mean(&counts).map(|m| m / overall).unwrap_or(1.0);
        multipliers.insert(category, multiplier);
        weights.insert(category, counts.len());
    }

    (multipliers, weights)
}

/// `1 + slope / mean`, clamped; neutral with too little history
fn trend_multiplier(counts: &[f64], overall: f64, config: &EngineConfig) -> f64 {
    if counts.len() < config.trend_min_days {
        return 1.0;
    }

    let Ok(fit) = LinearRegression::fit(counts) else {
        return 1.0;
    };
    let (low, high) = config.trend_clamp;
    let raw = 1.0 + fit.slope() / overall;

    debug!(slope = fit.slope(), r_squared = ?fit.r_squared(), raw, "trend fit");
    raw.clamp(low, high)
}

/// Orders per customer in each segment relative to orders per customer overall
fn segment_multipliers(events: &[OrderEvent]) -> (BTreeMap<String, f64>, BTreeMap<String, usize>) {
    let labels = resolve_labels(events);

    let mut per_segment: BTreeMap<String, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for (event, label) in events.iter().zip(labels) {
        let Some(customer) = event.customer_id.as_deref() else {
            continue;
        };
        let entry = per_segment.entry(label).or_default();
        entry.0 += 1;
        entry.1.insert(customer);
    }

    let total_orders: usize = per_segment.values().map(|(orders, _)| orders).sum();
    let total_customers: usize = per_segment.values().map(|(_, c)| c.len()).sum();
    if total_orders == 0 || total_customers == 0 {
        return (BTreeMap::new(), BTreeMap::new());
    }
    let overall_rate = total_orders as f64 / total_customers as f64;

    let mut multipliers = BTreeMap::new();
    let mut weights = BTreeMap::new();
    for (label, (orders, customers)) in per_segment {
        let rate = orders as f64 / customers.len() as f64;
        multipliers.insert(label.clone(), rate / overall_rate);
        weights.insert(label, customers.len());
    }

    (multipliers, weights)
}

fn lookup<K: Ord>(map: &BTreeMap<K, f64>, key: &K) -> f64 {
    map.get(key).copied().unwrap_or(1.0)
}

fn weighted<K: Ord>(multipliers: &BTreeMap<K, f64>, weights: &BTreeMap<K, usize>) -> Option<f64> {
    let total: usize = weights.values().sum();
    if total == 0 {
        return None;
    }

    let sum: f64 = multipliers
        .iter()
        .map(|(k, m)| m * weights.get(k).copied().unwrap_or(0) as f64)
        .sum();
    Some(sum / total as f64)
}
