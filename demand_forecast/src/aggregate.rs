//! Daily aggregation of order events

use crate::error::{ForecastError, Result};
use crate::events::OrderEvent;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ForecastError::InvalidParameter(format!(
                "Window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending at (and including) `end`
    ///
    /// A window reaching past the earliest representable date starts there.
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        let span = days.max(1) - 1;
        let start = Duration::try_days(span)
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Smallest window covering every date, `None` when there are none
    pub fn spanning<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<Self> {
        let mut iter = dates.into_iter();
        let first = iter.next()?;
        let (start, end) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the window
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Order totals for one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub order_count: u32,
    pub unit_count: u64,
    pub revenue: Decimal,
}

impl DailyAggregate {
    /// Aggregate carrying only an order count
    pub fn with_orders(date: NaiveDate, order_count: u32) -> Self {
        Self {
            date,
            order_count,
            unit_count: 0,
            revenue: Decimal::ZERO,
        }
    }
}

/// Group events by date, keeping only dates inside the window (all dates when `None`).
///
/// Dates without events are absent rather than zero-filled. The output is sorted
/// by date, whatever the input order.
pub fn aggregate(events: &[OrderEvent], window: Option<DateWindow>) -> Vec<DailyAggregate> {
    let mut by_date: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();

    for event in events {
        if let Some(window) = window {
            if !window.contains(event.date) {
                continue;
            }
        }

        let day = by_date
            .entry(event.date)
            .or_insert_with(|| DailyAggregate::with_orders(event.date, 0));
        day.order_count += 1;
        day.unit_count += u64::from(event.unit_count);
        day.revenue += event.revenue;
    }

    by_date.into_values().collect()
}

/// Order counts as floats, in the order given
pub fn order_counts(aggregates: &[DailyAggregate]) -> Vec<f64> {
    aggregates.iter().map(|a| f64::from(a.order_count)).collect()
}

/// Copy of the aggregates sorted by date with repeated dates merged
pub fn sorted_by_date(aggregates: &[DailyAggregate]) -> Vec<DailyAggregate> {
    let mut by_date: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();
    for day in aggregates {
        by_date
            .entry(day.date)
            .and_modify(|existing| {
                existing.order_count += day.order_count;
                existing.unit_count += day.unit_count;
                existing.revenue += day.revenue;
            })
            .or_insert_with(|| day.clone());
    }
    by_date.into_values().collect()
}
