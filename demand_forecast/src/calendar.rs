//! Calendar helpers: known demand-shifting dates, seasons and week-of-month

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A recurring date with a fixed demand multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub name: String,
    pub month: u32,
    pub day: u32,
    pub multiplier: f64,
}

impl CalendarEvent {
    pub fn new(name: &str, month: u32, day: u32, multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            month,
            day,
            multiplier,
        }
    }

    /// Whether the event falls on this date in any year
    pub fn matches(&self, date: NaiveDate) -> bool {
        self.month == date.month() && self.day == date.day()
    }
}

/// Holidays and local festivals observed to move demand
pub fn default_events() -> Vec<CalendarEvent> {
    vec![
        CalendarEvent::new("New Year's Day", 1, 1, 0.6),
        CalendarEvent::new("Labour Day", 5, 1, 0.9),
        CalendarEvent::new("National Holidays", 9, 18, 1.2),
        CalendarEvent::new("Army Day", 9, 19, 0.7),
        CalendarEvent::new("Christmas", 12, 25, 0.8),
        CalendarEvent::new("New Year's Eve", 12, 31, 0.7),
    ]
}

/// First event matching the date
pub fn event_for(events: &[CalendarEvent], date: NaiveDate) -> Option<&CalendarEvent> {
    events.iter().find(|event| event.matches(date))
}

/// Coarse season bucket used when monthly history is sparse (southern hemisphere)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    pub fn of(date: NaiveDate) -> Self {
        Self::of_month(date.month())
    }

    pub fn of_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Summer,
            3..=5 => Season::Autumn,
            6..=8 => Season::Winter,
            _ => Season::Spring,
        }
    }
}

/// Week of the month, 1 for days 1-7 up to 5 for days 29-31
pub fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}
