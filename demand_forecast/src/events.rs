//! Order events and the normalizer that produces them from raw feed records

use crate::config::EngineConfig;
use crate::error::RecordError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

/// Date formats tried in order; day-month-year is what the order feed emits
pub const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Time suffixes accepted after any of the date formats
const TIME_SUFFIXES: [&str; 3] = [" %H:%M:%S", "T%H:%M:%S", " %H:%M"];

/// One order as delivered by the host, before any cleaning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrderRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub customer: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
}

impl RawOrderRecord {
    /// Record with just a date and a price
    pub fn new(date: &str, price: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            price: Some(price.to_string()),
            ..Self::default()
        }
    }

    pub fn with_customer(mut self, customer: &str) -> Self {
        self.customer = Some(customer.to_string());
        self
    }

    pub fn with_quantity(mut self, quantity: &str) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segment = Some(segment.to_string());
        self
    }

    pub fn with_order_id(mut self, order_id: &str) -> Self {
        self.order_id = Some(order_id.to_string());
        self
    }
}

/// A cleaned, immutable order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub customer_id: Option<String>,
    /// Host-supplied segment label, if any
    pub segment: Option<String>,
    pub unit_count: u32,
    pub revenue: Decimal,
}

impl OrderEvent {
    /// Create an event directly, bypassing raw record parsing
    pub fn new(order_id: &str, date: NaiveDate, customer_id: Option<&str>) -> Self {
        Self {
            order_id: order_id.to_string(),
            date,
            time: None,
            customer_id: customer_id.map(str::to_string),
            segment: None,
            unit_count: 1,
            revenue: Decimal::ZERO,
        }
    }

    /// Attach a host segment label; labels are stored lowercased
    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segment = Some(segment.trim().to_lowercase());
        self
    }

    pub fn with_units(mut self, unit_count: u32, revenue: Decimal) -> Self {
        self.unit_count = unit_count;
        self.revenue = revenue;
        self
    }
}

/// A raw record that was dropped, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position of the record in the input
    pub index: usize,
    pub reason: RecordError,
}

/// Output of a normalization pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub events: Vec<OrderEvent>,
    pub skipped: Vec<SkippedRecord>,
    /// Earlier records superseded by a later one for the same customer and date
    pub duplicates_dropped: usize,
}

/// Turns raw records into order events
#[derive(Debug, Clone)]
pub struct Normalizer {
    unit_price: Decimal,
}

impl Normalizer {
    pub fn new(unit_price: Decimal) -> Self {
        Self { unit_price }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.unit_price)
    }

    /// Normalize a batch of raw records
    pub fn normalize(&self, records: &[RawOrderRecord]) -> NormalizeReport {
        let mut parsed: Vec<OrderEvent> = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match self.normalize_record(index, record) {
                Ok(event) => parsed.push(event),
                Err(reason) => {
                    debug!(index, %reason, "skipping raw order record");
                    skipped.push(SkippedRecord { index, reason });
                }
            }
        }

        // Same customer on the same date: the last record wins
        let mut last_seen: HashMap<(String, NaiveDate), usize> = HashMap::new();
        for (position, event) in parsed.iter().enumerate() {
            if let Some(customer) = &event.customer_id {
                last_seen.insert((customer.clone(), event.date), position);
            }
        }

        let total = parsed.len();
        let events: Vec<OrderEvent> = parsed
            .into_iter()
            .enumerate()
            .filter(|(position, event)| match &event.customer_id {
                Some(customer) => last_seen.get(&(customer.clone(), event.date)) == Some(position),
                None => true,
            })
            .map(|(_, event)| event)
            .collect();
        let duplicates_dropped = total - events.len();

        info!(
            records = records.len(),
            events = events.len(),
            skipped = skipped.len(),
            duplicates_dropped,
            "normalized order records"
        );

        NormalizeReport {
            events,
            skipped,
            duplicates_dropped,
        }
    }

    fn normalize_record(
        &self,
        index: usize,
        record: &RawOrderRecord,
    ) -> std::result::Result<OrderEvent, RecordError> {
        let date_text = record
            .date
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(RecordError::MissingDate)?;
        let (date, time) = parse_date(date_text)?;

        let revenue = record
            .price
            .as_deref()
            .map(parse_amount)
            .unwrap_or(Decimal::ZERO);
        let unit_count = record
            .quantity
            .as_deref()
            .and_then(|q| q.trim().parse::<u32>().ok())
            .unwrap_or_else(|| self.units_from_revenue(revenue));

        let order_id = record
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{}", index));

        Ok(OrderEvent {
            order_id,
            date,
            time,
            customer_id: non_blank(record.customer.as_deref()),
            segment: non_blank(record.segment.as_deref()).map(|s| s.to_lowercase()),
            unit_count,
            revenue,
        })
    }

    fn units_from_revenue(&self, revenue: Decimal) -> u32 {
        if revenue <= Decimal::ZERO {
            return 0;
        }

        if self.unit_price <= Decimal::ZERO {
            return 1;
        }

        // Unit counts beyond u32 saturate
        revenue
            .checked_div(self.unit_price)
            .map_or(u32::MAX, |ratio| ratio.round().to_u32().unwrap_or(u32::MAX))
            .max(1)
    }
}

/// Normalize records with the unit price from the configuration
pub fn normalize(records: &[RawOrderRecord], config: &EngineConfig) -> NormalizeReport {
    Normalizer::from_config(config).normalize(records)
}

/// Parse a date (and optional time) using the accepted formats in order
pub fn parse_date(text: &str) -> std::result::Result<(NaiveDate, Option<NaiveTime>), RecordError> {
    let text = text.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok((date, None));
        }

        for suffix in TIME_SUFFIXES {
            let with_time = format!("{}{}", format, suffix);
            if let Ok(stamp) = NaiveDateTime::parse_from_str(text, &with_time) {
                return Ok((stamp.date(), Some(stamp.time())));
            }
        }
    }

    Err(RecordError::UnparseableDate(text.to_string()))
}

/// Parse a monetary amount; anything unparseable or negative becomes zero
pub fn parse_amount(text: &str) -> Decimal {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned)) {
        Ok(amount) if amount > Decimal::ZERO => amount,
        _ => Decimal::ZERO,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accepts JSON strings or bare numbers, since feeds are inconsistent about quoting
fn loose_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    let value: Option<Loose> = Option::deserialize(deserializer)?;
    Ok(value.map(|loose| match loose {
        Loose::Text(text) => text,
        Loose::Integer(number) => number.to_string(),
        Loose::Float(number) => number.to_string(),
    }))
}
