//! Order-frequency customer segmentation
//!
//! Hosts can label events with their own segment. Customers without a label are
//! classified here from how often and how much they order.

use crate::events::OrderEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Segment given to events that have neither a label nor a customer id
pub const UNKNOWN_SEGMENT: &str = "unknown";

/// Frequency-based customer tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Vip,
    Recurrent,
    Regular,
    Occasional,
}

impl Segment {
    /// Classify a customer from their order count and orders per active day
    pub fn classify(orders: usize, frequency: f64) -> Self {
        if orders > 20 && frequency > 0.1 {
            Segment::Vip
        } else if orders > 10 && frequency > 0.05 {
            Segment::Recurrent
        } else if orders > 5 {
            Segment::Regular
        } else {
            Segment::Occasional
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Vip => "vip",
            Segment::Recurrent => "recurrent",
            Segment::Regular => "regular",
            Segment::Occasional => "occasional",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-customer order profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub orders: usize,
    pub first_order: NaiveDate,
    pub last_order: NaiveDate,
    pub segment: Segment,
}

impl CustomerProfile {
    /// Days between first and last order, inclusive
    pub fn active_days(&self) -> i64 {
        (self.last_order - self.first_order).num_days() + 1
    }

    /// Orders per active day
    pub fn frequency(&self) -> f64 {
        self.orders as f64 / self.active_days().max(1) as f64
    }
}

/// Build a profile for every customer appearing in the events
pub fn profile_customers(events: &[OrderEvent]) -> HashMap<String, CustomerProfile> {
    let mut profiles: HashMap<String, CustomerProfile> = HashMap::new();

    for event in events {
        let Some(customer) = &event.customer_id else {
            continue;
        };
        profiles
            .entry(customer.clone())
            .and_modify(|p| {
                p.orders += 1;
                p.first_order = p.first_order.min(event.date);
                p.last_order = p.last_order.max(event.date);
            })
            .or_insert_with(|| CustomerProfile {
                customer_id: customer.clone(),
                orders: 1,
                first_order: event.date,
                last_order: event.date,
                segment: Segment::Occasional,
            });
    }

    for profile in profiles.values_mut() {
        profile.segment = Segment::classify(profile.orders, profile.frequency());
    }

    profiles
}

/// Segment label for every event: the host label when present, else the heuristic
pub fn resolve_labels(events: &[OrderEvent]) -> Vec<String> {
    let profiles = profile_customers(events);

    events
        .iter()
        .map(|event| {
            if let Some(label) = &event.segment {
                return label.to_lowercase();
            }
            event
                .customer_id
                .as_ref()
                .and_then(|c| profiles.get(c))
                .map(|p| p.segment.label().to_string())
                .unwrap_or_else(|| UNKNOWN_SEGMENT.to_string())
        })
        .collect()
}
