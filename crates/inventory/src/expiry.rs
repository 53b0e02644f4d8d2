//! Expiry classification.
//!
//! Pure functions over naive (timezone-less) timestamps. `now` is always a
//! parameter so classification is reproducible.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::item::InventoryItem;

/// Urgency bucket for an item's expiry.
///
/// Ordered from most to least urgent, so `a < b` means `a` is more urgent.
/// As time moves forward an item's urgency can only decrease in this order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    Expired,
    Today,
    Tomorrow,
    Soon,
    Safe,
}

/// Display severity used to colour expiry text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Warning,
    Ok,
}

impl Urgency {
    pub const ALL: [Urgency; 5] = [
        Urgency::Expired,
        Urgency::Today,
        Urgency::Tomorrow,
        Urgency::Soon,
        Urgency::Safe,
    ];

    pub fn severity(self) -> Severity {
        match self {
            Urgency::Expired => Severity::Critical,
            Urgency::Today | Urgency::Tomorrow | Urgency::Soon => Severity::Warning,
            Urgency::Safe => Severity::Ok,
        }
    }

    /// Expired or due within three days.
    pub fn is_expiring(self) -> bool {
        self != Urgency::Safe
    }
}

/// Whole days from `now` until `expiry`.
///
/// Counted in calendar days: anything expiring later today is `0`, anything
/// that expired earlier today is still `0`, and a timestamp on the previous
/// calendar day is `-1`.
pub fn days_until(expiry: NaiveDateTime, now: NaiveDateTime) -> i64 {
    expiry
        .date()
        .signed_duration_since(now.date())
        .num_days()
}

pub fn urgency_of(days: i64) -> Urgency {
    match days {
        d if d < 0 => Urgency::Expired,
        0 => Urgency::Today,
        1 => Urgency::Tomorrow,
        2..=3 => Urgency::Soon,
        _ => Urgency::Safe,
    }
}

/// User-facing expiry text.
pub fn expiry_label(days: i64) -> String {
    match urgency_of(days) {
        Urgency::Expired => "Expired".to_string(),
        Urgency::Today => "Expires today".to_string(),
        Urgency::Tomorrow => "Expires tomorrow".to_string(),
        Urgency::Soon | Urgency::Safe => format!("Expires in {days} days"),
    }
}

/// Bucket counts over a set of items at a point in time.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySummary {
    pub total: usize,
    pub expired: usize,
    pub today: usize,
    pub tomorrow: usize,
    pub soon: usize,
    pub safe: usize,
}

impl ExpirySummary {
    pub fn from_items<'a, I>(items: I, now: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = &'a InventoryItem>,
    {
        let mut summary = Self::default();
        for item in items {
            summary.total += 1;
            match item.urgency(now) {
                Urgency::Expired => summary.expired += 1,
                Urgency::Today => summary.today += 1,
                Urgency::Tomorrow => summary.tomorrow += 1,
                Urgency::Soon => summary.soon += 1,
                Urgency::Safe => summary.safe += 1,
            }
        }
        summary
    }

    /// Items expired or due within three days.
    pub fn expiring(&self) -> usize {
        self.expired + self.today + self.tomorrow + self.soon
    }

    pub fn count(&self, urgency: Urgency) -> usize {
        match urgency {
            Urgency::Expired => self.expired,
            Urgency::Today => self.today,
            Urgency::Tomorrow => self.tomorrow,
            Urgency::Soon => self.soon,
            Urgency::Safe => self.safe,
        }
    }
}
