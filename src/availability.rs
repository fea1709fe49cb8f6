// Availability index: per-date lookup built from one calendar fetch.
// A new fetch fully replaces the previous set - there is no incremental merge.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

// One calendar day of a listing, in canonical form.
//
// `price` is only meaningful when `available` is true; consumers must go
// through `AvailabilityIndex::price_for` rather than reading it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateAvailability {
    pub date: NaiveDate,
    pub available: bool,
    pub price: Option<f64>,
    pub min_stay: Option<u32>,
    pub closed_to_arrival: bool,
    pub closed_to_departure: bool,
    pub promotion: Option<String>,
}

impl DateAvailability {
    pub fn open(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            available: true,
            price: Some(price),
            min_stay: None,
            closed_to_arrival: false,
            closed_to_departure: false,
            promotion: None,
        }
    }

    // A blocked day. Any price the source sent along is dropped here so the
    // unavailable-implies-no-price invariant holds from construction on.
    pub fn blocked(date: NaiveDate) -> Self {
        Self {
            date,
            available: false,
            price: None,
            min_stay: None,
            closed_to_arrival: false,
            closed_to_departure: false,
            promotion: None,
        }
    }
}

// Strip the time component of a timestamp for calendar comparisons.
// Two timestamps on the same calendar day are treated as the same date.
pub fn normalize_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> NaiveDate {
    ts.date_naive()
}

// O(1) date -> `DateAvailability` lookup over the most recent fetch.
#[derive(Debug, Default, Clone)]
pub struct AvailabilityIndex {
    days: HashMap<NaiveDate, DateAvailability>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // Duplicate dates keep the last record seen.
    pub fn from_days(days: Vec<DateAvailability>) -> Self {
        let mut map = HashMap::with_capacity(days.len());
        for day in days {
            map.insert(day.date, day);
        }
        Self { days: map }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DateAvailability> {
        self.days.get(&date)
    }

    // Dates with no entry are unavailable.
    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.days.get(&date).map_or(false, |d| d.available)
    }

    // Nightly price for a date. `None` when the date is missing, has no
    // price, or is unavailable (prices on blocked dates are ignored).
    pub fn price_for(&self, date: NaiveDate) -> Option<f64> {
        self.days
            .get(&date)
            .filter(|d| d.available)
            .and_then(|d| d.price)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
