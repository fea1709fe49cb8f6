// Wire types for the channel-manager calendar endpoint and the decode step
// that maps them onto the canonical in-memory shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::availability::DateAvailability;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("calendar response parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("calendar response has no entry for listing {0}")]
    ListingMissing(String),
}

// Outbound query for one listing and a closed date window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRequest {
    pub listing_id: String,
    pub channel_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// Top-level response: one calendar per listing.
#[derive(Debug, Deserialize, Serialize)]
pub struct CalendarResponse {
    pub listings: Vec<ListingCalendar>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ListingCalendar {
    pub listing_id: String,
    pub calendar: Vec<WireDay>,
}

// Per-day record, in one of the two shapes observed on the wire. Anything
// else fails deserialization outright - unrecognized shapes are rejected,
// never coerced.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WireDay {
    // The rich channel-manager record: availability is derived from the
    // inventory count.
    Inventory {
        date: NaiveDate,
        #[serde(default)]
        price: Option<f64>,
        inventory: u32,
        #[serde(default)]
        restrictions: Option<WireRestrictions>,
    },
    // The plain record with availability provided directly.
    Plain {
        date: NaiveDate,
        available: bool,
        #[serde(default)]
        price: Option<f64>,
    },
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WireRestrictions {
    #[serde(default)]
    pub min_stay: Option<u32>,
    #[serde(default)]
    pub closed_to_arrival: bool,
    #[serde(default)]
    pub closed_to_departure: bool,
}

impl WireDay {
    // Canonicalize one wire record. Unavailable days drop any price the
    // source sent along.
    pub fn into_availability(self) -> DateAvailability {
        match self {
            WireDay::Inventory {
                date,
                price,
                inventory,
                restrictions,
            } => {
                let available = inventory > 0;
                let restrictions = restrictions.unwrap_or_default();
                DateAvailability {
                    date,
                    available,
                    price: if available { price } else { None },
                    min_stay: restrictions.min_stay,
                    closed_to_arrival: restrictions.closed_to_arrival,
                    closed_to_departure: restrictions.closed_to_departure,
                    promotion: None,
                }
            }
            WireDay::Plain {
                date,
                available,
                price,
            } => DateAvailability {
                date,
                available,
                price: if available { price } else { None },
                min_stay: None,
                closed_to_arrival: false,
                closed_to_departure: false,
                promotion: None,
            },
        }
    }
}

// Decode a calendar response body and extract the calendar for one listing.
pub fn decode_calendar(body: &str, listing_id: &str) -> Result<Vec<DateAvailability>, DecodeError> {
    let response: CalendarResponse = serde_json::from_str(body)?;
    let listing = response
        .listings
        .into_iter()
        .find(|l| l.listing_id == listing_id)
        .ok_or_else(|| DecodeError::ListingMissing(listing_id.to_string()))?;

    Ok(listing
        .calendar
        .into_iter()
        .map(WireDay::into_availability)
        .collect())
}
