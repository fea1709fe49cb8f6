// Availability source adapter: the channel-manager calendar fetch and the
// synthetic fallback calendar used when the remote side is unreachable.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::availability::DateAvailability;
use crate::calendar_wire::{decode_calendar, CalendarRequest, DecodeError};

// Fallback generation parameters, matching the shape of real direct-booking
// pricing closely enough for a usable placeholder calendar.
pub const FALLBACK_WINDOW_DAYS: u32 = 90;
pub const FALLBACK_BASE_PRICE: f64 = 150.0;
pub const FALLBACK_WEEKEND_MULTIPLIER: f64 = 1.3;
pub const FALLBACK_AVAILABLE_PROBABILITY: f64 = 0.9;
const FALLBACK_PROMOTION_PROBABILITY: f64 = 0.2;
const FALLBACK_PROMOTION_LABEL: &str = "Direct Booking Discount";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

// Closed date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    // The displayed month span plus one month of lookahead, the window the
    // calendar view typically asks for.
    pub fn month_with_lookahead(first_visible: NaiveDate) -> Self {
        Self {
            start: first_visible,
            end: first_visible + Duration::days(60),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

// Remote calendar provider for a listing.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch_calendar(
        &self,
        listing_id: &str,
        window: DateWindow,
    ) -> Result<Vec<DateAvailability>, SourceError>;
}

// HTTP implementation talking to the channel-manager calendar endpoint.
pub struct HttpCalendarSource {
    http: reqwest::Client,
    base_url: String,
    channel_type: String,
}

impl HttpCalendarSource {
    pub fn new(base_url: impl Into<String>, channel_type: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
            channel_type: channel_type.into(),
        }
    }
}

#[async_trait]
impl CalendarSource for HttpCalendarSource {
    async fn fetch_calendar(
        &self,
        listing_id: &str,
        window: DateWindow,
    ) -> Result<Vec<DateAvailability>, SourceError> {
        let request = CalendarRequest {
            listing_id: listing_id.to_string(),
            channel_type: self.channel_type.clone(),
            start_date: window.start(),
            end_date: window.end(),
        };

        debug!(listing_id, start = %window.start(), end = %window.end(), "fetching calendar");

        let body = self
            .http
            .get(format!("{}/calendar", self.base_url))
            .query(&request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(decode_calendar(&body, listing_id)?)
    }
}

// Result of a fetch that may have substituted synthetic data. When
// `fallback` is true the prices are placeholders and the UI must say so.
#[derive(Debug, Clone)]
pub struct CalendarFetch {
    pub days: Vec<DateAvailability>,
    pub fallback: bool,
}

// Fetch a calendar, substituting the synthetic fallback on any failure. The
// caller always receives a usable, non-empty calendar.
pub async fn fetch_or_fallback(
    source: &dyn CalendarSource,
    listing_id: &str,
    window: DateWindow,
) -> CalendarFetch {
    match source.fetch_calendar(listing_id, window).await {
        Ok(days) if !days.is_empty() => CalendarFetch {
            days,
            fallback: false,
        },
        Ok(_) => {
            warn!(listing_id, "calendar source returned no days, using fallback data");
            CalendarFetch {
                days: fallback_calendar(Utc::now().date_naive()),
                fallback: true,
            }
        }
        Err(err) => {
            warn!(listing_id, error = %err, "calendar fetch failed, using fallback data");
            CalendarFetch {
                days: fallback_calendar(Utc::now().date_naive()),
                fallback: true,
            }
        }
    }
}

// Generate the synthetic 90-day calendar starting at `today`. The window is
// fixed-length and forward-looking regardless of what was requested.
pub fn fallback_calendar(today: NaiveDate) -> Vec<DateAvailability> {
    fallback_calendar_with(today, &mut rand::thread_rng())
}

pub fn fallback_calendar_with<R: Rng>(today: NaiveDate, rng: &mut R) -> Vec<DateAvailability> {
    let mut days = Vec::with_capacity(FALLBACK_WINDOW_DAYS as usize);
    let mut date = today;

    for _ in 0..FALLBACK_WINDOW_DAYS {
        if rng.gen_bool(FALLBACK_AVAILABLE_PROBABILITY) {
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let weekend_multiplier = if weekend {
                FALLBACK_WEEKEND_MULTIPLIER
            } else {
                1.0
            };
            let random_multiplier = rng.gen_range(0.8..=1.2);
            let price = (FALLBACK_BASE_PRICE * weekend_multiplier * random_multiplier).round();

            let mut day = DateAvailability::open(date, price);
            if rng.gen_bool(FALLBACK_PROMOTION_PROBABILITY) {
                day.promotion = Some(FALLBACK_PROMOTION_LABEL.to_string());
            }
            days.push(day);
        } else {
            days.push(DateAvailability::blocked(date));
        }

        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    days
}
