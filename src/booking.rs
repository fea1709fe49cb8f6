// Booking draft accumulated across the flow steps, plus the guest-composition
// pricing for the single bookable unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::StayQuote;
use crate::range::Stay;

// The one bookable unit and its occupancy pricing. Base rate covers up to
// two adults; extras are charged per night.
pub const MAX_GUESTS: u32 = 4;
pub const BASE_NIGHTLY_RATE: f64 = 148.0;
pub const EXTRA_ADULT_RATE: f64 = 20.0;
pub const CHILD_RATE: f64 = 15.0;
pub const BABY_CRIB_RATE: f64 = 10.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GuestError {
    #[error("at least 1 adult is required")]
    NoAdults,

    #[error("unit sleeps at most {0} guests")]
    OverCapacity(u32),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContactError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("email address is not valid")]
    InvalidEmail,
}

// Guest composition for the stay. Infants in a crib do not count toward the
// guest cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCount {
    pub adults: u32,
    pub children: u32,
    pub baby_crib: bool,
}

impl Default for GuestCount {
    fn default() -> Self {
        Self {
            adults: 2,
            children: 0,
            baby_crib: false,
        }
    }
}

impl GuestCount {
    pub fn new(adults: u32, children: u32, baby_crib: bool) -> Result<Self, GuestError> {
        if adults < 1 {
            return Err(GuestError::NoAdults);
        }
        if adults + children > MAX_GUESTS {
            return Err(GuestError::OverCapacity(MAX_GUESTS));
        }
        Ok(Self {
            adults,
            children,
            baby_crib,
        })
    }

    pub fn total_guests(&self) -> u32 {
        self.adults + self.children
    }

    pub fn add_adult(&self) -> Result<Self, GuestError> {
        Self::new(self.adults + 1, self.children, self.baby_crib)
    }

    pub fn remove_adult(&self) -> Result<Self, GuestError> {
        Self::new(self.adults.saturating_sub(1), self.children, self.baby_crib)
    }

    pub fn add_child(&self) -> Result<Self, GuestError> {
        Self::new(self.adults, self.children + 1, self.baby_crib)
    }

    pub fn remove_child(&self) -> Result<Self, GuestError> {
        Self::new(self.adults, self.children.saturating_sub(1), self.baby_crib)
    }

    // Nightly rate for this composition: base covers two adults, then 20
    // per extra adult, 15 per child, and 10 for the crib.
    pub fn nightly_rate(&self) -> f64 {
        let mut rate = BASE_NIGHTLY_RATE;
        if self.adults > 2 {
            rate += f64::from(self.adults - 2) * EXTRA_ADULT_RATE;
        }
        rate += f64::from(self.children) * CHILD_RATE;
        if self.baby_crib {
            rate += BABY_CRIB_RATE;
        }
        rate
    }
}

// Customer contact fields collected by the details step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country: String,
}

impl ContactDetails {
    pub fn validate(&self) -> Result<(), ContactError> {
        if self.first_name.trim().is_empty() {
            return Err(ContactError::MissingField("first name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ContactError::MissingField("last name"));
        }
        if self.email.trim().is_empty() {
            return Err(ContactError::MissingField("email"));
        }
        if !is_valid_email(&self.email) {
            return Err(ContactError::InvalidEmail);
        }
        if self.country.trim().is_empty() {
            return Err(ContactError::MissingField("country"));
        }
        Ok(())
    }
}

// Same shape the intake form enforces: non-empty local part, a single `@`,
// and a domain containing a dot, none of them with whitespace.
fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !local.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains(char::is_whitespace)
        }
        _ => false,
    }
}

// Everything the flow has gathered so far. Owned by the step coordinator and
// passed by value between steps; there is no shared ambient state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub nights: u32,
    pub stay_total: f64,
    pub guests: Option<GuestCount>,
    pub contact: Option<ContactDetails>,
}

impl BookingDraft {
    pub fn with_stay(mut self, stay: &Stay, quote: &StayQuote) -> Self {
        self.check_in = Some(stay.check_in());
        self.check_out = Some(stay.check_out());
        self.nights = quote.nights;
        self.stay_total = quote.total_price;
        self
    }

    // The occupancy charge is derived in `total_price`, so replacing the
    // composition never double-counts it.
    pub fn with_guests(mut self, guests: GuestCount) -> Self {
        self.guests = Some(guests);
        self
    }

    // The stay quote plus the per-night occupancy extras (crib, extra
    // adults, children). Computed from the recorded parts, so the order the
    // steps ran in does not matter.
    pub fn total_price(&self) -> f64 {
        let extras = self
            .guests
            .map_or(0.0, |g| g.nightly_rate() - BASE_NIGHTLY_RATE);
        self.stay_total + extras * f64::from(self.nights)
    }

    pub fn with_contact(mut self, contact: ContactDetails) -> Result<Self, ContactError> {
        contact.validate()?;
        self.contact = Some(contact);
        Ok(self)
    }

    // A draft is ready for checkout once dates, guests, and contact details
    // are all present.
    pub fn is_complete(&self) -> bool {
        self.check_in.is_some()
            && self.check_out.is_some()
            && self.nights > 0
            && self.guests.is_some()
            && self.contact.is_some()
    }
}
