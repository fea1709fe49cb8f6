// Availability and pricing engine for the direct-booking flow

pub mod availability;
pub mod booking;
pub mod calendar_cache;
pub mod calendar_wire;
pub mod checkout;
pub mod controller;
pub mod pricing;
pub mod range;
pub mod source;

// Re-export key types for convenience
pub use availability::{AvailabilityIndex, DateAvailability};
pub use booking::{BookingDraft, ContactDetails, GuestCount};
pub use calendar_cache::{CacheConfig, CachingSource, CalendarCache};
pub use checkout::{CheckoutApi, CheckoutSession, HttpCheckout, PaymentOutcome, PaymentStatus};
pub use controller::{CalendarController, DayCell, SelectionOutcome};
pub use pricing::{aggregate, StayQuote};
pub use range::{validate, RejectionReason, SelectedRange, Stay, StayPolicy, Validation};
pub use source::{
    fetch_or_fallback, CalendarFetch, CalendarSource, DateWindow, HttpCalendarSource, SourceError,
};
