// Price aggregation over a validated stay: nightly sum, night count, and the
// rounded average rate shown in the booking summary.

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityIndex;
use crate::range::Stay;

// Totals for one stay. `nights` is always at least 1 because `Stay`
// guarantees check-out strictly after check-in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StayQuote {
    pub nights: u32,
    pub total_price: f64,
    pub average_per_night: f64,
}

// Sum nightly prices over `[check_in, check_out)`. The check-out night is
// excluded - the guest departs that morning. A date inside the range with no
// price is a data gap and contributes zero rather than failing the quote.
pub fn aggregate(stay: &Stay, index: &AvailabilityIndex) -> StayQuote {
    let total_price: f64 = stay
        .charged_dates()
        .map(|d| index.price_for(d).unwrap_or(0.0))
        .sum();
    let nights = stay.nights();

    StayQuote {
        nights,
        total_price,
        average_per_night: (total_price / f64::from(nights)).round(),
    }
}
