// Stay range validation: past-date exclusion, availability scan, minimum-stay
// policy, and the pick state machine the calendar drives.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityIndex;

// Deployment-level stay rules. Observed configurations use 1 or 3 nights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayPolicy {
    pub min_nights: u32,
}

impl Default for StayPolicy {
    fn default() -> Self {
        Self { min_nights: 1 }
    }
}

// A validated stay. `check_out` is strictly after `check_in`, so
// `Stay::nights` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl Stay {
    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days().max(0) as u32
    }

    // The charged nights: every date in `[check_in, check_out)`. The guest
    // departs on the check-out morning, so that date is excluded.
    pub fn charged_dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.check_out;
        std::iter::successors(Some(self.check_in), move |d| {
            d.succ_opt().filter(|next| *next < end)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    // Check-in lies strictly before today.
    CheckInPast,
    // Some date in the inclusive span `[check_in, check_out]` is blocked.
    // The check-out day must be bookable even though it is never charged.
    UnavailableDate(NaiveDate),
    // The stay is shorter than the configured minimum.
    BelowMinimumStay { nights: u32, required: u32 },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::CheckInPast => write!(f, "check-in date is in the past"),
            RejectionReason::UnavailableDate(d) => {
                write!(f, "{} is not available", d)
            }
            RejectionReason::BelowMinimumStay { nights, required } => {
                write!(f, "{} night(s) selected, minimum stay is {}", nights, required)
            }
        }
    }
}

// Transient calendar selection. Either empty, an open check-in waiting for a
// check-out, or a complete validated range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectedRange {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
}

impl SelectedRange {
    pub fn clear(&mut self) {
        *self = SelectedRange::default();
    }

    pub fn is_complete(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_some()
    }

    // True when `date` falls inside a complete range, bounds included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.check_in, self.check_out) {
            (Some(ci), Some(co)) => date >= ci && date <= co,
            _ => false,
        }
    }

    // Apply one user pick and return the candidate to validate, if any.
    //
    // A pick while no check-in is open, or while a complete range exists,
    // starts a fresh range. A pick strictly after an open check-in proposes
    // a check-out. A pick at or before the open check-in restarts the range
    // at the picked date: same-day check-out is an incomplete range, never a
    // zero-night stay.
    pub fn pick(&mut self, date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match (self.check_in, self.check_out) {
            (Some(ci), None) if date > ci => Some((ci, date)),
            _ => {
                self.check_in = Some(date);
                self.check_out = None;
                None
            }
        }
    }
}

// Result of validating a candidate range.
//
// On rejection the selection the caller should fall back to is returned:
// the check-in is retained with the check-out cleared, so the guest can
// re-pick a check-out, except when the check-in itself was the invalid
// element, in which case the whole selection resets.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(Stay),
    Rejected {
        retained: SelectedRange,
        reason: RejectionReason,
    },
}

// Validate a candidate check-in/check-out pair against the index and policy.
//
// Rejections are evaluated in a fixed order: past check-in, then
// availability over the inclusive span, then minimum stay. The availability
// scan includes the check-out date even though pricing excludes it - the
// departure day still has to be open for the unit.
pub fn validate(
    check_in: NaiveDate,
    check_out: NaiveDate,
    index: &AvailabilityIndex,
    policy: StayPolicy,
    today: NaiveDate,
) -> Validation {
    if check_in < today {
        return Validation::Rejected {
            retained: SelectedRange::default(),
            reason: RejectionReason::CheckInPast,
        };
    }

    let mut day = check_in;
    while day <= check_out {
        if !index.is_available(day) {
            let retained = if day == check_in {
                SelectedRange::default()
            } else {
                SelectedRange {
                    check_in: Some(check_in),
                    check_out: None,
                }
            };
            return Validation::Rejected {
                retained,
                reason: RejectionReason::UnavailableDate(day),
            };
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    // A stay always needs check-out strictly after check-in, whatever the
    // policy says; zero and inverted spans are incomplete ranges.
    let nights = (check_out - check_in).num_days().max(0) as u32;
    if nights < policy.min_nights.max(1) {
        return Validation::Rejected {
            retained: SelectedRange {
                check_in: Some(check_in),
                check_out: None,
            },
            reason: RejectionReason::BelowMinimumStay {
                nights,
                required: policy.min_nights.max(1),
            },
        };
    }

    Validation::Valid(Stay {
        check_in,
        check_out,
    })
}
