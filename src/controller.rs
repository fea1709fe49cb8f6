// Calendar controller: the headless bridge between day-cell rendering, the
// range validator, and the price aggregator. Owns the current index and
// selection, and serializes overlapping fetches with a request token.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::availability::AvailabilityIndex;
use crate::pricing::{aggregate, StayQuote};
use crate::range::{validate, RejectionReason, SelectedRange, Stay, StayPolicy, Validation};
use crate::source::{fetch_or_fallback, CalendarSource, DateWindow};

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub available: bool,
    pub price: Option<f64>,
    pub promotion: Option<String>,
    pub selected: bool,
    pub in_range: bool,
}

// What one user pick produced: the selection to render, a quote once the
// range is complete, and the rejection to surface when validation refused
// the pick. Rejections are informational, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOutcome {
    pub selection: SelectedRange,
    pub stay: Option<Stay>,
    pub quote: Option<StayQuote>,
    pub rejection: Option<RejectionReason>,
}

// Result of a refresh: whether this response was applied or discarded as
// stale, and whether the applied calendar is synthetic fallback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub applied: bool,
    pub fallback: bool,
}

#[derive(Debug, Default)]
struct ViewState {
    index: AvailabilityIndex,
    selection: SelectedRange,
    stay: Option<Stay>,
    quote: Option<StayQuote>,
    fallback: bool,
    applied_seq: u64,
}

pub struct CalendarController<S> {
    source: S,
    listing_id: String,
    policy: StayPolicy,
    today_fn: fn() -> NaiveDate,
    state: Mutex<ViewState>,
    fetch_seq: AtomicU64,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl<S: CalendarSource> CalendarController<S> {
    pub fn new(source: S, listing_id: impl Into<String>, policy: StayPolicy) -> Self {
        Self::with_today_fn(source, listing_id, policy, today)
    }

    // Injectable clock for deterministic past-date tests.
    pub fn with_today_fn(
        source: S,
        listing_id: impl Into<String>,
        policy: StayPolicy,
        today_fn: fn() -> NaiveDate,
    ) -> Self {
        Self {
            source,
            listing_id: listing_id.into(),
            policy,
            today_fn,
            state: Mutex::new(ViewState::default()),
            fetch_seq: AtomicU64::new(0),
        }
    }

    // Fetch the calendar for a window and, unless a newer request has
    // already been applied, replace the index with the response. Rapid month
    // navigation may race two fetches; the token makes the newest request
    // win regardless of arrival order.
    pub async fn refresh(&self, window: DateWindow) -> RefreshOutcome {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let fetch = fetch_or_fallback(&self.source, &self.listing_id, window).await;

        let mut state = self.state.lock();
        if seq < state.applied_seq {
            debug!(seq, applied = state.applied_seq, "discarding stale calendar response");
            return RefreshOutcome {
                applied: false,
                fallback: state.fallback,
            };
        }

        state.index = AvailabilityIndex::from_days(fetch.days);
        state.fallback = fetch.fallback;
        state.applied_seq = seq;
        self.revalidate_selection(&mut state);

        info!(
            listing_id = %self.listing_id,
            days = state.index.len(),
            fallback = fetch.fallback,
            "calendar applied"
        );
        RefreshOutcome {
            applied: true,
            fallback: fetch.fallback,
        }
    }

    pub fn select(&self, date: NaiveDate) -> SelectionOutcome {
        let mut state = self.state.lock();
        let today = (self.today_fn)();

        state.stay = None;
        state.quote = None;

        match state.selection.pick(date) {
            Some((check_in, check_out)) => {
                match validate(check_in, check_out, &state.index, self.policy, today) {
                    Validation::Valid(stay) => {
                        state.selection = SelectedRange {
                            check_in: Some(stay.check_in()),
                            check_out: Some(stay.check_out()),
                        };
                        state.stay = Some(stay);
                        state.quote = Some(aggregate(&stay, &state.index));
                        self.outcome(&state, None)
                    }
                    Validation::Rejected { retained, reason } => {
                        state.selection = retained;
                        self.outcome(&state, Some(reason))
                    }
                }
            }
            None => {
                // A pick that opened (or restarted) a range: the lone
                // check-in must itself be bookable.
                let rejection = if date < today {
                    Some(RejectionReason::CheckInPast)
                } else if !state.index.is_available(date) {
                    Some(RejectionReason::UnavailableDate(date))
                } else {
                    None
                };
                if rejection.is_some() {
                    state.selection.clear();
                }
                self.outcome(&state, rejection)
            }
        }
    }

    // Drop the current selection, e.g. when the booking flow restarts.
    pub fn reset_selection(&self) {
        let mut state = self.state.lock();
        state.selection.clear();
        state.stay = None;
        state.quote = None;
    }

    pub fn day_cell(&self, date: NaiveDate) -> DayCell {
        let state = self.state.lock();
        let entry = state.index.get(date);
        let selected =
            state.selection.check_in == Some(date) || state.selection.check_out == Some(date);

        DayCell {
            date,
            day_of_month: date.day(),
            available: state.index.is_available(date),
            price: state.index.price_for(date),
            promotion: entry.and_then(|d| d.promotion.clone()),
            selected,
            in_range: state.selection.contains(date) && !selected,
        }
    }

    pub fn selection(&self) -> SelectedRange {
        self.state.lock().selection
    }

    pub fn quote(&self) -> Option<StayQuote> {
        self.state.lock().quote
    }

    // True when the currently displayed calendar is synthetic fallback data
    // and must be flagged to the user.
    pub fn is_fallback(&self) -> bool {
        self.state.lock().fallback
    }

    fn outcome(&self, state: &ViewState, rejection: Option<RejectionReason>) -> SelectionOutcome {
        SelectionOutcome {
            selection: state.selection,
            stay: state.stay,
            quote: state.quote,
            rejection,
        }
    }

    // After an index replacement, a previously valid range may now cross
    // blocked dates. Re-run validation and keep whatever survives.
    fn revalidate_selection(&self, state: &mut ViewState) {
        if let (Some(check_in), Some(check_out)) =
            (state.selection.check_in, state.selection.check_out)
        {
            match validate(
                check_in,
                check_out,
                &state.index,
                self.policy,
                (self.today_fn)(),
            ) {
                Validation::Valid(stay) => {
                    state.stay = Some(stay);
                    state.quote = Some(aggregate(&stay, &state.index));
                }
                Validation::Rejected { retained, .. } => {
                    debug!("selection invalidated by calendar refresh");
                    state.selection = retained;
                    state.stay = None;
                    state.quote = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::DateAvailability;
    use crate::source::SourceError;
    use async_trait::async_trait;
    use std::time::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    // Returns one priced day per window date; price encodes the window start
    // so tests can tell which response was applied. Windows starting on the
    // 1st resolve slowly.
    struct WindowSource;

    #[async_trait]
    impl CalendarSource for WindowSource {
        async fn fetch_calendar(
            &self,
            _listing_id: &str,
            window: DateWindow,
        ) -> Result<Vec<DateAvailability>, SourceError> {
            if window.start().day() == 1 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let mut days = Vec::new();
            let mut d = window.start();
            while d <= window.end() {
                days.push(DateAvailability::open(d, f64::from(window.start().day())));
                d = d.succ_opt().unwrap();
            }
            Ok(days)
        }
    }

    struct OpenMarch;

    #[async_trait]
    impl CalendarSource for OpenMarch {
        async fn fetch_calendar(
            &self,
            _listing_id: &str,
            _window: DateWindow,
        ) -> Result<Vec<DateAvailability>, SourceError> {
            // March 10-12 at 100, March 13 blocked, rest of month at 120.
            let mut days = Vec::new();
            for d in 1..=31 {
                let day = match d {
                    10..=12 => DateAvailability::open(date(d), 100.0),
                    13 => DateAvailability::blocked(date(13)),
                    _ => DateAvailability::open(date(d), 120.0),
                };
                days.push(day);
            }
            Ok(days)
        }
    }

    fn controller<S: CalendarSource>(source: S, min_nights: u32) -> CalendarController<S> {
        CalendarController::with_today_fn(
            source,
            "t1-house",
            StayPolicy { min_nights },
            fixed_today,
        )
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let ctrl = controller(WindowSource, 1);
        let slow = DateWindow::new(date(1), date(5)).unwrap();
        let fast = DateWindow::new(date(2), date(6)).unwrap();

        let (first, second) = futures::join!(ctrl.refresh(slow), ctrl.refresh(fast));

        // The second request resolved first and wins; the slow first request
        // arrives later and is dropped.
        assert!(second.applied);
        assert!(!first.applied);
        assert_eq!(ctrl.day_cell(date(3)).price, Some(2.0));
    }

    #[tokio::test]
    async fn pick_pick_produces_a_quote() {
        let ctrl = controller(OpenMarch, 1);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        let first = ctrl.select(date(10));
        assert_eq!(first.rejection, None);
        assert_eq!(first.quote, None);

        let second = ctrl.select(date(12));
        assert_eq!(second.rejection, None);
        let quote = second.quote.expect("complete range should quote");
        assert_eq!(quote.nights, 2);
        assert_eq!(quote.total_price, 200.0);
    }

    #[tokio::test]
    async fn min_stay_rejection_keeps_check_in() {
        let ctrl = controller(OpenMarch, 3);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        ctrl.select(date(10));
        let outcome = ctrl.select(date(12));

        assert!(matches!(
            outcome.rejection,
            Some(RejectionReason::BelowMinimumStay {
                nights: 2,
                required: 3
            })
        ));
        assert_eq!(outcome.selection.check_in, Some(date(10)));
        assert_eq!(outcome.selection.check_out, None);
        assert_eq!(outcome.quote, None);
    }

    #[tokio::test]
    async fn blocked_departure_day_rejects_the_range() {
        let ctrl = controller(OpenMarch, 1);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        ctrl.select(date(10));
        let outcome = ctrl.select(date(13));

        assert_eq!(
            outcome.rejection,
            Some(RejectionReason::UnavailableDate(date(13)))
        );
        assert_eq!(outcome.selection.check_in, Some(date(10)));
        assert_eq!(outcome.selection.check_out, None);
    }

    #[tokio::test]
    async fn picking_a_blocked_check_in_clears_selection() {
        let ctrl = controller(OpenMarch, 1);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        let outcome = ctrl.select(date(13));
        assert_eq!(
            outcome.rejection,
            Some(RejectionReason::UnavailableDate(date(13)))
        );
        assert_eq!(outcome.selection, SelectedRange::default());
    }

    #[tokio::test]
    async fn same_day_pick_restarts_instead_of_zero_night_stay() {
        let ctrl = controller(OpenMarch, 1);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        ctrl.select(date(10));
        let outcome = ctrl.select(date(10));

        assert_eq!(outcome.rejection, None);
        assert_eq!(outcome.selection.check_in, Some(date(10)));
        assert_eq!(outcome.selection.check_out, None);
        assert_eq!(outcome.quote, None);
    }

    #[tokio::test]
    async fn day_cells_reflect_selection_and_range() {
        let ctrl = controller(OpenMarch, 1);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        ctrl.select(date(10));
        ctrl.select(date(12));

        let check_in = ctrl.day_cell(date(10));
        assert!(check_in.selected);
        assert!(!check_in.in_range);

        let middle = ctrl.day_cell(date(11));
        assert!(!middle.selected);
        assert!(middle.in_range);
        assert_eq!(middle.price, Some(100.0));

        let blocked = ctrl.day_cell(date(13));
        assert!(!blocked.available);
        assert_eq!(blocked.price, None);

        let outside = ctrl.day_cell(date(20));
        assert!(!outside.selected && !outside.in_range);
    }

    #[tokio::test]
    async fn refresh_revalidates_an_existing_selection() {
        use std::sync::atomic::{AtomicBool, Ordering};

        // Open calendar on the first fetch; March 11 becomes blocked on the
        // second, as if another guest booked it in the meantime.
        struct ShrinkingSource {
            eleventh_taken: AtomicBool,
        }

        #[async_trait]
        impl CalendarSource for ShrinkingSource {
            async fn fetch_calendar(
                &self,
                _listing_id: &str,
                _window: DateWindow,
            ) -> Result<Vec<DateAvailability>, SourceError> {
                let taken = self.eleventh_taken.swap(true, Ordering::SeqCst);
                Ok((10..=13)
                    .map(|d| {
                        if d == 11 && taken {
                            DateAvailability::blocked(date(11))
                        } else {
                            DateAvailability::open(date(d), 100.0)
                        }
                    })
                    .collect())
            }
        }

        let ctrl = controller(
            ShrinkingSource {
                eleventh_taken: AtomicBool::new(false),
            },
            1,
        );
        let window = DateWindow::new(date(1), date(31)).unwrap();
        ctrl.refresh(window).await;
        ctrl.select(date(10));
        ctrl.select(date(12));
        assert!(ctrl.quote().is_some());

        ctrl.refresh(window).await;

        // The stay no longer validates; check-in is retained for a re-prompt.
        assert_eq!(ctrl.quote(), None);
        assert_eq!(ctrl.selection().check_in, Some(date(10)));
        assert_eq!(ctrl.selection().check_out, None);
    }

    #[tokio::test]
    async fn fallback_flag_is_exposed() {
        struct Failing;

        #[async_trait]
        impl CalendarSource for Failing {
            async fn fetch_calendar(
                &self,
                listing_id: &str,
                _window: DateWindow,
            ) -> Result<Vec<DateAvailability>, SourceError> {
                Err(SourceError::Decode(
                    crate::calendar_wire::DecodeError::ListingMissing(listing_id.to_string()),
                ))
            }
        }

        let ctrl = controller(Failing, 1);
        let outcome = ctrl
            .refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;

        assert!(outcome.applied);
        assert!(outcome.fallback);
        assert!(ctrl.is_fallback());
    }

    #[tokio::test]
    async fn reset_clears_selection_and_quote() {
        let ctrl = controller(OpenMarch, 1);
        ctrl.refresh(DateWindow::new(date(1), date(31)).unwrap())
            .await;
        ctrl.select(date(10));
        ctrl.select(date(12));
        assert!(ctrl.quote().is_some());

        ctrl.reset_selection();
        assert_eq!(ctrl.selection(), SelectedRange::default());
        assert_eq!(ctrl.quote(), None);
    }
}
