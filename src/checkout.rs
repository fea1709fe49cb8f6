// Checkout hand-off: session creation and payment verification against the
// external payment service. Both are black boxes; this module owns only
// their JSON contracts and the client plumbing.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::booking::BookingDraft;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("checkout request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("booking draft is missing {0}, cannot start checkout")]
    IncompleteDraft(&'static str),
}

// Request body for creating a checkout session: totals, stay dates, room
// type, and the contact and guest-count fields the payment page displays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSessionRequest {
    pub amount_total: i64,
    pub currency: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub room_type: String,
    pub adults: u32,
    pub children: u32,
    pub baby_crib: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country: String,
}

impl CheckoutSessionRequest {
    // Build the session request from a completed draft. Amounts go out in
    // minor currency units.
    pub fn from_draft(
        draft: &BookingDraft,
        currency: &str,
        room_type: &str,
    ) -> Result<Self, CheckoutError> {
        let check_in = draft
            .check_in
            .ok_or(CheckoutError::IncompleteDraft("check-in date"))?;
        let check_out = draft
            .check_out
            .ok_or(CheckoutError::IncompleteDraft("check-out date"))?;
        let guests = draft
            .guests
            .ok_or(CheckoutError::IncompleteDraft("guest count"))?;
        let contact = draft
            .contact
            .as_ref()
            .ok_or(CheckoutError::IncompleteDraft("contact details"))?;

        Ok(Self {
            amount_total: (draft.total_price() * 100.0).round() as i64,
            currency: currency.to_string(),
            check_in,
            check_out,
            nights: draft.nights,
            room_type: room_type.to_string(),
            adults: guests.adults,
            children: guests.children,
            baby_crib: guests.baby_crib,
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            country: contact.country.clone(),
        })
    }
}

// A created session: the browser is redirected to `session_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub session_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Canceled,
}

// Canonical echo of the booking returned by the verification endpoint,
// amounts in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentVerification {
    pub session_id: String,
    pub status: PaymentStatus,
    pub amount_total: i64,
    pub currency: String,
    pub nights: u32,
    pub adults: u32,
    pub children: u32,
    pub email: String,
    // Acknowledgement code from the downstream reservation system, present
    // once the booking was forwarded.
    pub reservation_ack: Option<String>,
}

// Terminal outcome of the payment step. `Failed` carries no detail beyond
// what the UI needs: the user is offered a restart, never an automatic
// retry.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Confirmed(PaymentVerification),
    Failed,
}

impl From<PaymentVerification> for PaymentOutcome {
    fn from(verification: PaymentVerification) -> Self {
        match verification.status {
            PaymentStatus::Paid => PaymentOutcome::Confirmed(verification),
            PaymentStatus::Unpaid | PaymentStatus::Canceled => {
                warn!(session_id = %verification.session_id, status = ?verification.status,
                      "payment not completed");
                PaymentOutcome::Failed
            }
        }
    }
}

#[async_trait]
pub trait CheckoutApi: Send + Sync {
    async fn create_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError>;

    async fn verify_payment(&self, session_id: &str)
        -> Result<PaymentVerification, CheckoutError>;
}

// HTTP client for the external checkout service.
pub struct HttpCheckout {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCheckout {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CheckoutApi for HttpCheckout {
    async fn create_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        info!(amount_total = request.amount_total, nights = request.nights,
              "creating checkout session");

        let session = self
            .http
            .post(format!("{}/checkout/sessions", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<CheckoutSession>()
            .await?;

        Ok(session)
    }

    async fn verify_payment(
        &self,
        session_id: &str,
    ) -> Result<PaymentVerification, CheckoutError> {
        let verification = self
            .http
            .get(format!(
                "{}/checkout/sessions/{}/verify",
                self.base_url, session_id
            ))
            .send()
            .await?
            .error_for_status()?
            .json::<PaymentVerification>()
            .await?;

        Ok(verification)
    }
}
