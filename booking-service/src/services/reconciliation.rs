//! Applies processor payment events to bookings and adoption orders.
//!
//! Every state change is conditional, so replays are harmless. The adoption
//! cascade is a sequence of idempotent steps closed by `fulfilled_at`; a
//! failed step makes the handler return an error, the processor retries, and
//! the retry resumes the cascade.

use chrono::Utc;
use mongodb::bson::DateTime as BsonDateTime;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::utils::signature::verify_webhook_signature;
use std::sync::Arc;

use super::metrics;
use super::repository::{AdoptionStore, BookingStore, EventLog, StoreError};
use crate::error::BookingError;
use crate::models::{AdoptionOrder, ProcessedEvent};

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

#[derive(Debug, Deserialize)]
pub struct EventObject {
    pub id: Option<String>,
}

/// What handling an event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    AlreadyProcessed,
    Ignored,
    Applied {
        booking_paid: bool,
        order_fulfilled: bool,
    },
}

#[derive(Clone)]
pub struct ReconciliationService {
    bookings: Arc<dyn BookingStore>,
    adoption: Arc<dyn AdoptionStore>,
    events: Arc<dyn EventLog>,
    webhook_secret: Option<Secret<String>>,
    tolerance_seconds: i64,
}

impl ReconciliationService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        adoption: Arc<dyn AdoptionStore>,
        events: Arc<dyn EventLog>,
        webhook_secret: Option<Secret<String>>,
        tolerance_seconds: i64,
    ) -> Self {
        Self {
            bookings,
            adoption,
            events,
            webhook_secret,
            tolerance_seconds,
        }
    }

    pub async fn handle_payment_event(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<EventOutcome, BookingError> {
        self.verify(payload, signature)?;

        let event: PaymentEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Malformed payment event");
            BookingError::validation(format!("Malformed payment event: {}", e))
        })?;

        if self.events.is_processed(&event.id).await? {
            tracing::info!(event_id = %event.id, "Payment event already processed");
            metrics::record_payment_event(&event.event_type, "duplicate");
            return Ok(EventOutcome::AlreadyProcessed);
        }

        if event.event_type != PAYMENT_SUCCEEDED {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring payment event");
            metrics::record_payment_event(&event.event_type, "ignored");
            return Ok(EventOutcome::Ignored);
        }

        let intent_id = event
            .data
            .object
            .id
            .as_deref()
            .ok_or_else(|| BookingError::validation("Payment event has no object id"))?;

        let booking_paid = self.bookings.mark_booking_paid(intent_id, Utc::now()).await?;
        if booking_paid {
            tracing::info!(payment_intent_id = %intent_id, "Booking marked paid");
        }

        let order_fulfilled = self.settle_order(intent_id).await?;

        self.events
            .record_processed(ProcessedEvent {
                event_id: event.id.clone(),
                event_type: event.event_type.clone(),
                processed_at: BsonDateTime::now(),
            })
            .await?;

        metrics::record_payment_event(&event.event_type, "applied");
        Ok(EventOutcome::Applied {
            booking_paid,
            order_fulfilled,
        })
    }

    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), BookingError> {
        let Some(secret) = self.webhook_secret.as_ref() else {
            tracing::error!("Payment webhook received but no webhook secret is configured");
            return Err(BookingError::Configuration(
                "Webhook secret not configured".to_string(),
            ));
        };

        let header = signature.ok_or_else(|| {
            tracing::warn!("Payment webhook without signature header");
            BookingError::Security("Missing signature".to_string())
        })?;

        verify_webhook_signature(
            secret.expose_secret(),
            payload,
            header,
            self.tolerance_seconds,
            Utc::now().timestamp(),
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Payment webhook signature rejected");
            BookingError::Security("invalid signature".to_string())
        })
    }

    /// Mark the order paid and run any outstanding cascade. Returns whether
    /// the cascade completed during this call.
    async fn settle_order(&self, intent_id: &str) -> Result<bool, BookingError> {
        let transitioned = self.adoption.mark_order_paid(intent_id, Utc::now()).await?;

        let Some(order) = self.adoption.find_order_by_intent(intent_id).await? else {
            return Ok(false);
        };
        if transitioned {
            tracing::info!(order_id = %order.id, "Adoption order marked paid");
        }
        if !order.is_paid() || order.fulfilled_at.is_some() {
            return Ok(false);
        }
        if !transitioned {
            tracing::info!(order_id = %order.id, "Resuming interrupted adoption cascade");
        }

        self.run_cascade(&order).await?;
        Ok(true)
    }

    async fn run_cascade(&self, order: &AdoptionOrder) -> Result<(), BookingError> {
        let listing_ids = order.listing_ids();

        let moved = self
            .adoption
            .mark_listings_pending(&listing_ids)
            .await
            .map_err(|e| cascade_failure(order, "mark_listings_pending", e))?;
        tracing::debug!(order_id = %order.id, moved, "Listings moved to pending");

        for listing_id in &listing_ids {
            self.adoption
                .upsert_adoption_request(listing_id, &order.customer_id)
                .await
                .map_err(|e| cascade_failure(order, "upsert_adoption_request", e))?;
        }

        self.adoption
            .clear_basket(&order.customer_id)
            .await
            .map_err(|e| cascade_failure(order, "clear_basket", e))?;

        self.adoption
            .mark_order_fulfilled(&order.id, Utc::now())
            .await
            .map_err(|e| cascade_failure(order, "mark_order_fulfilled", e))?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            listings = listing_ids.len(),
            "Adoption order fulfilled"
        );
        Ok(())
    }
}

fn cascade_failure(order: &AdoptionOrder, step: &'static str, err: StoreError) -> BookingError {
    metrics::record_cascade_failure(step);
    tracing::error!(
        order_id = %order.id,
        step,
        error = %err,
        "Adoption cascade step failed; awaiting processor retry"
    );
    err.into()
}
