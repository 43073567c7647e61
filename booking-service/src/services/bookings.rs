//! Slot reservation and payment hand-off for service bookings.
//!
//! A booking is persisted as `pending`/`unpaid` before authorization is
//! requested. If authorization fails the booking is deleted again, so a
//! failed payment never holds a slot.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::availability;
use super::metrics;
use super::pricing;
use super::providers::{AuthorizationDetails, AuthorizationRequest, PaymentError, PaymentGateway};
use super::repository::{BookingStore, CatalogStore, StoreError};
use super::settings::SettingsService;
use crate::error::BookingError;
use crate::models::{
    BookingFilter, BookingItem, BookingStatus, PaymentStatus, Pet, ReminderType,
    ServiceBooking, ServiceCatalogEntry,
};

/// "Everything" or an explicit id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Explicit(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub services: Selection,
    pub pets: Selection,
    pub scheduled_at: String,
    pub reminder_type: ReminderType,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingCreated {
    pub booking: ServiceBooking,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct BookingService {
    catalog: Arc<dyn CatalogStore>,
    bookings: Arc<dyn BookingStore>,
    settings: SettingsService,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    offset: FixedOffset,
}

impl BookingService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        bookings: Arc<dyn BookingStore>,
        settings: SettingsService,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
        offset: FixedOffset,
    ) -> Self {
        Self {
            catalog,
            bookings,
            settings,
            gateway,
            currency,
            offset,
        }
    }

    /// Bookable instants for a business-local date, ascending.
    pub async fn get_available_slots(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, BookingError> {
        let hours = self.settings.operating_hours().await?;
        let Some((start, end)) = availability::day_window(date, &hours, self.offset) else {
            return Ok(Vec::new());
        };

        let booked: HashSet<DateTime<Utc>> = self
            .bookings
            .booked_instants(start, end)
            .await?
            .into_iter()
            .collect();

        Ok(availability::compute_slots(
            date,
            &hours,
            self.offset,
            &booked,
            Utc::now(),
        ))
    }

    pub async fn create_booking(
        &self,
        customer_id: &str,
        request: NewBooking,
    ) -> Result<BookingCreated, BookingError> {
        let services = self.resolve_services(&request.services).await?;
        let pets = self.resolve_pets(customer_id, &request.pets).await?;

        let scheduled_at = availability::parse_scheduled_at(&request.scheduled_at, self.offset)
            .ok_or_else(|| BookingError::validation("Invalid scheduled date/time"))?;

        let local_date = availability::local_date(scheduled_at, self.offset);
        let slots = self.get_available_slots(local_date).await?;
        if !slots.contains(&scheduled_at) {
            return Err(BookingError::slot_unavailable());
        }

        let items = build_items(&services, &pets);
        let subtotal = pricing::subtotal(items.iter().map(|item| item.unit_price));
        let tax_percent = self.settings.current_tax_percent().await?;
        let totals = pricing::calculate_totals(subtotal, tax_percent);
        let amount_minor = pricing::to_minor_units(totals.total)
            .ok_or_else(|| PaymentError::InvalidAmount(totals.total.to_string()))?;

        let now = BsonDateTime::now();
        let booking = ServiceBooking {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            provider_id: request.provider_id,
            pet_ids: pets.iter().map(|pet| pet.id.clone()).collect(),
            service_ids: services.iter().map(|service| service.id.clone()).collect(),
            items,
            scheduled_at: BsonDateTime::from_chrono(scheduled_at),
            reminder_type: request.reminder_type,
            reminder_sent_at: None,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            subtotal,
            tax_percent,
            tax_amount: totals.tax_amount,
            total: totals.total,
            currency: self.currency.clone(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        self.bookings
            .insert_booking(booking.clone())
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    tracing::info!(
                        scheduled_at = %availability::format_slot(&scheduled_at),
                        "Slot taken by a concurrent booking"
                    );
                    BookingError::slot_unavailable()
                }
                other => other.into(),
            })?;

        let mut metadata = BTreeMap::new();
        metadata.insert("bookingId".to_string(), booking.id.clone());
        metadata.insert("userId".to_string(), customer_id.to_string());

        let authorization = match self
            .gateway
            .create_authorization(AuthorizationRequest {
                amount_minor,
                currency: self.currency.clone(),
                metadata,
                idempotency_key: booking.id.clone(),
            })
            .await
        {
            Ok(authorization) => authorization,
            Err(e) => {
                tracing::warn!(booking_id = %booking.id, error = %e, "Payment authorization failed");
                self.compensate(&booking.id).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .bookings
            .set_booking_payment_intent(&booking.id, &authorization.id)
            .await
        {
            tracing::error!(booking_id = %booking.id, error = %e, "Failed to attach payment intent");
            self.compensate(&booking.id).await;
            return Err(e.into());
        }

        metrics::record_booking_created(&self.currency);
        tracing::info!(
            booking_id = %booking.id,
            customer_id = %customer_id,
            payment_intent_id = %authorization.id,
            total = %booking.total,
            "Booking created"
        );

        Ok(BookingCreated {
            booking: ServiceBooking {
                payment_intent_id: Some(authorization.id),
                ..booking
            },
            client_secret: authorization.client_secret,
        })
    }

    /// Delete a booking whose authorization did not go through.
    async fn compensate(&self, booking_id: &str) {
        match self.bookings.delete_booking(booking_id).await {
            Ok(()) => {
                metrics::record_compensation("booking");
                tracing::info!(booking_id = %booking_id, "Booking released after payment failure");
            }
            Err(e) => {
                tracing::error!(
                    booking_id = %booking_id,
                    error = %e,
                    "Compensating delete failed; booking needs manual reconciliation"
                );
            }
        }
    }

    pub async fn confirm_payment(
        &self,
        customer_id: &str,
        booking_id: &str,
    ) -> Result<ServiceBooking, BookingError> {
        let booking = self.find_booking(customer_id, booking_id).await?;
        if !booking.is_paid() {
            return Err(BookingError::validation("Payment not completed"));
        }
        Ok(booking)
    }

    pub async fn list_bookings(
        &self,
        customer_id: &str,
        filter: &BookingFilter,
    ) -> Result<(Vec<ServiceBooking>, u64), BookingError> {
        Ok(self
            .bookings
            .list_customer_bookings(customer_id, filter)
            .await?)
    }

    /// Paid bookings unless another payment status is asked for.
    pub async fn list_payments(
        &self,
        customer_id: &str,
        mut filter: BookingFilter,
    ) -> Result<(Vec<ServiceBooking>, u64), BookingError> {
        filter.payment_status.get_or_insert(PaymentStatus::Paid);
        self.list_bookings(customer_id, &filter).await
    }

    /// Processor-side status of a booking's authorization.
    pub async fn retrieve_booking_payment(
        &self,
        customer_id: &str,
        booking_id: &str,
    ) -> Result<AuthorizationDetails, BookingError> {
        let booking = self.find_booking(customer_id, booking_id).await?;
        let intent_id = booking
            .payment_intent_id
            .ok_or_else(|| BookingError::NotFound("Payment not found".to_string()))?;
        Ok(self.gateway.retrieve_authorization(&intent_id).await?)
    }

    /// Admin transition between `pending` and `completed`, for any customer's
    /// booking. Payment state is left untouched.
    pub async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<ServiceBooking, BookingError> {
        self.bookings
            .set_booking_status(booking_id, status)
            .await?
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))
    }

    async fn find_booking(
        &self,
        customer_id: &str,
        booking_id: &str,
    ) -> Result<ServiceBooking, BookingError> {
        self.bookings
            .find_customer_booking(customer_id, booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))
    }

    async fn resolve_services(
        &self,
        selection: &Selection,
    ) -> Result<Vec<ServiceCatalogEntry>, BookingError> {
        match selection {
            Selection::All => {
                let services = self.catalog.list_active_services().await?;
                if services.is_empty() {
                    return Err(BookingError::validation("No active services available"));
                }
                Ok(services)
            }
            Selection::Explicit(ids) if ids.is_empty() => Err(BookingError::validation(
                "At least one service is required",
            )),
            Selection::Explicit(ids) => {
                let services = self.catalog.find_active_services(ids).await?;
                if services.is_empty() {
                    return Err(BookingError::validation(
                        "No active services found for selection",
                    ));
                }
                Ok(services)
            }
        }
    }

    async fn resolve_pets(
        &self,
        customer_id: &str,
        selection: &Selection,
    ) -> Result<Vec<Pet>, BookingError> {
        let pets = match selection {
            Selection::All => self.catalog.list_pets_for_owner(customer_id).await?,
            Selection::Explicit(ids) if ids.is_empty() => {
                return Err(BookingError::validation("At least one pet is required"));
            }
            Selection::Explicit(ids) => self.catalog.find_owned_pets(customer_id, ids).await?,
        };
        if pets.is_empty() {
            return Err(BookingError::validation("No pets found for selection"));
        }
        Ok(pets)
    }
}

/// One item per service and pet, priced from the catalog.
fn build_items(services: &[ServiceCatalogEntry], pets: &[Pet]) -> Vec<BookingItem> {
    services
        .iter()
        .flat_map(|service| {
            pets.iter().map(move |pet| BookingItem {
                service_id: service.id.clone(),
                pet_id: pet.id.clone(),
                service_name: service.name.clone(),
                service_type: service.service_type,
                pet_name: pet.name.clone(),
                pet_type: pet.species.clone(),
                pet_breed: pet.breed.clone().unwrap_or_default(),
                pet_age: pet.age,
                unit_price: service.price,
            })
        })
        .collect()
}
