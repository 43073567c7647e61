//! Storage traits for the booking core.
//!
//! Handlers and services only see these traits. [`MongoStore`] backs
//! production; [`InMemoryStore`] backs tests and enforces the same
//! uniqueness rules.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    AdoptionBasket, AdoptionListing, AdoptionOrder, AvailabilitySetting, BookingFilter,
    BookingStatus, Pet, ProcessedEvent, ServiceBooking, ServiceCatalogEntry, TaxSetting,
};

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique index rejected the write. Carries the offending key.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        let duplicate = match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref write_err))
                if write_err.code == DUPLICATE_KEY_CODE =>
            {
                Some(write_err.message.clone())
            }
            ErrorKind::Command(ref command_err) if command_err.code == DUPLICATE_KEY_CODE => {
                Some(command_err.message.clone())
            }
            _ => None,
        };

        match duplicate {
            Some(message) => StoreError::Duplicate(message),
            None => StoreError::Backend(err.into()),
        }
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Service catalog and pets. Read-only from this service.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active services, newest first.
    async fn list_active_services(&self) -> StoreResult<Vec<ServiceCatalogEntry>>;

    async fn find_active_services(&self, ids: &[String]) -> StoreResult<Vec<ServiceCatalogEntry>>;

    async fn list_pets_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Pet>>;

    async fn find_owned_pets(&self, owner_id: &str, ids: &[String]) -> StoreResult<Vec<Pet>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Most recently updated availability setting, if any.
    async fn latest_availability_setting(&self) -> StoreResult<Option<AvailabilitySetting>>;

    /// Insert or replace by id.
    async fn save_availability_setting(&self, setting: AvailabilitySetting) -> StoreResult<()>;

    /// Most recently created active tax record, if any.
    async fn latest_active_tax(&self) -> StoreResult<Option<TaxSetting>>;

    async fn deactivate_all_taxes(&self) -> StoreResult<()>;

    async fn insert_tax(&self, tax: TaxSetting) -> StoreResult<()>;

    /// Returns false when no record has that id.
    async fn update_tax_percent(&self, id: &str, percent: Decimal) -> StoreResult<bool>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the slot instant is taken.
    async fn insert_booking(&self, booking: ServiceBooking) -> StoreResult<()>;

    /// Instants of bookings with `start <= scheduled_at < end`.
    async fn booked_instants(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>>;

    async fn set_booking_payment_intent(&self, booking_id: &str, intent_id: &str)
        -> StoreResult<()>;

    async fn delete_booking(&self, booking_id: &str) -> StoreResult<()>;

    async fn find_customer_booking(
        &self,
        customer_id: &str,
        booking_id: &str,
    ) -> StoreResult<Option<ServiceBooking>>;

    /// Page of a customer's bookings, newest first, plus the total match count.
    async fn list_customer_bookings(
        &self,
        customer_id: &str,
        filter: &BookingFilter,
    ) -> StoreResult<(Vec<ServiceBooking>, u64)>;

    /// Set the service status of any customer's booking. `None` when the
    /// booking does not exist.
    async fn set_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> StoreResult<Option<ServiceBooking>>;

    /// Conditional `unpaid -> paid`. Returns whether this call made the
    /// transition.
    async fn mark_booking_paid(&self, intent_id: &str, paid_at: DateTime<Utc>)
        -> StoreResult<bool>;
}

#[async_trait]
pub trait AdoptionStore: Send + Sync {
    async fn get_basket(&self, customer_id: &str) -> StoreResult<Option<AdoptionBasket>>;

    async fn find_listings(&self, ids: &[String]) -> StoreResult<Vec<AdoptionListing>>;

    async fn insert_order(&self, order: AdoptionOrder) -> StoreResult<()>;

    async fn set_order_payment_intent(&self, order_id: &str, intent_id: &str) -> StoreResult<()>;

    async fn delete_order(&self, order_id: &str) -> StoreResult<()>;

    async fn find_order_by_intent(&self, intent_id: &str) -> StoreResult<Option<AdoptionOrder>>;

    /// Conditional `unpaid -> paid`. Returns whether this call made the
    /// transition.
    async fn mark_order_paid(&self, intent_id: &str, paid_at: DateTime<Utc>) -> StoreResult<bool>;

    /// `available -> pending` for the given listings. Returns how many moved.
    async fn mark_listings_pending(&self, ids: &[String]) -> StoreResult<u64>;

    /// Create or reset the (listing, customer) request to pending.
    async fn upsert_adoption_request(&self, listing_id: &str, customer_id: &str)
        -> StoreResult<()>;

    async fn clear_basket(&self, customer_id: &str) -> StoreResult<()>;

    async fn mark_order_fulfilled(&self, order_id: &str, at: DateTime<Utc>) -> StoreResult<()>;
}

/// Log of payment events that have been fully applied.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> StoreResult<bool>;

    /// Recording an already-recorded event is not an error.
    async fn record_processed(&self, event: ProcessedEvent) -> StoreResult<()>;
}
