pub mod adoption;
pub mod booking;
pub mod catalog;
pub mod settings;

pub use adoption::{
    AdoptionBasket, AdoptionListing, AdoptionOrder, AdoptionRequest, BasketItem, CustomerInfo,
    ListingStatus, OrderItem, OrderStatus, RequestStatus,
};
pub use booking::{
    BookingFilter, BookingItem, BookingStatus, PaymentStatus, ReminderType, ServiceBooking,
};
pub use catalog::{Pet, ServiceCatalogEntry, ServiceType};
pub use settings::{AvailabilitySetting, OperatingHours, TaxSetting};

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// A payment event that has been fully applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEvent {
    #[serde(rename = "_id")]
    pub event_id: String,
    pub event_type: String,
    pub processed_at: DateTime,
}
