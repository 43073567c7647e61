//! Request and response bodies for the HTTP surface. All JSON is camelCase.

use mongodb::bson::DateTime as BsonDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    AdoptionOrder, AvailabilitySetting, BookingFilter, BookingItem, BookingStatus, CustomerInfo,
    OrderItem, OrderStatus, PaymentStatus, ReminderType, ServiceBooking, ServiceCatalogEntry,
    ServiceType, TaxSetting,
};
use crate::services::availability::format_slot;
use crate::services::bookings::NewBooking;
use crate::services::providers::AuthorizationDetails;
use crate::services::Selection;

fn timestamp(value: &BsonDateTime) -> String {
    format_slot(&value.to_chrono())
}

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub service_ids: Option<Vec<String>>,
    #[serde(default)]
    pub select_all_services: bool,
    #[serde(default)]
    pub pet_ids: Option<Vec<String>>,
    #[serde(default)]
    pub select_all_pets: bool,
    #[validate(length(min = 1, message = "Scheduled date/time is required"))]
    pub scheduled_at: String,
    #[serde(default)]
    pub reminder_type: ReminderType,
    pub provider_id: Option<String>,
}

impl CreateBookingRequest {
    pub fn into_new_booking(self) -> NewBooking {
        NewBooking {
            services: selection(self.select_all_services, self.service_ids),
            pets: selection(self.select_all_pets, self.pet_ids),
            scheduled_at: self.scheduled_at.trim().to_string(),
            reminder_type: self.reminder_type,
            provider_id: self
                .provider_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}

/// The select-all flag wins over any ids sent alongside it.
fn selection(select_all: bool, ids: Option<Vec<String>>) -> Selection {
    if select_all {
        return Selection::All;
    }
    Selection::Explicit(
        ids.unwrap_or_default()
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect(),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct AvailabilityQuery {
    #[validate(length(equal = 10, message = "Date must be YYYY-MM-DD"))]
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusParam {
    #[default]
    All,
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatusParam {
    #[default]
    All,
    Paid,
    Unpaid,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    #[serde(default)]
    pub status: StatusParam,
    #[serde(default)]
    pub payment_status: PaymentStatusParam,
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u64>,
}

impl BookingListQuery {
    pub fn into_filter(self) -> BookingFilter {
        let defaults = BookingFilter::default();
        BookingFilter {
            status: match self.status {
                StatusParam::All => None,
                StatusParam::Pending => Some(BookingStatus::Pending),
                StatusParam::Completed => Some(BookingStatus::Completed),
            },
            payment_status: match self.payment_status {
                PaymentStatusParam::All => None,
                PaymentStatusParam::Paid => Some(PaymentStatus::Paid),
                PaymentStatusParam::Unpaid => Some(PaymentStatus::Unpaid),
            },
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// Admin body for `PATCH /admin/bookings/:id/status`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingItemResponse {
    pub service_id: String,
    pub pet_id: String,
    pub service_name: String,
    pub service_type: ServiceType,
    pub pet_name: String,
    pub pet_type: String,
    pub pet_breed: String,
    pub pet_age: Option<u32>,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

impl From<BookingItem> for BookingItemResponse {
    fn from(item: BookingItem) -> Self {
        Self {
            service_id: item.service_id,
            pet_id: item.pet_id,
            service_name: item.service_name,
            service_type: item.service_type,
            pet_name: item.pet_name,
            pet_type: item.pet_type,
            pet_breed: item.pet_breed,
            pet_age: item.pet_age,
            unit_price: item.unit_price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub customer_id: String,
    pub provider_id: Option<String>,
    pub pet_ids: Vec<String>,
    pub service_ids: Vec<String>,
    pub items: Vec<BookingItemResponse>,
    pub scheduled_at: String,
    pub reminder_type: ReminderType,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub currency: String,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ServiceBooking> for BookingResponse {
    fn from(booking: ServiceBooking) -> Self {
        Self {
            scheduled_at: timestamp(&booking.scheduled_at),
            paid_at: booking.paid_at.as_ref().map(timestamp),
            created_at: timestamp(&booking.created_at),
            updated_at: timestamp(&booking.updated_at),
            id: booking.id,
            customer_id: booking.customer_id,
            provider_id: booking.provider_id,
            pet_ids: booking.pet_ids,
            service_ids: booking.service_ids,
            items: booking.items.into_iter().map(Into::into).collect(),
            reminder_type: booking.reminder_type,
            status: booking.status,
            payment_status: booking.payment_status,
            payment_intent_id: booking.payment_intent_id,
            subtotal: booking.subtotal,
            tax_percent: booking.tax_percent,
            tax_amount: booking.tax_amount,
            total: booking.total,
            currency: booking.currency,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking: BookingResponse,
    pub client_secret: String,
}

/// Returned once a booking's payment has been reconciled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSummary {
    pub booking_id: String,
    pub services: Vec<String>,
    pub pets: Vec<String>,
    pub appointment_date_time: String,
    pub organization_name: String,
}

impl ConfirmSummary {
    pub fn new(booking: &ServiceBooking, organization_name: &str) -> Self {
        Self {
            booking_id: booking.id.clone(),
            services: booking.service_names(),
            pets: booking.pet_names(),
            appointment_date_time: timestamp(&booking.scheduled_at),
            organization_name: organization_name.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl Paginated<BookingResponse> {
    pub fn bookings(rows: Vec<ServiceBooking>, total: u64, filter: &BookingFilter) -> Self {
        Self {
            data: rows.into_iter().map(Into::into).collect(),
            pagination: Pagination {
                total,
                page: filter.page,
                limit: filter.limit,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub booking_id: String,
    pub payment_intent_id: String,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
}

impl PaymentStatusResponse {
    pub fn new(booking_id: &str, details: AuthorizationDetails) -> Self {
        Self {
            booking_id: booking_id.to_string(),
            payment_intent_id: details.id,
            status: details.status,
            amount: Decimal::new(details.amount_minor, 2),
            currency: details.currency,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog and settings
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub name: String,
    pub service_type: ServiceType,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub created_at: String,
}

impl From<ServiceCatalogEntry> for ServiceResponse {
    fn from(service: ServiceCatalogEntry) -> Self {
        Self {
            created_at: timestamp(&service.created_at),
            id: service.id,
            name: service.name,
            service_type: service.service_type,
            price: service.price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesResponse {
    pub services: Vec<ServiceResponse>,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_percent: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySettingRequest {
    pub start_time: String,
    pub end_time: String,
    pub slot_minutes: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySettingResponse {
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    pub slot_minutes: u32,
    pub updated_at: String,
}

impl From<AvailabilitySetting> for AvailabilitySettingResponse {
    fn from(setting: AvailabilitySetting) -> Self {
        Self {
            updated_at: timestamp(&setting.updated_at),
            id: setting.id,
            start_time: setting.start_time,
            end_time: setting.end_time,
            slot_minutes: setting.slot_minutes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TaxRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub percent: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResponse {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub percent: Decimal,
    pub is_active: bool,
    pub updated_at: String,
}

impl From<TaxSetting> for TaxResponse {
    fn from(tax: TaxSetting) -> Self {
        Self {
            updated_at: timestamp(&tax.updated_at),
            id: tax.id,
            percent: tax.percent,
            is_active: tax.is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Adoption
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerInfoRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
}

impl From<CustomerInfoRequest> for CustomerInfo {
    fn from(info: CustomerInfoRequest) -> Self {
        Self {
            name: info.name.trim().to_string(),
            address: info.address.trim().to_string(),
            phone: info.phone.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(nested)]
    pub customer_info: CustomerInfoRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub listing_id: String,
    pub pet_name: String,
    pub pet_type: String,
    pub pet_breed: String,
    pub pet_age: Option<u32>,
    pub pet_gender: String,
    pub avatar_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            listing_id: item.listing_id,
            pet_name: item.pet_name,
            pet_type: item.pet_type,
            pet_breed: item.pet_breed,
            pet_age: item.pet_age,
            pet_gender: item.pet_gender,
            avatar_url: item.avatar_url,
            price: item.price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItemResponse>,
    pub customer_info: CustomerInfo,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub processing_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub created_at: String,
}

impl From<AdoptionOrder> for OrderResponse {
    fn from(order: AdoptionOrder) -> Self {
        Self {
            created_at: timestamp(&order.created_at),
            id: order.id,
            customer_id: order.customer_id,
            items: order.items.into_iter().map(Into::into).collect(),
            customer_info: order.customer_info,
            status: order.status,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            tax_percent: order.tax_percent,
            tax_amount: order.tax_amount,
            processing_fee: order.processing_fee,
            shipping_fee: order.shipping_fee,
            total: order.total,
            currency: order.currency,
            payment_intent_id: order.payment_intent_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order: OrderResponse,
    pub client_secret: String,
}
