//! Service booking (the slot reservation) and its line items.

use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::ServiceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    #[default]
    #[serde(rename = "none")]
    NoReminder,
    DayBefore,
    WeekBefore,
}

/// One service × pet pairing, captured at booking time.
///
/// Later catalog or pet edits never change these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingItem {
    pub service_id: String,
    pub pet_id: String,
    pub service_name: String,
    pub service_type: ServiceType,
    pub pet_name: String,
    pub pet_type: String,
    #[serde(default)]
    pub pet_breed: String,
    pub pet_age: Option<u32>,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBooking {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: String,
    pub provider_id: Option<String>,
    pub pet_ids: Vec<String>,
    pub service_ids: Vec<String>,
    pub items: Vec<BookingItem>,
    /// Slot instant; unique across all bookings.
    pub scheduled_at: DateTime,
    pub reminder_type: ReminderType,
    pub reminder_sent_at: Option<DateTime>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Payment-processor authorization reference.
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
    pub paid_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl ServiceBooking {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Distinct service names in first-seen order.
    pub fn service_names(&self) -> Vec<String> {
        distinct(self.items.iter().map(|item| item.service_name.as_str()))
    }

    /// Distinct pet names in first-seen order.
    pub fn pet_names(&self) -> Vec<String> {
        distinct(self.items.iter().map(|item| item.pet_name.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

/// Filters for listing a customer's bookings.
#[derive(Debug, Clone)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub page: u64,
    pub limit: u64,
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            status: None,
            payment_status: None,
            page: 1,
            limit: 20,
        }
    }
}

impl BookingFilter {
    /// Documents to skip for `page`. Saturates, and stays within the signed
    /// range the database accepts.
    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(service: &str, pet: &str) -> BookingItem {
        BookingItem {
            service_id: format!("svc-{}", service),
            pet_id: format!("pet-{}", pet),
            service_name: service.to_string(),
            service_type: ServiceType::Grooming,
            pet_name: pet.to_string(),
            pet_type: "dog".to_string(),
            pet_breed: String::new(),
            pet_age: Some(3),
            unit_price: dec!(25.00),
        }
    }

    #[test]
    fn names_are_deduplicated_in_order() {
        let now = DateTime::now();
        let booking = ServiceBooking {
            id: "b1".to_string(),
            customer_id: "c1".to_string(),
            provider_id: None,
            pet_ids: vec![],
            service_ids: vec![],
            items: vec![
                item("Bath", "Rex"),
                item("Bath", "Milo"),
                item("Nail trim", "Rex"),
                item("Nail trim", "Milo"),
            ],
            scheduled_at: now,
            reminder_type: ReminderType::NoReminder,
            reminder_sent_at: None,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            subtotal: dec!(100.00),
            tax_percent: dec!(0),
            tax_amount: dec!(0),
            total: dec!(100.00),
            currency: "usd".to_string(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(booking.service_names(), vec!["Bath", "Nail trim"]);
        assert_eq!(booking.pet_names(), vec!["Rex", "Milo"]);
        assert!(!booking.is_paid());
    }

    #[test]
    fn reminder_type_wire_names() {
        assert_eq!(
            serde_json::to_value(ReminderType::NoReminder).unwrap(),
            serde_json::json!("none")
        );
        assert_eq!(
            serde_json::to_value(ReminderType::DayBefore).unwrap(),
            serde_json::json!("day_before")
        );
        let parsed: ReminderType = serde_json::from_str("\"week_before\"").unwrap();
        assert_eq!(parsed, ReminderType::WeekBefore);
    }

    #[test]
    fn filter_skip_from_page() {
        let filter = BookingFilter {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(filter.skip(), 40);
        assert_eq!(BookingFilter::default().skip(), 0);
    }

    #[test]
    fn filter_skip_saturates_for_huge_pages() {
        let filter = BookingFilter {
            page: u64::MAX,
            limit: 100,
            ..Default::default()
        };
        assert_eq!(filter.skip(), i64::MAX as u64);
    }
}
