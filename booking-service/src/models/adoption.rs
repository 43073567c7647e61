//! Adoption listings, baskets, orders and requests.
//!
//! Orders share the booking payment pattern: a pending record carries the
//! processor's authorization reference until the payment event marks it paid
//! and triggers the fulfilment cascade.

use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Pending,
    Adopted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionListing {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub pet_name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub adoption_fee: Decimal,
    pub status: ListingStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl AdoptionListing {
    pub fn is_purchasable(&self) -> bool {
        self.status == ListingStatus::Available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketItem {
    pub listing_id: String,
    pub added_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionBasket {
    #[serde(rename = "_id")]
    pub customer_id: String,
    pub items: Vec<BasketItem>,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub listing_id: String,
    pub pet_name: String,
    pub pet_type: String,
    #[serde(default)]
    pub pet_breed: String,
    pub pet_age: Option<u32>,
    #[serde(default)]
    pub pet_gender: String,
    pub avatar_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionOrder {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub customer_info: CustomerInfo,
    pub status: OrderStatus,
    pub payment_status: super::PaymentStatus,
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
    pub paid_at: Option<DateTime>,
    /// Set once every post-payment step (listings, requests, basket) is done.
    pub fulfilled_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl AdoptionOrder {
    pub fn is_paid(&self) -> bool {
        self.payment_status == super::PaymentStatus::Paid
    }

    pub fn listing_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.listing_id.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Delivered,
}

/// One per (listing, customer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub listing_id: String,
    pub customer_id: String,
    pub status: RequestStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
