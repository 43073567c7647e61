//! Service catalog and pet records consumed by the booking engine.

use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Vet,
    Grooming,
    Training,
    Walking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub service_type: ServiceType,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime,
}

/// A customer's pet. Owned by the accounts side; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age: Option<u32>,
}
