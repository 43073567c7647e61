#![allow(dead_code)]

use booking_service::config::{
    AdoptionConfig, BookingConfig, BusinessConfig, MongoConfig, StripeConfig,
};
use booking_service::models::{
    AdoptionBasket, AdoptionListing, BasketItem, ListingStatus, Pet, ServiceCatalogEntry,
    ServiceType,
};
use booking_service::services::{InMemoryStore, MockPaymentGateway};
use booking_service::{AppState, Application};
use chrono::{Duration, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::utils::signature::generate_webhook_header;
use std::sync::Arc;

pub const CUSTOMER_ID: &str = "customer-1";
pub const OTHER_CUSTOMER_ID: &str = "customer-2";
pub const ADMIN_ID: &str = "admin-1";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub client: Client,
}

pub fn test_config() -> BookingConfig {
    let mut common = service_core::config::Config::default();
    common.port = 0;

    BookingConfig {
        common,
        mongodb: MongoConfig {
            uri: "mongodb://unused".to_string(),
            database: "booking_test".to_string(),
        },
        stripe: StripeConfig {
            webhook_secret: Some(Secret::new(WEBHOOK_SECRET.to_string())),
            ..StripeConfig::default()
        },
        business: BusinessConfig::default(),
        adoption: AdoptionConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    /// Serve the full router over the in-memory store and mock gateway.
    pub async fn spawn_with(config: BookingConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());

        let state = AppState::new(config, store.clone(), gateway.clone());
        let app = Application::with_state(state, 0)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            store,
            gateway,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn as_customer(&self, builder: RequestBuilder, customer_id: &str) -> RequestBuilder {
        builder.header("X-User-ID", customer_id)
    }

    pub fn as_admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-User-ID", ADMIN_ID)
            .header("X-User-Role", "admin")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.as_customer(self.client.get(self.url(path)), CUSTOMER_ID)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Response {
        self.as_customer(self.client.post(self.url(path)), CUSTOMER_ID)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_booking(&self, scheduled_at: &str) -> Response {
        self.post_json(
            "/bookings",
            &serde_json::json!({
                "selectAllServices": true,
                "selectAllPets": true,
                "scheduledAt": scheduled_at,
            }),
        )
        .await
    }

    /// Available slots for `date`, as returned by the API.
    pub async fn slots(&self, date: &str) -> Vec<String> {
        let response = self
            .get(&format!("/bookings/availability?date={}", date))
            .await;
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        body["data"]["slots"]
            .as_array()
            .expect("slots array")
            .iter()
            .map(|slot| slot.as_str().expect("slot string").to_string())
            .collect()
    }

    /// Deliver a correctly signed payment event.
    pub async fn send_event(&self, event: &serde_json::Value) -> Response {
        let payload = serde_json::to_vec(event).expect("serializable event");
        let header = generate_webhook_header(WEBHOOK_SECRET, Utc::now().timestamp(), &payload)
            .expect("signature");
        self.send_raw_event(payload, Some(header)).await
    }

    pub async fn send_raw_event(&self, payload: Vec<u8>, signature: Option<String>) -> Response {
        let mut request = self
            .client
            .post(self.url("/webhooks/payments"))
            .header("content-type", "application/json")
            .body(payload);
        if let Some(signature) = signature {
            request = request.header("Stripe-Signature", signature);
        }
        request.send().await.expect("Failed to execute request")
    }

    /// One grooming service at 40.00 and two pets for [`CUSTOMER_ID`].
    pub fn seed_catalog(&self) {
        self.store.add_service(service("svc-bath", "Bath", Decimal::new(4000, 2)));
        self.store.add_pet(pet("pet-rex", CUSTOMER_ID, "Rex"));
        self.store.add_pet(pet("pet-milo", CUSTOMER_ID, "Milo"));
    }

    /// Two available listings in [`CUSTOMER_ID`]'s basket.
    pub fn seed_basket(&self) {
        self.store
            .add_listing(listing("luna", Decimal::new(7500, 2), ListingStatus::Available));
        self.store
            .add_listing(listing("tom", Decimal::new(5000, 2), ListingStatus::Available));
        self.store.put_basket(AdoptionBasket {
            customer_id: CUSTOMER_ID.to_string(),
            items: ["luna", "tom"]
                .iter()
                .map(|id| BasketItem {
                    listing_id: id.to_string(),
                    added_at: BsonDateTime::now(),
                })
                .collect(),
            updated_at: BsonDateTime::now(),
        });
    }
}

/// A business date safely in the future (UTC business offset in tests).
pub fn future_date() -> String {
    (Utc::now() + Duration::days(3))
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}

pub fn succeeded_event(event_id: &str, intent_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": intent_id, "object": "payment_intent" } }
    })
}

pub fn service(id: &str, name: &str, price: Decimal) -> ServiceCatalogEntry {
    ServiceCatalogEntry {
        id: id.to_string(),
        name: name.to_string(),
        service_type: ServiceType::Grooming,
        price,
        is_active: true,
        created_at: BsonDateTime::now(),
    }
}

pub fn pet(id: &str, owner_id: &str, name: &str) -> Pet {
    Pet {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        name: name.to_string(),
        species: "dog".to_string(),
        breed: None,
        age: Some(4),
    }
}

pub fn listing(id: &str, fee: Decimal, status: ListingStatus) -> AdoptionListing {
    let now = BsonDateTime::now();
    AdoptionListing {
        id: id.to_string(),
        title: format!("Meet {}", id),
        pet_name: id.to_string(),
        species: "cat".to_string(),
        breed: Some("tabby".to_string()),
        age: Some(2),
        gender: Some("female".to_string()),
        avatar_url: None,
        adoption_fee: fee,
        status,
        created_at: now,
        updated_at: now,
    }
}
