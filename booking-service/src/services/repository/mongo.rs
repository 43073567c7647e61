use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions,
    ReplaceOptions, ReturnDocument, UpdateOptions,
};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    Client, Collection, Database, IndexModel,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;

use super::{
    AdoptionStore, BookingStore, CatalogStore, EventLog, SettingsStore, StoreError, StoreResult,
};
use crate::models::{
    AdoptionBasket, AdoptionListing, AdoptionOrder, AdoptionRequest, AvailabilitySetting,
    BookingFilter, BookingStatus, Pet, ProcessedEvent, ServiceBooking, ServiceCatalogEntry, TaxSetting,
};

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::DatabaseError(e.into())
        })?;
        client_options.app_name = Some("booking-service".to_string());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::DatabaseError(e.into())
        })?;

        tracing::info!(database = %database, "MongoDB client ready");
        Ok(Self::new(client.database(database)))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn bookings(&self) -> Collection<ServiceBooking> {
        self.db.collection("service_bookings")
    }

    fn services(&self) -> Collection<ServiceCatalogEntry> {
        self.db.collection("services")
    }

    fn pets(&self) -> Collection<Pet> {
        self.db.collection("pets")
    }

    fn availability_settings(&self) -> Collection<AvailabilitySetting> {
        self.db.collection("availability_settings")
    }

    fn tax_settings(&self) -> Collection<TaxSetting> {
        self.db.collection("tax_settings")
    }

    fn listings(&self) -> Collection<AdoptionListing> {
        self.db.collection("adoption_listings")
    }

    fn baskets(&self) -> Collection<AdoptionBasket> {
        self.db.collection("adoption_baskets")
    }

    fn orders(&self) -> Collection<AdoptionOrder> {
        self.db.collection("adoption_orders")
    }

    fn requests(&self) -> Collection<AdoptionRequest> {
        self.db.collection("adoption_requests")
    }

    fn processed_events(&self) -> Collection<ProcessedEvent> {
        self.db.collection("processed_payment_events")
    }

    /// Create indexes, including the unique slot index that guarantees one
    /// booking per instant.
    pub async fn init_indexes(&self) -> anyhow::Result<()> {
        let slot_index = IndexModel::builder()
            .keys(doc! { "scheduled_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("booking_slot_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let customer_booking_index = IndexModel::builder()
            .keys(doc! { "customer_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("booking_customer_idx".to_string())
                    .build(),
            )
            .build();

        let booking_intent_index = IndexModel::builder()
            .keys(doc! { "payment_intent_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("booking_payment_intent_idx".to_string())
                    .build(),
            )
            .build();

        self.bookings()
            .create_indexes(
                [slot_index, customer_booking_index, booking_intent_index],
                None,
            )
            .await?;

        let order_intent_index = IndexModel::builder()
            .keys(doc! { "payment_intent_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("order_payment_intent_idx".to_string())
                    .build(),
            )
            .build();

        self.orders().create_index(order_intent_index, None).await?;

        let request_index = IndexModel::builder()
            .keys(doc! { "listing_id": 1, "customer_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("adoption_request_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.requests().create_index(request_index, None).await?;

        let active_service_index = IndexModel::builder()
            .keys(doc! { "is_active": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("service_active_idx".to_string())
                    .build(),
            )
            .build();

        self.services()
            .create_index(active_service_index, None)
            .await?;

        let owner_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1 })
            .options(IndexOptions::builder().name("pet_owner_idx".to_string()).build())
            .build();

        self.pets().create_index(owner_index, None).await?;

        let active_tax_index = IndexModel::builder()
            .keys(doc! { "is_active": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("tax_active_idx".to_string())
                    .build(),
            )
            .build();

        self.tax_settings()
            .create_index(active_tax_index, None)
            .await?;

        tracing::info!("Booking service indexes initialized");
        Ok(())
    }
}

fn money(value: Decimal) -> StoreResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("amount out of range: {}", value)))
}

fn ignore_duplicate(result: StoreResult<()>) -> StoreResult<()> {
    match result {
        Err(StoreError::Duplicate(_)) => Ok(()),
        other => other,
    }
}

fn booking_filter(customer_id: &str, filter: &BookingFilter) -> StoreResult<Document> {
    let mut query = doc! { "customer_id": customer_id };
    if let Some(status) = filter.status {
        query.insert("status", mongodb::bson::to_bson(&status)?);
    }
    if let Some(payment_status) = filter.payment_status {
        query.insert("payment_status", mongodb::bson::to_bson(&payment_status)?);
    }
    Ok(query)
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn list_active_services(&self) -> StoreResult<Vec<ServiceCatalogEntry>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .services()
            .find(doc! { "is_active": true }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_active_services(&self, ids: &[String]) -> StoreResult<Vec<ServiceCatalogEntry>> {
        let cursor = self
            .services()
            .find(
                doc! { "_id": { "$in": ids.to_vec() }, "is_active": true },
                None,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_pets_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Pet>> {
        let cursor = self.pets().find(doc! { "owner_id": owner_id }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_owned_pets(&self, owner_id: &str, ids: &[String]) -> StoreResult<Vec<Pet>> {
        let cursor = self
            .pets()
            .find(
                doc! { "_id": { "$in": ids.to_vec() }, "owner_id": owner_id },
                None,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl SettingsStore for MongoStore {
    async fn latest_availability_setting(&self) -> StoreResult<Option<AvailabilitySetting>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .build();
        Ok(self.availability_settings().find_one(None, options).await?)
    }

    async fn save_availability_setting(&self, setting: AvailabilitySetting) -> StoreResult<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.availability_settings()
            .replace_one(doc! { "_id": setting.id.as_str() }, &setting, options)
            .await?;
        Ok(())
    }

    async fn latest_active_tax(&self) -> StoreResult<Option<TaxSetting>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        Ok(self
            .tax_settings()
            .find_one(doc! { "is_active": true }, options)
            .await?)
    }

    async fn deactivate_all_taxes(&self) -> StoreResult<()> {
        self.tax_settings()
            .update_many(
                doc! { "is_active": true },
                doc! { "$set": { "is_active": false, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn insert_tax(&self, tax: TaxSetting) -> StoreResult<()> {
        self.tax_settings().insert_one(tax, None).await?;
        Ok(())
    }

    async fn update_tax_percent(&self, id: &str, percent: Decimal) -> StoreResult<bool> {
        let result = self
            .tax_settings()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "percent": money(percent)?, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl BookingStore for MongoStore {
    async fn insert_booking(&self, booking: ServiceBooking) -> StoreResult<()> {
        self.bookings().insert_one(booking, None).await?;
        Ok(())
    }

    async fn booked_instants(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let filter = doc! {
            "scheduled_at": {
                "$gte": BsonDateTime::from_chrono(start),
                "$lt": BsonDateTime::from_chrono(end),
            }
        };
        let bookings: Vec<ServiceBooking> =
            self.bookings().find(filter, None).await?.try_collect().await?;
        Ok(bookings
            .into_iter()
            .map(|booking| booking.scheduled_at.to_chrono())
            .collect())
    }

    async fn set_booking_payment_intent(
        &self,
        booking_id: &str,
        intent_id: &str,
    ) -> StoreResult<()> {
        self.bookings()
            .update_one(
                doc! { "_id": booking_id },
                doc! { "$set": { "payment_intent_id": intent_id, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_booking(&self, booking_id: &str) -> StoreResult<()> {
        self.bookings()
            .delete_one(doc! { "_id": booking_id }, None)
            .await?;
        Ok(())
    }

    async fn set_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> StoreResult<Option<ServiceBooking>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .bookings()
            .find_one_and_update(
                doc! { "_id": booking_id },
                doc! { "$set": {
                    "status": mongodb::bson::to_bson(&status)?,
                    "updated_at": BsonDateTime::now(),
                } },
                options,
            )
            .await?)
    }

    async fn find_customer_booking(
        &self,
        customer_id: &str,
        booking_id: &str,
    ) -> StoreResult<Option<ServiceBooking>> {
        Ok(self
            .bookings()
            .find_one(doc! { "_id": booking_id, "customer_id": customer_id }, None)
            .await?)
    }

    async fn list_customer_bookings(
        &self,
        customer_id: &str,
        filter: &BookingFilter,
    ) -> StoreResult<(Vec<ServiceBooking>, u64)> {
        let query = booking_filter(customer_id, filter)?;

        let total = self
            .bookings()
            .count_documents(query.clone(), None)
            .await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(filter.skip())
            .limit(filter.limit as i64)
            .build();

        let bookings = self
            .bookings()
            .find(query, options)
            .await?
            .try_collect()
            .await?;

        Ok((bookings, total))
    }

    async fn mark_booking_paid(
        &self,
        intent_id: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let paid_at = BsonDateTime::from_chrono(paid_at);
        let result = self
            .bookings()
            .update_one(
                doc! { "payment_intent_id": intent_id, "payment_status": "unpaid" },
                doc! { "$set": {
                    "payment_status": "paid",
                    "paid_at": paid_at,
                    "updated_at": paid_at,
                } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }
}

#[async_trait]
impl AdoptionStore for MongoStore {
    async fn get_basket(&self, customer_id: &str) -> StoreResult<Option<AdoptionBasket>> {
        Ok(self
            .baskets()
            .find_one(doc! { "_id": customer_id }, None)
            .await?)
    }

    async fn find_listings(&self, ids: &[String]) -> StoreResult<Vec<AdoptionListing>> {
        let cursor = self
            .listings()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_order(&self, order: AdoptionOrder) -> StoreResult<()> {
        self.orders().insert_one(order, None).await?;
        Ok(())
    }

    async fn set_order_payment_intent(&self, order_id: &str, intent_id: &str) -> StoreResult<()> {
        self.orders()
            .update_one(
                doc! { "_id": order_id },
                doc! { "$set": { "payment_intent_id": intent_id, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_order(&self, order_id: &str) -> StoreResult<()> {
        self.orders().delete_one(doc! { "_id": order_id }, None).await?;
        Ok(())
    }

    async fn find_order_by_intent(&self, intent_id: &str) -> StoreResult<Option<AdoptionOrder>> {
        Ok(self
            .orders()
            .find_one(doc! { "payment_intent_id": intent_id }, None)
            .await?)
    }

    async fn mark_order_paid(&self, intent_id: &str, paid_at: DateTime<Utc>) -> StoreResult<bool> {
        let paid_at = BsonDateTime::from_chrono(paid_at);
        let result = self
            .orders()
            .update_one(
                doc! { "payment_intent_id": intent_id, "payment_status": "unpaid" },
                doc! { "$set": {
                    "payment_status": "paid",
                    "status": "paid",
                    "paid_at": paid_at,
                    "updated_at": paid_at,
                } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn mark_listings_pending(&self, ids: &[String]) -> StoreResult<u64> {
        let result = self
            .listings()
            .update_many(
                doc! { "_id": { "$in": ids.to_vec() }, "status": "available" },
                doc! { "$set": { "status": "pending", "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn upsert_adoption_request(
        &self,
        listing_id: &str,
        customer_id: &str,
    ) -> StoreResult<()> {
        let now = BsonDateTime::now();
        let options = UpdateOptions::builder().upsert(true).build();
        let result = self
            .requests()
            .update_one(
                doc! { "listing_id": listing_id, "customer_id": customer_id },
                doc! {
                    "$set": { "status": "pending", "updated_at": now },
                    "$setOnInsert": {
                        "_id": uuid::Uuid::new_v4().to_string(),
                        "created_at": now,
                    },
                },
                options,
            )
            .await
            .map(|_| ())
            .map_err(StoreError::from);

        // A concurrent upsert created the same pending request.
        ignore_duplicate(result)
    }

    async fn clear_basket(&self, customer_id: &str) -> StoreResult<()> {
        self.baskets()
            .update_one(
                doc! { "_id": customer_id },
                doc! { "$set": { "items": [], "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn mark_order_fulfilled(&self, order_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let at = BsonDateTime::from_chrono(at);
        self.orders()
            .update_one(
                doc! { "_id": order_id },
                doc! { "$set": { "fulfilled_at": at, "updated_at": at } },
                None,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventLog for MongoStore {
    async fn is_processed(&self, event_id: &str) -> StoreResult<bool> {
        let count = self
            .processed_events()
            .count_documents(doc! { "_id": event_id }, None)
            .await?;
        Ok(count > 0)
    }

    async fn record_processed(&self, event: ProcessedEvent) -> StoreResult<()> {
        let result = self
            .processed_events()
            .insert_one(event, None)
            .await
            .map(|_| ())
            .map_err(StoreError::from);
        ignore_duplicate(result)
    }
}
