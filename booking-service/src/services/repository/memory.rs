//! In-memory store for tests and local runs without MongoDB.
//!
//! Mirrors the Mongo unique indexes (slot instant, adoption request pair,
//! event id). Individual operations can be made to fail to exercise
//! compensation and retry paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{
    AdoptionStore, BookingStore, CatalogStore, EventLog, SettingsStore, StoreError, StoreResult,
};
use crate::models::{
    AdoptionBasket, AdoptionListing, AdoptionOrder, AdoptionRequest, AvailabilitySetting,
    BookingFilter, BookingStatus, ListingStatus, OrderStatus, PaymentStatus, Pet, ProcessedEvent,
    RequestStatus, ServiceBooking, ServiceCatalogEntry, TaxSetting,
};

#[derive(Default)]
struct State {
    services: Vec<ServiceCatalogEntry>,
    pets: Vec<Pet>,
    availability: Vec<AvailabilitySetting>,
    taxes: Vec<TaxSetting>,
    bookings: Vec<ServiceBooking>,
    listings: HashMap<String, AdoptionListing>,
    baskets: HashMap<String, AdoptionBasket>,
    orders: HashMap<String, AdoptionOrder>,
    requests: Vec<AdoptionRequest>,
    events: HashMap<String, ProcessedEvent>,
    failing: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store poisoned")))
    }

    /// Lock and fail if `operation` has been switched to fail.
    fn guard(&self, operation: &str) -> StoreResult<MutexGuard<'_, State>> {
        let state = self.state()?;
        if state.failing.contains(operation) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(state)
    }

    /// Make the named trait operation fail until switched back.
    pub fn set_failing(&self, operation: &str, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            if failing {
                state.failing.insert(operation.to_string());
            } else {
                state.failing.remove(operation);
            }
        }
    }

    pub fn add_service(&self, service: ServiceCatalogEntry) {
        if let Ok(mut state) = self.state.lock() {
            state.services.push(service);
        }
    }

    pub fn add_pet(&self, pet: Pet) {
        if let Ok(mut state) = self.state.lock() {
            state.pets.push(pet);
        }
    }

    pub fn add_listing(&self, listing: AdoptionListing) {
        if let Ok(mut state) = self.state.lock() {
            state.listings.insert(listing.id.clone(), listing);
        }
    }

    pub fn put_basket(&self, basket: AdoptionBasket) {
        if let Ok(mut state) = self.state.lock() {
            state.baskets.insert(basket.customer_id.clone(), basket);
        }
    }

    pub fn bookings(&self) -> Vec<ServiceBooking> {
        self.state
            .lock()
            .map(|state| state.bookings.clone())
            .unwrap_or_default()
    }

    pub fn orders(&self) -> Vec<AdoptionOrder> {
        self.state
            .lock()
            .map(|state| state.orders.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn listing(&self, id: &str) -> Option<AdoptionListing> {
        self.state.lock().ok()?.listings.get(id).cloned()
    }

    pub fn basket(&self, customer_id: &str) -> Option<AdoptionBasket> {
        self.state.lock().ok()?.baskets.get(customer_id).cloned()
    }

    pub fn requests(&self) -> Vec<AdoptionRequest> {
        self.state
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    pub fn taxes(&self) -> Vec<TaxSetting> {
        self.state
            .lock()
            .map(|state| state.taxes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_active_services(&self) -> StoreResult<Vec<ServiceCatalogEntry>> {
        let state = self.guard("list_active_services")?;
        let mut services: Vec<_> = state
            .services
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        services.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(services)
    }

    async fn find_active_services(&self, ids: &[String]) -> StoreResult<Vec<ServiceCatalogEntry>> {
        let state = self.guard("find_active_services")?;
        Ok(state
            .services
            .iter()
            .filter(|s| s.is_active && ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn list_pets_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Pet>> {
        let state = self.guard("list_pets_for_owner")?;
        Ok(state
            .pets
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn find_owned_pets(&self, owner_id: &str, ids: &[String]) -> StoreResult<Vec<Pet>> {
        let state = self.guard("find_owned_pets")?;
        Ok(state
            .pets
            .iter()
            .filter(|p| p.owner_id == owner_id && ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn latest_availability_setting(&self) -> StoreResult<Option<AvailabilitySetting>> {
        let state = self.guard("latest_availability_setting")?;
        Ok(state
            .availability
            .iter()
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn save_availability_setting(&self, setting: AvailabilitySetting) -> StoreResult<()> {
        let mut state = self.guard("save_availability_setting")?;
        state.availability.retain(|s| s.id != setting.id);
        state.availability.push(setting);
        Ok(())
    }

    async fn latest_active_tax(&self) -> StoreResult<Option<TaxSetting>> {
        let state = self.guard("latest_active_tax")?;
        Ok(state
            .taxes
            .iter()
            .filter(|t| t.is_active)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn deactivate_all_taxes(&self) -> StoreResult<()> {
        let mut state = self.guard("deactivate_all_taxes")?;
        let now = BsonDateTime::now();
        for tax in state.taxes.iter_mut().filter(|t| t.is_active) {
            tax.is_active = false;
            tax.updated_at = now;
        }
        Ok(())
    }

    async fn insert_tax(&self, tax: TaxSetting) -> StoreResult<()> {
        let mut state = self.guard("insert_tax")?;
        state.taxes.push(tax);
        Ok(())
    }

    async fn update_tax_percent(&self, id: &str, percent: Decimal) -> StoreResult<bool> {
        let mut state = self.guard("update_tax_percent")?;
        match state.taxes.iter_mut().find(|t| t.id == id) {
            Some(tax) => {
                tax.percent = percent;
                tax.updated_at = BsonDateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_booking(&self, booking: ServiceBooking) -> StoreResult<()> {
        let mut state = self.guard("insert_booking")?;
        if state
            .bookings
            .iter()
            .any(|b| b.scheduled_at == booking.scheduled_at)
        {
            return Err(StoreError::Duplicate(format!(
                "scheduled_at {}",
                booking.scheduled_at
            )));
        }
        state.bookings.push(booking);
        Ok(())
    }

    async fn booked_instants(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let state = self.guard("booked_instants")?;
        Ok(state
            .bookings
            .iter()
            .map(|b| b.scheduled_at.to_chrono())
            .filter(|at| *at >= start && *at < end)
            .collect())
    }

    async fn set_booking_payment_intent(
        &self,
        booking_id: &str,
        intent_id: &str,
    ) -> StoreResult<()> {
        let mut state = self.guard("set_booking_payment_intent")?;
        if let Some(booking) = state.bookings.iter_mut().find(|b| b.id == booking_id) {
            booking.payment_intent_id = Some(intent_id.to_string());
            booking.updated_at = BsonDateTime::now();
        }
        Ok(())
    }

    async fn delete_booking(&self, booking_id: &str) -> StoreResult<()> {
        let mut state = self.guard("delete_booking")?;
        state.bookings.retain(|b| b.id != booking_id);
        Ok(())
    }

    async fn set_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> StoreResult<Option<ServiceBooking>> {
        let mut state = self.guard("set_booking_status")?;
        Ok(state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .map(|booking| {
                booking.status = status;
                booking.updated_at = BsonDateTime::now();
                booking.clone()
            }))
    }

    async fn find_customer_booking(
        &self,
        customer_id: &str,
        booking_id: &str,
    ) -> StoreResult<Option<ServiceBooking>> {
        let state = self.guard("find_customer_booking")?;
        Ok(state
            .bookings
            .iter()
            .find(|b| b.id == booking_id && b.customer_id == customer_id)
            .cloned())
    }

    async fn list_customer_bookings(
        &self,
        customer_id: &str,
        filter: &BookingFilter,
    ) -> StoreResult<(Vec<ServiceBooking>, u64)> {
        let state = self.guard("list_customer_bookings")?;
        let mut matching: Vec<_> = state
            .bookings
            .iter()
            .filter(|b| b.customer_id == customer_id)
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.payment_status.map_or(true, |s| b.payment_status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.skip() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn mark_booking_paid(
        &self,
        intent_id: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.guard("mark_booking_paid")?;
        let paid_at = BsonDateTime::from_chrono(paid_at);
        match state.bookings.iter_mut().find(|b| {
            b.payment_intent_id.as_deref() == Some(intent_id)
                && b.payment_status == PaymentStatus::Unpaid
        }) {
            Some(booking) => {
                booking.payment_status = PaymentStatus::Paid;
                booking.paid_at = Some(paid_at);
                booking.updated_at = paid_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AdoptionStore for InMemoryStore {
    async fn get_basket(&self, customer_id: &str) -> StoreResult<Option<AdoptionBasket>> {
        let state = self.guard("get_basket")?;
        Ok(state.baskets.get(customer_id).cloned())
    }

    async fn find_listings(&self, ids: &[String]) -> StoreResult<Vec<AdoptionListing>> {
        let state = self.guard("find_listings")?;
        Ok(ids
            .iter()
            .filter_map(|id| state.listings.get(id).cloned())
            .collect())
    }

    async fn insert_order(&self, order: AdoptionOrder) -> StoreResult<()> {
        let mut state = self.guard("insert_order")?;
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(format!("_id {}", order.id)));
        }
        state.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn set_order_payment_intent(&self, order_id: &str, intent_id: &str) -> StoreResult<()> {
        let mut state = self.guard("set_order_payment_intent")?;
        if let Some(order) = state.orders.get_mut(order_id) {
            order.payment_intent_id = Some(intent_id.to_string());
            order.updated_at = BsonDateTime::now();
        }
        Ok(())
    }

    async fn delete_order(&self, order_id: &str) -> StoreResult<()> {
        let mut state = self.guard("delete_order")?;
        state.orders.remove(order_id);
        Ok(())
    }

    async fn find_order_by_intent(&self, intent_id: &str) -> StoreResult<Option<AdoptionOrder>> {
        let state = self.guard("find_order_by_intent")?;
        Ok(state
            .orders
            .values()
            .find(|o| o.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn mark_order_paid(&self, intent_id: &str, paid_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.guard("mark_order_paid")?;
        let paid_at = BsonDateTime::from_chrono(paid_at);
        match state.orders.values_mut().find(|o| {
            o.payment_intent_id.as_deref() == Some(intent_id)
                && o.payment_status == PaymentStatus::Unpaid
        }) {
            Some(order) => {
                order.payment_status = PaymentStatus::Paid;
                order.status = OrderStatus::Paid;
                order.paid_at = Some(paid_at);
                order.updated_at = paid_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_listings_pending(&self, ids: &[String]) -> StoreResult<u64> {
        let mut state = self.guard("mark_listings_pending")?;
        let now = BsonDateTime::now();
        let mut moved = 0;
        for id in ids {
            if let Some(listing) = state.listings.get_mut(id) {
                if listing.status == ListingStatus::Available {
                    listing.status = ListingStatus::Pending;
                    listing.updated_at = now;
                    moved += 1;
                }
            }
        }
        Ok(moved)
    }

    async fn upsert_adoption_request(
        &self,
        listing_id: &str,
        customer_id: &str,
    ) -> StoreResult<()> {
        let mut state = self.guard("upsert_adoption_request")?;
        let now = BsonDateTime::now();
        match state
            .requests
            .iter_mut()
            .find(|r| r.listing_id == listing_id && r.customer_id == customer_id)
        {
            Some(request) => {
                request.status = RequestStatus::Pending;
                request.updated_at = now;
            }
            None => state.requests.push(AdoptionRequest {
                id: uuid::Uuid::new_v4().to_string(),
                listing_id: listing_id.to_string(),
                customer_id: customer_id.to_string(),
                status: RequestStatus::Pending,
                created_at: now,
                updated_at: now,
            }),
        }
        Ok(())
    }

    async fn clear_basket(&self, customer_id: &str) -> StoreResult<()> {
        let mut state = self.guard("clear_basket")?;
        if let Some(basket) = state.baskets.get_mut(customer_id) {
            basket.items.clear();
            basket.updated_at = BsonDateTime::now();
        }
        Ok(())
    }

    async fn mark_order_fulfilled(&self, order_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.guard("mark_order_fulfilled")?;
        if let Some(order) = state.orders.get_mut(order_id) {
            let at = BsonDateTime::from_chrono(at);
            order.fulfilled_at = Some(at);
            order.updated_at = at;
        }
        Ok(())
    }
}

#[async_trait]
impl EventLog for InMemoryStore {
    async fn is_processed(&self, event_id: &str) -> StoreResult<bool> {
        let state = self.guard("is_processed")?;
        Ok(state.events.contains_key(event_id))
    }

    async fn record_processed(&self, event: ProcessedEvent) -> StoreResult<()> {
        let mut state = self.guard("record_processed")?;
        state.events.entry(event.event_id.clone()).or_insert(event);
        Ok(())
    }
}
