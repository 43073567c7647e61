//! Adoption checkout: turns a customer's basket into a pending order with a
//! payment authorization. The payment event later completes the order.

use mongodb::bson::DateTime as BsonDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::metrics;
use super::pricing;
use super::providers::{AuthorizationRequest, PaymentError, PaymentGateway};
use super::repository::AdoptionStore;
use super::settings::SettingsService;
use crate::error::BookingError;
use crate::models::{AdoptionOrder, CustomerInfo, OrderItem, OrderStatus, PaymentStatus};

#[derive(Debug, Clone)]
pub struct OrderCreated {
    pub order: AdoptionOrder,
    pub client_secret: String,
}

/// Flat fees added on top of taxed subtotal.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFees {
    pub processing: Decimal,
    pub shipping: Decimal,
}

#[derive(Clone)]
pub struct AdoptionService {
    store: Arc<dyn AdoptionStore>,
    settings: SettingsService,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    fees: OrderFees,
}

impl AdoptionService {
    pub fn new(
        store: Arc<dyn AdoptionStore>,
        settings: SettingsService,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
        fees: OrderFees,
    ) -> Self {
        Self {
            store,
            settings,
            gateway,
            currency,
            fees,
        }
    }

    pub async fn create_order(
        &self,
        customer_id: &str,
        customer_info: CustomerInfo,
    ) -> Result<OrderCreated, BookingError> {
        let basket = self
            .store
            .get_basket(customer_id)
            .await?
            .filter(|basket| !basket.items.is_empty())
            .ok_or_else(|| BookingError::validation("Basket is empty"))?;

        let listing_ids: Vec<String> = basket
            .items
            .iter()
            .map(|item| item.listing_id.clone())
            .collect();
        let listings = self.store.find_listings(&listing_ids).await?;

        let mut items = Vec::with_capacity(listing_ids.len());
        for listing_id in &listing_ids {
            let listing = listings
                .iter()
                .find(|listing| &listing.id == listing_id)
                .filter(|listing| listing.is_purchasable())
                .ok_or_else(|| {
                    BookingError::Conflict(format!(
                        "Listing {} is no longer available",
                        listing_id
                    ))
                })?;
            items.push(OrderItem {
                listing_id: listing.id.clone(),
                pet_name: listing.pet_name.clone(),
                pet_type: listing.species.clone(),
                pet_breed: listing.breed.clone().unwrap_or_default(),
                pet_age: listing.age,
                pet_gender: listing.gender.clone().unwrap_or_default(),
                avatar_url: listing.avatar_url.clone(),
                price: listing.adoption_fee,
            });
        }

        let subtotal = pricing::subtotal(items.iter().map(|item| item.price));
        let tax_percent = self.settings.current_tax_percent().await?;
        let totals = pricing::calculate_totals(subtotal, tax_percent);
        let processing_fee = pricing::round2(self.fees.processing);
        let shipping_fee = pricing::round2(self.fees.shipping);
        let total = pricing::round2(totals.total + processing_fee + shipping_fee);
        let amount_minor = pricing::to_minor_units(total)
            .ok_or_else(|| PaymentError::InvalidAmount(total.to_string()))?;

        let now = BsonDateTime::now();
        let order = AdoptionOrder {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            items,
            customer_info,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            subtotal,
            tax_percent,
            tax_amount: totals.tax_amount,
            processing_fee,
            shipping_fee,
            total,
            currency: self.currency.clone(),
            payment_intent_id: None,
            paid_at: None,
            fulfilled_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_order(order.clone()).await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("orderId".to_string(), order.id.clone());
        metadata.insert("userId".to_string(), customer_id.to_string());

        let authorization = match self
            .gateway
            .create_authorization(AuthorizationRequest {
                amount_minor,
                currency: self.currency.clone(),
                metadata,
                idempotency_key: order.id.clone(),
            })
            .await
        {
            Ok(authorization) => authorization,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Payment authorization failed");
                self.compensate(&order.id).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .store
            .set_order_payment_intent(&order.id, &authorization.id)
            .await
        {
            tracing::error!(order_id = %order.id, error = %e, "Failed to attach payment intent");
            self.compensate(&order.id).await;
            return Err(e.into());
        }

        tracing::info!(
            order_id = %order.id,
            customer_id = %customer_id,
            payment_intent_id = %authorization.id,
            total = %order.total,
            "Adoption order created"
        );

        Ok(OrderCreated {
            order: AdoptionOrder {
                payment_intent_id: Some(authorization.id),
                ..order
            },
            client_secret: authorization.client_secret,
        })
    }

    async fn compensate(&self, order_id: &str) {
        match self.store.delete_order(order_id).await {
            Ok(()) => metrics::record_compensation("adoption_order"),
            Err(e) => tracing::error!(
                order_id = %order_id,
                error = %e,
                "Compensating delete failed; order needs manual reconciliation"
            ),
        }
    }
}
