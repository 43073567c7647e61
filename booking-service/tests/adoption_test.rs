mod common;

use booking_service::models::ListingStatus;
use common::{listing, test_config, TestApp, CUSTOMER_ID};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn order_body() -> Value {
    json!({ "customerInfo": { "name": "Sam", "address": "1 Main St", "phone": "555-0100" } })
}

#[tokio::test]
async fn checkout_creates_pending_order_with_fees() {
    let mut config = test_config();
    config.adoption.processing_fee = Decimal::new(250, 2);
    config.adoption.shipping_fee = Decimal::new(1000, 2);
    let app = TestApp::spawn_with(config).await;
    app.seed_basket();

    let response = app.post_json("/adoption/orders", &order_body()).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    let order = &body["data"]["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "unpaid");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["subtotal"], json!(125.0));
    assert_eq!(order["total"], json!(137.5));
    assert_eq!(order["customerInfo"]["name"], "Sam");
    assert!(body["data"]["clientSecret"].is_string());

    let requests = app.gateway.requests();
    assert_eq!(requests[0].amount_minor, 13750);
    assert_eq!(
        requests[0].metadata.get("userId").map(String::as_str),
        Some(CUSTOMER_ID)
    );

    // The basket is only cleared once payment succeeds
    assert_eq!(app.store.basket(CUSTOMER_ID).unwrap().items.len(), 2);
}

#[tokio::test]
async fn empty_basket_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.post_json("/adoption/orders", &order_body()).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Basket is empty");
}

#[tokio::test]
async fn adopted_listing_blocks_checkout() {
    let app = TestApp::spawn().await;
    app.seed_basket();
    app.store
        .add_listing(listing("tom", Decimal::new(5000, 2), ListingStatus::Adopted));

    let response = app.post_json("/adoption/orders", &order_body()).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Listing tom is no longer available");
    assert!(app.store.orders().is_empty());
}

#[tokio::test]
async fn customer_info_is_validated() {
    let app = TestApp::spawn().await;
    app.seed_basket();

    let response = app
        .post_json(
            "/adoption/orders",
            &json!({ "customerInfo": { "name": "", "address": "1 Main St", "phone": "555" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.post_json("/adoption/orders", &json!({})).await;
    assert_eq!(response.status().as_u16(), 400);
    assert!(app.store.orders().is_empty());
}

#[tokio::test]
async fn failed_authorization_discards_order() {
    let app = TestApp::spawn().await;
    app.seed_basket();
    app.gateway.set_failing(true);

    let response = app.post_json("/adoption/orders", &order_body()).await;
    assert_eq!(response.status().as_u16(), 502);
    assert!(app.store.orders().is_empty());
}
