mod common;

use common::{future_date, succeeded_event, TestApp, CUSTOMER_ID, OTHER_CUSTOMER_ID};
use serde_json::{json, Value};

#[tokio::test]
async fn availability_lists_default_operating_hours() {
    let app = TestApp::spawn().await;
    let date = future_date();

    let slots = app.slots(&date).await;

    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0], format!("{}T09:00:00.000Z", date));
    assert_eq!(slots[15], format!("{}T16:30:00.000Z", date));
}

#[tokio::test]
async fn availability_requires_caller_identity() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url(&format!("/bookings/availability?date={}", future_date())))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn availability_rejects_malformed_date() {
    let app = TestApp::spawn().await;

    let response = app.get("/bookings/availability?date=07-01-2030").await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.get("/bookings/availability").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn created_booking_holds_its_slot() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let date = future_date();
    let slot = format!("{}T10:00:00.000Z", date);

    let response = app.create_booking(&slot).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    let booking = &body["data"]["booking"];
    assert_eq!(booking["scheduledAt"], slot.as_str());
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["paymentStatus"], "unpaid");
    assert_eq!(booking["items"].as_array().unwrap().len(), 2);
    assert_eq!(booking["total"], json!(80.0));
    assert!(body["data"]["clientSecret"]
        .as_str()
        .unwrap()
        .ends_with("_secret_mock"));

    let requests = app.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_minor, 8000);

    let slots = app.slots(&date).await;
    assert_eq!(slots.len(), 15);
    assert!(!slots.contains(&slot));
}

#[tokio::test]
async fn naive_time_is_read_in_business_offset() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let date = future_date();

    let response = app.create_booking(&format!("{}T11:30", date)).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["data"]["booking"]["scheduledAt"],
        format!("{}T11:30:00.000Z", date)
    );
}

#[tokio::test]
async fn taken_slot_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let slot = format!("{}T10:00:00.000Z", future_date());

    assert_eq!(app.create_booking(&slot).await.status().as_u16(), 201);

    let response = app.create_booking(&slot).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Selected time is not available");

    assert_eq!(app.store.bookings().len(), 1);
    assert_eq!(app.gateway.requests().len(), 1);
}

#[tokio::test]
async fn off_grid_time_is_rejected() {
    let app = TestApp::spawn().await;
    app.seed_catalog();

    let response = app
        .create_booking(&format!("{}T10:10:00.000Z", future_date()))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert!(app.store.bookings().is_empty());
}

#[tokio::test]
async fn concurrent_requests_for_one_slot_have_one_winner() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let slot = format!("{}T13:00:00.000Z", future_date());

    let attempts = (0..6).map(|_| app.create_booking(&slot));
    let responses = futures::future::join_all(attempts).await;

    let created = responses
        .iter()
        .filter(|response| response.status().as_u16() == 201)
        .count();
    let conflicted = responses
        .iter()
        .filter(|response| response.status().as_u16() == 400)
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicted, 5);
    assert_eq!(app.store.bookings().len(), 1);
}

#[tokio::test]
async fn failed_authorization_releases_the_slot() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let date = future_date();
    let slot = format!("{}T09:30:00.000Z", date);

    app.gateway.set_failing(true);
    let response = app.create_booking(&slot).await;
    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(app.store.bookings().is_empty());
    assert!(app.slots(&date).await.contains(&slot));

    app.gateway.set_failing(false);
    assert_eq!(app.create_booking(&slot).await.status().as_u16(), 201);
}

#[tokio::test]
async fn select_all_with_empty_catalog_fails() {
    let app = TestApp::spawn().await;

    let response = app
        .create_booking(&format!("{}T10:00:00.000Z", future_date()))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No active services available");
}

#[tokio::test]
async fn explicit_selection_must_resolve() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let slot = format!("{}T10:00:00.000Z", future_date());

    let response = app
        .post_json(
            "/bookings",
            &json!({ "serviceIds": [], "selectAllPets": true, "scheduledAt": slot }),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "At least one service is required");

    let response = app
        .post_json(
            "/bookings",
            &json!({ "selectAllServices": true, "petIds": ["someone-elses-pet"], "scheduledAt": slot }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No pets found for selection");
}

#[tokio::test]
async fn confirm_requires_reconciled_payment() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let slot = format!("{}T14:00:00.000Z", future_date());

    let body: Value = app.create_booking(&slot).await.json().await.unwrap();
    let booking_id = body["data"]["booking"]["id"].as_str().unwrap().to_string();
    let intent_id = body["data"]["booking"]["paymentIntentId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .post_json(&format!("/bookings/{}/confirm", booking_id), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Payment not completed");

    let response = app.send_event(&succeeded_event("evt_confirm", &intent_id)).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post_json(&format!("/bookings/{}/confirm", booking_id), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let summary = &body["data"];
    assert_eq!(summary["bookingId"], booking_id.as_str());
    assert_eq!(summary["services"], json!(["Bath"]));
    assert_eq!(summary["pets"].as_array().unwrap().len(), 2);
    assert_eq!(summary["appointmentDateTime"], slot.as_str());
    assert_eq!(summary["organizationName"], "Pet Care Center");
}

#[tokio::test]
async fn bookings_are_scoped_to_their_customer() {
    let app = TestApp::spawn().await;
    app.seed_catalog();

    let body: Value = app
        .create_booking(&format!("{}T15:00:00.000Z", future_date()))
        .await
        .json()
        .await
        .unwrap();
    let booking_id = body["data"]["booking"]["id"].as_str().unwrap();

    let response = app
        .as_customer(
            app.client
                .post(app.url(&format!("/bookings/{}/confirm", booking_id))),
            OTHER_CUSTOMER_ID,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Booking not found");
}

#[tokio::test]
async fn list_bookings_filters_and_paginates() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    let date = future_date();

    let mut intents = Vec::new();
    for time in ["09:00", "09:30", "10:00"] {
        let body: Value = app
            .create_booking(&format!("{}T{}:00.000Z", date, time))
            .await
            .json()
            .await
            .unwrap();
        intents.push(
            body["data"]["booking"]["paymentIntentId"]
                .as_str()
                .unwrap()
                .to_string(),
        );
    }
    app.send_event(&succeeded_event("evt_list", &intents[0])).await;

    let body: Value = app
        .get("/bookings?page=1&limit=2")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["pagination"], json!({ "total": 3, "page": 1, "limit": 2 }));

    let body: Value = app
        .get("/bookings?paymentStatus=unpaid")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["pagination"]["total"], 2);

    let body: Value = app.get("/payments").await.json().await.unwrap();
    let paid = body["data"]["data"].as_array().unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0]["paymentStatus"], "paid");
    assert!(paid[0]["paidAt"].is_string());

    let response = app.get("/bookings?limit=500").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn page_beyond_the_end_is_empty() {
    let app = TestApp::spawn().await;
    app.seed_catalog();
    app.create_booking(&format!("{}T09:00:00.000Z", future_date()))
        .await;

    let response = app
        .get(&format!("/bookings?page={}&limit=20", u64::MAX))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["data"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["pagination"]["page"], json!(u64::MAX));
}

#[tokio::test]
async fn payment_status_comes_from_the_processor() {
    let app = TestApp::spawn().await;
    app.seed_catalog();

    let body: Value = app
        .create_booking(&format!("{}T16:00:00.000Z", future_date()))
        .await
        .json()
        .await
        .unwrap();
    let booking_id = body["data"]["booking"]["id"].as_str().unwrap();

    let response = app.get(&format!("/bookings/{}/payment", booking_id)).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "requires_payment_method");
    assert_eq!(body["data"]["amount"], json!(80.0));
    assert_eq!(
        app.store.bookings()[0].customer_id,
        CUSTOMER_ID,
    );
}

#[tokio::test]
async fn admin_completes_a_booking() {
    let app = TestApp::spawn().await;
    app.seed_catalog();

    let body: Value = app
        .create_booking(&format!("{}T12:00:00.000Z", future_date()))
        .await
        .json()
        .await
        .unwrap();
    let booking_id = body["data"]["booking"]["id"].as_str().unwrap().to_string();
    let intent_id = body["data"]["booking"]["paymentIntentId"]
        .as_str()
        .unwrap()
        .to_string();
    app.send_event(&succeeded_event("evt_complete", &intent_id)).await;

    let status_url = app.url(&format!("/admin/bookings/{}/status", booking_id));

    // Customers cannot move their own bookings
    let response = app
        .as_customer(app.client.patch(&status_url), CUSTOMER_ID)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .as_admin(app.client.patch(&status_url))
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["paymentStatus"], "paid");

    let body: Value = app
        .get("/bookings?status=completed")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let body: Value = app
        .get("/payments?status=completed")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["data"][0]["id"], booking_id.as_str());

    let body: Value = app
        .get("/bookings?status=pending")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn booking_status_update_is_validated() {
    let app = TestApp::spawn().await;

    let response = app
        .as_admin(app.client.patch(app.url("/admin/bookings/missing/status")))
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Booking not found");

    let response = app
        .as_admin(app.client.patch(app.url("/admin/bookings/missing/status")))
        .json(&json!({ "status": "cancelled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
