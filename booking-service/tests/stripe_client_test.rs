use booking_service::config::StripeConfig;
use booking_service::services::providers::{
    AuthorizationRequest, PaymentError, PaymentGateway, StripeClient,
};
use secrecy::Secret;
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> StripeClient {
    StripeClient::new(StripeConfig {
        secret_key: Secret::new("sk_test_123".to_string()),
        api_base_url: server.uri(),
        timeout_seconds: 2,
        ..StripeConfig::default()
    })
    .expect("client")
}

fn request(amount_minor: i64) -> AuthorizationRequest {
    let mut metadata = BTreeMap::new();
    metadata.insert("bookingId".to_string(), "booking-1".to_string());
    AuthorizationRequest {
        amount_minor,
        currency: "USD".to_string(),
        metadata,
        idempotency_key: "booking-1".to_string(),
    }
}

#[tokio::test]
async fn creates_payment_intent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(header("Idempotency-Key", "booking-1"))
        .and(body_string_contains("amount=8000"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("metadata%5BbookingId%5D=booking-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "client_secret": "pi_123_secret_abc",
            "status": "requires_payment_method",
            "amount": 8000,
            "currency": "usd"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authorization = client_for(&server)
        .create_authorization(request(8000))
        .await
        .expect("authorization");

    assert_eq!(authorization.id, "pi_123");
    assert_eq!(authorization.client_secret, "pi_123_secret_abc");
}

#[tokio::test]
async fn processor_error_is_rejected_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_authorization(request(8000))
        .await
        .unwrap_err();

    match err {
        PaymentError::Rejected(message) => {
            assert_eq!(message, "card_declined - Your card was declined.")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn missing_client_secret_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "client_secret": null,
            "status": "requires_payment_method",
            "amount": 8000,
            "currency": "usd"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_authorization(request(8000))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::MissingClientSecret));
}

#[tokio::test]
async fn non_positive_amount_never_reaches_processor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_authorization(request(0))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount(_)));
}

#[tokio::test]
async fn slow_processor_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_authorization(request(8000))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Timeout));
}

#[tokio::test]
async fn retrieves_payment_intent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payment_intents/pi_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "client_secret": "pi_123_secret_abc",
            "status": "succeeded",
            "amount": 8000,
            "currency": "usd"
        })))
        .mount(&server)
        .await;

    let details = client_for(&server)
        .retrieve_authorization("pi_123")
        .await
        .expect("details");

    assert_eq!(details.status, "succeeded");
    assert_eq!(details.amount_minor, 8000);
}
