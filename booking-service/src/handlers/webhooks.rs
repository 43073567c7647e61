//! Payment processor webhook.
//!
//! The body is taken as raw bytes: the signature covers the exact payload, so
//! it must be verified before any JSON parsing.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::startup::AppState;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .reconciliation
        .handle_payment_event(&body, signature)
        .await?;

    tracing::debug!(outcome = ?outcome, "Payment webhook handled");

    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
