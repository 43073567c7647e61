use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::{ApiResponse, CreateOrderRequest, CreateOrderResponse};
use crate::middleware::CustomerContext;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// Check out the caller's adoption basket.
pub async fn create_order(
    State(state): State<AppState>,
    customer: CustomerContext,
    ValidatedJson(body): ValidatedJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOrderResponse>>), AppError> {
    let created = state
        .adoption
        .create_order(&customer.customer_id, body.customer_info.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CreateOrderResponse {
            order: created.order.into(),
            client_secret: created.client_secret,
        })),
    ))
}
