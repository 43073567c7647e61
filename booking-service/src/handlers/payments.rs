//! Payment history and the public service catalog.

use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{
    ApiResponse, BookingListQuery, BookingResponse, Paginated, ServicesResponse,
};
use crate::middleware::CustomerContext;
use crate::startup::AppState;
use crate::utils::ValidatedQuery;

/// Paid bookings unless `paymentStatus` narrows otherwise.
pub async fn list_payments(
    State(state): State<AppState>,
    customer: CustomerContext,
    ValidatedQuery(query): ValidatedQuery<BookingListQuery>,
) -> Result<Json<ApiResponse<Paginated<BookingResponse>>>, AppError> {
    let filter = query.into_filter();
    let (rows, total) = state
        .bookings
        .list_payments(&customer.customer_id, filter.clone())
        .await?;

    Ok(Json(ApiResponse::ok(Paginated::bookings(rows, total, &filter))))
}

pub async fn list_services(
    State(state): State<AppState>,
    _customer: CustomerContext,
) -> Result<Json<ApiResponse<ServicesResponse>>, AppError> {
    let (services, tax_percent) = state.settings.list_active_services().await?;

    Ok(Json(ApiResponse::ok(ServicesResponse {
        services: services.into_iter().map(Into::into).collect(),
        tax_percent,
    })))
}
