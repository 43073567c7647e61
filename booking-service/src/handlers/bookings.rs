//! Booking endpoints: availability, reservation, listing and confirmation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{
    ApiResponse, AvailabilityQuery, AvailabilityResponse, BookingListQuery, BookingResponse,
    ConfirmSummary, CreateBookingRequest, CreateBookingResponse, Paginated,
    PaymentStatusResponse, UpdateBookingStatusRequest,
};
use crate::error::BookingError;
use crate::middleware::{AdminContext, CustomerContext};
use crate::services::availability::{format_slot, parse_date};
use crate::startup::AppState;
use crate::utils::{ValidatedJson, ValidatedQuery};

pub async fn get_availability(
    State(state): State<AppState>,
    _customer: CustomerContext,
    ValidatedQuery(query): ValidatedQuery<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityResponse>>, AppError> {
    let date = parse_date(query.date.trim())
        .ok_or_else(|| BookingError::validation("Date must be YYYY-MM-DD"))?;

    let slots = state.bookings.get_available_slots(date).await?;

    Ok(Json(ApiResponse::ok(AvailabilityResponse {
        date: date.format("%Y-%m-%d").to_string(),
        slots: slots.iter().map(format_slot).collect(),
    })))
}

pub async fn create_booking(
    State(state): State<AppState>,
    customer: CustomerContext,
    ValidatedJson(body): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateBookingResponse>>), AppError> {
    let created = state
        .bookings
        .create_booking(&customer.customer_id, body.into_new_booking())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CreateBookingResponse {
            booking: created.booking.into(),
            client_secret: created.client_secret,
        })),
    ))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    customer: CustomerContext,
    ValidatedQuery(query): ValidatedQuery<BookingListQuery>,
) -> Result<Json<ApiResponse<Paginated<BookingResponse>>>, AppError> {
    let filter = query.into_filter();
    let (rows, total) = state
        .bookings
        .list_bookings(&customer.customer_id, &filter)
        .await?;

    Ok(Json(ApiResponse::ok(Paginated::bookings(rows, total, &filter))))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    customer: CustomerContext,
    Path(booking_id): Path<String>,
) -> Result<Json<ApiResponse<ConfirmSummary>>, AppError> {
    let booking = state
        .bookings
        .confirm_payment(&customer.customer_id, &booking_id)
        .await?;

    tracing::info!(booking_id = %booking.id, "Booking payment confirmed");

    Ok(Json(ApiResponse::ok(ConfirmSummary::new(
        &booking,
        &state.config.business.org_name,
    ))))
}

pub async fn get_booking_payment(
    State(state): State<AppState>,
    customer: CustomerContext,
    Path(booking_id): Path<String>,
) -> Result<Json<ApiResponse<PaymentStatusResponse>>, AppError> {
    let details = state
        .bookings
        .retrieve_booking_payment(&customer.customer_id, &booking_id)
        .await?;

    Ok(Json(ApiResponse::ok(PaymentStatusResponse::new(
        &booking_id,
        details,
    ))))
}

/// Admin: mark a booking's service `completed` (or back to `pending`).
pub async fn update_booking_status(
    State(state): State<AppState>,
    AdminContext(admin): AdminContext,
    Path(booking_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateBookingStatusRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = state
        .bookings
        .update_booking_status(&booking_id, body.status)
        .await?;

    tracing::info!(
        admin_id = %admin.customer_id,
        booking_id = %booking.id,
        status = ?booking.status,
        "Booking status updated"
    );

    Ok(Json(ApiResponse::ok(booking.into())))
}
