//! Admin endpoints for operating hours and tax.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::{
    ApiResponse, AvailabilitySettingRequest, AvailabilitySettingResponse, TaxRequest,
    TaxResponse,
};
use crate::middleware::AdminContext;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn get_availability_setting(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<ApiResponse<AvailabilitySettingResponse>>, AppError> {
    let setting = state.settings.get_availability_setting().await?;
    Ok(Json(ApiResponse::ok(setting.into())))
}

pub async fn update_availability_setting(
    State(state): State<AppState>,
    AdminContext(admin): AdminContext,
    ValidatedJson(body): ValidatedJson<AvailabilitySettingRequest>,
) -> Result<Json<ApiResponse<AvailabilitySettingResponse>>, AppError> {
    let setting = state
        .settings
        .update_availability_setting(&body.start_time, &body.end_time, body.slot_minutes)
        .await?;

    tracing::info!(
        admin_id = %admin.customer_id,
        start_time = %setting.start_time,
        end_time = %setting.end_time,
        slot_minutes = setting.slot_minutes,
        "Availability setting updated"
    );

    Ok(Json(ApiResponse::ok(setting.into())))
}

/// `data` is null when no tax has been configured.
pub async fn get_tax(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<ApiResponse<Option<TaxResponse>>>, AppError> {
    let tax = state.settings.get_active_tax().await?;
    Ok(Json(ApiResponse::ok(tax.map(Into::into))))
}

pub async fn create_tax(
    State(state): State<AppState>,
    AdminContext(admin): AdminContext,
    ValidatedJson(body): ValidatedJson<TaxRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TaxResponse>>), AppError> {
    let tax = state.settings.set_active_tax(body.percent).await?;
    tracing::info!(
        admin_id = %admin.customer_id,
        tax_id = %tax.id,
        percent = %tax.percent,
        "Active tax set"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(tax.into()))))
}

pub async fn update_tax(
    State(state): State<AppState>,
    AdminContext(admin): AdminContext,
    ValidatedJson(body): ValidatedJson<TaxRequest>,
) -> Result<Json<ApiResponse<TaxResponse>>, AppError> {
    let tax = state.settings.update_active_tax(body.percent).await?;
    tracing::info!(
        admin_id = %admin.customer_id,
        tax_id = %tax.id,
        percent = %tax.percent,
        "Active tax updated"
    );
    Ok(Json(ApiResponse::ok(tax.into())))
}
