// src/handlers/alerts.rs

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::alerts::{AlertsResponse, DashboardSummary},
};

// GET /api/alerts
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alerts",
    responses(
        (status = 200, description = "Vencidos, vencendo em 7 e 30 dias, estoque baixo", body = AlertsResponse),
        (status = 402, description = "Assinatura inativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_alerts(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<AlertsResponse>, ApiError> {
    let buckets = app_state
        .alert_service
        .get_alerts(user.id, Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(AlertsResponse { total: buckets.total(), buckets }))
}

// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Resumo do estoque", body = DashboardSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = app_state
        .alert_service
        .get_dashboard(user.id, Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(summary))
}
