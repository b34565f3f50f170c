// src/handlers/notifications.rs

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::notification::{DeviceToken, DeviceTokenPayload, SendAlertResponse},
};

const SERVICE_WORKER_TEMPLATE: &str = include_str!("../../static/firebase-messaging-sw.js");

/// Injeta a configuração web do Firebase no service worker.
/// JSON inválido vira um objeto vazio para não quebrar o script.
pub fn render_service_worker(firebase_web_config: &str) -> String {
    let config = match serde_json::from_str::<serde_json::Value>(firebase_web_config) {
        Ok(value) if value.is_object() => value.to_string(),
        _ => {
            tracing::warn!("FIREBASE_WEB_CONFIG não é um objeto JSON válido");
            "{}".to_string()
        }
    };
    SERVICE_WORKER_TEMPLATE.replace("__FIREBASE_CONFIG__", &config)
}

// POST /api/notifications/tokens
#[utoipa::path(
    post,
    path = "/api/notifications/tokens",
    tag = "Notifications",
    request_body = DeviceTokenPayload,
    responses(
        (status = 201, description = "Token registrado (idempotente)", body = DeviceToken),
        (status = 400, description = "Token vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_token(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<DeviceTokenPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let token = app_state
        .notification_service
        .register_token(user.id, &payload.token)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(token)))
}

// DELETE /api/notifications/tokens
#[utoipa::path(
    delete,
    path = "/api/notifications/tokens",
    tag = "Notifications",
    request_body = DeviceTokenPayload,
    responses(
        (status = 204, description = "Token removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_token(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<DeviceTokenPayload>,
) -> Result<StatusCode, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    app_state
        .notification_service
        .revoke_token(user.id, &payload.token)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/notifications/send-alert
#[utoipa::path(
    post,
    path = "/api/notifications/send-alert",
    tag = "Notifications",
    responses(
        (status = 200, description = "Resumo do envio", body = SendAlertResponse),
        (status = 503, description = "FCM não configurado")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_alert(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<SendAlertResponse>, ApiError> {
    let response = app_state
        .notification_service
        .send_alerts(user.id, Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(response))
}

// GET /firebase-messaging-sw.js
pub async fn service_worker(State(app_state): State<AppState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        render_service_worker(&app_state.config.firebase_web_config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_injected_into_the_template() {
        let script = render_service_worker(r#"{"projectId":"clinicstock","appId":"1:2:web:3"}"#);
        assert!(!script.contains("__FIREBASE_CONFIG__"));
        assert!(script.contains(r#""projectId":"clinicstock""#));
        assert!(script.contains("onBackgroundMessage"));
    }

    #[test]
    fn invalid_config_falls_back_to_empty_object() {
        let script = render_service_worker("não é json");
        assert!(script.contains("const firebaseConfig = {};"));

        let script = render_service_worker("[1, 2]");
        assert!(script.contains("const firebaseConfig = {};"));
    }
}
