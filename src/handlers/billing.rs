// src/handlers/billing.rs

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::subscription::{CheckoutPayload, Plan, RedirectUrl, SubscriptionOverview},
};

// Origem do front-end para os redirecionamentos do Stripe
fn request_origin(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(|origin| origin.trim_end_matches('/'))
        .filter(|origin| origin.starts_with("http://") || origin.starts_with("https://"))
        .unwrap_or(fallback)
        .to_string()
}

// GET /api/billing/plans
#[utoipa::path(
    get,
    path = "/api/billing/plans",
    tag = "Billing",
    responses(
        (status = 200, description = "Planos disponíveis", body = Vec<Plan>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_plans(State(app_state): State<AppState>) -> Json<Vec<Plan>> {
    Json(app_state.billing_service.plans())
}

// POST /api/billing/checkout
#[utoipa::path(
    post,
    path = "/api/billing/checkout",
    tag = "Billing",
    request_body = CheckoutPayload,
    responses(
        (status = 200, description = "URL da sessão de checkout", body = RedirectUrl),
        (status = 400, description = "Plano desconhecido"),
        (status = 503, description = "Stripe não configurado"),
        (status = 504, description = "Stripe não respondeu a tempo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_checkout_session(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<RedirectUrl>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let origin = request_origin(&headers, &app_state.config.app_base_url);
    let url = app_state
        .billing_service
        .create_checkout(&user, &payload.price_id, &origin)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(RedirectUrl { url }))
}

// POST /api/billing/portal
#[utoipa::path(
    post,
    path = "/api/billing/portal",
    tag = "Billing",
    responses(
        (status = 200, description = "URL do portal do cliente", body = RedirectUrl),
        (status = 404, description = "Usuário ainda não tem cliente no Stripe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_portal_session(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<RedirectUrl>, ApiError> {
    let origin = request_origin(&headers, &app_state.config.app_base_url);
    let url = app_state
        .billing_service
        .create_portal(&user, &origin)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(RedirectUrl { url }))
}

// GET /api/billing/subscription
#[utoipa::path(
    get,
    path = "/api/billing/subscription",
    tag = "Billing",
    responses(
        (status = 200, description = "Assinaturas do usuário", body = SubscriptionOverview)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<SubscriptionOverview>, ApiError> {
    let overview = app_state
        .billing_service
        .overview(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(overview))
}

// POST /api/billing/webhook (chamado pelo Stripe, sem JWT)
#[utoipa::path(
    post,
    path = "/api/billing/webhook",
    tag = "Billing",
    request_body(content = String, content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Assinatura HMAC do evento")),
    responses(
        (status = 200, description = "Evento processado ou ignorado"),
        (status = 400, description = "Assinatura inválida")
    )
)]
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok());

    app_state
        .billing_service
        .handle_webhook(signature, &body)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn origin_header_wins_over_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://app.clinicstock.com/"));
        assert_eq!(request_origin(&headers, "http://localhost:3000"), "https://app.clinicstock.com");
    }

    #[test]
    fn missing_or_odd_origin_uses_fallback() {
        assert_eq!(request_origin(&HeaderMap::new(), "http://localhost:3000"), "http://localhost:3000");

        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("null"));
        assert_eq!(request_origin(&headers, "http://localhost:3000"), "http://localhost:3000");
    }
}
