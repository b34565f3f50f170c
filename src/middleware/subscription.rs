// src/middleware/subscription.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

// Roda depois do auth_guard: exige ao menos uma assinatura ativa
pub async fn subscription_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !app_state.config.require_subscription {
        return Ok(next.run(request).await);
    }

    let user_id = request
        .extensions()
        .get::<User>()
        .map(|user| user.id)
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, app_state.i18n_store))?;

    let is_active = app_state
        .billing_service
        .has_active_subscription(user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    if !is_active {
        return Err(AppError::SubscriptionRequired.to_api_error(&locale, app_state.i18n_store));
    }

    Ok(next.run(request).await)
}
