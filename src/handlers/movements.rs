// src/handlers/movements.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::movement::{
        MovementFilter, MovementReason, MovementReceipt, MovementRequest, MovementType,
        StockMovement,
    },
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementPayload {
    pub product_id: Uuid,

    #[serde(rename = "type")]
    pub movement_type: MovementType,

    #[validate(range(min = 1, message = "quantity_positive"))]
    #[schema(example = 2)]
    pub quantity: i32,

    /// Sem motivo: "Entrada Manual" ou "Saída Manual"
    pub reason: Option<MovementReason>,

    #[serde(default)]
    pub notes: String,

    pub professional_name: Option<String>,

    // Só para entradas
    pub new_batch_number: Option<String>,
    pub new_expiry_date: Option<NaiveDate>,
    #[schema(value_type = Option<f64>)]
    pub new_cost_price: Option<Decimal>,
}

impl MovementPayload {
    fn into_request(self) -> MovementRequest {
        let blank_to_none = |value: Option<String>| {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        MovementRequest {
            product_id: self.product_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            reason: self.reason.unwrap_or_else(|| self.movement_type.default_reason()),
            notes: self.notes,
            professional_name: blank_to_none(self.professional_name),
            new_batch_number: blank_to_none(self.new_batch_number),
            new_expiry_date: self.new_expiry_date,
            new_cost_price: self.new_cost_price,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListMovementsQuery {
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub product_id: Option<Uuid>,
    /// Data inicial (inclusiva)
    pub from: Option<NaiveDate>,
    /// Data final (inclusiva)
    pub to: Option<NaiveDate>,
    /// Padrão 100, máximo 500
    pub limit: Option<i64>,
}

impl ListMovementsQuery {
    fn into_filter(self) -> Result<MovementFilter, AppError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::field("from", "invalid_date_range"));
            }
        }

        Ok(MovementFilter {
            movement_type: self.movement_type,
            product_id: self.product_id,
            from: self.from,
            to: self.to,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

// POST /api/movements
#[utoipa::path(
    post,
    path = "/api/movements",
    tag = "Movements",
    request_body = MovementPayload,
    responses(
        (status = 201, description = "Movimentação registrada e estoque atualizado", body = MovementReceipt),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto não encontrado"),
        (status = 409, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<MovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let receipt = app_state
        .movement_service
        .record_movement(user.id, &payload.into_request())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/movements
#[utoipa::path(
    get,
    path = "/api/movements",
    tag = "Movements",
    params(ListMovementsQuery),
    responses(
        (status = 200, description = "Histórico, mais recentes primeiro", body = Vec<StockMovement>),
        (status = 400, description = "Intervalo de datas inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListMovementsQuery>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    let filter = query
        .into_filter()
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let movements = app_state
        .movement_service
        .list_movements(user.id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(movements))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reason_defaults_by_type() {
        let payload: MovementPayload = serde_json::from_str(&format!(
            r#"{{"productId":"{}","type":"saida","quantity":3}}"#,
            Uuid::nil()
        ))
        .unwrap();
        let request = payload.into_request();
        assert_eq!(request.reason, MovementReason::ManualExit);
        assert!(request.professional_name.is_none());
    }

    #[test]
    fn explicit_reason_is_kept() {
        let payload: MovementPayload = serde_json::from_str(&format!(
            r#"{{"productId":"{}","type":"saida","quantity":1,"reason":"Uso","professionalName":"Dra. Ana"}}"#,
            Uuid::nil()
        ))
        .unwrap();
        let request = payload.into_request();
        assert_eq!(request.reason, MovementReason::Usage);
        assert_eq!(request.professional_name.as_deref(), Some("Dra. Ana"));
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let payload: MovementPayload = serde_json::from_str(&format!(
            r#"{{"productId":"{}","type":"entrada","quantity":0}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn limit_is_defaulted_and_capped() {
        let filter = ListMovementsQuery::default().into_filter().unwrap();
        assert_eq!(filter.limit, 100);

        let filter = ListMovementsQuery { limit: Some(10_000), ..Default::default() }
            .into_filter()
            .unwrap();
        assert_eq!(filter.limit, 500);

        let filter = ListMovementsQuery { limit: Some(0), ..Default::default() }
            .into_filter()
            .unwrap();
        assert_eq!(filter.limit, 1);
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let query = ListMovementsQuery {
            from: NaiveDate::from_ymd_opt(2025, 5, 2),
            to: NaiveDate::from_ymd_opt(2025, 5, 1),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::ValidationError(_))));
    }
}
