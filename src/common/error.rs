// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Erro interno da aplicação. Os serviços e repositórios só conhecem este tipo;
// a tradução para HTTP acontece em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Produto não encontrado")]
    ProductNotFound,

    #[error("Estoque insuficiente: disponível {available}, solicitado {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Assinatura inativa")]
    SubscriptionRequired,

    #[error("Plano desconhecido: {0}")]
    UnknownPlan(String),

    #[error("Cliente de cobrança não encontrado")]
    BillingCustomerNotFound,

    #[error("Upload inválido: {0}")]
    InvalidUpload(&'static str),

    #[error("Integração desabilitada: {0}")]
    IntegrationDisabled(&'static str),

    #[error("Assinatura de webhook inválida: {0}")]
    InvalidWebhookSignature(String),

    #[error("Evento de webhook inválido: {0}")]
    InvalidWebhookPayload(String),

    #[error("Falha no serviço externo: {0}")]
    UpstreamError(String),

    #[error("Tempo esgotado aguardando serviço externo")]
    UpstreamTimeout,

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro HTTP: {0}")]
    HttpError(#[from] reqwest::Error),
}

// O erro que efetivamente vai para o cliente.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl AppError {
    /// Erro de validação de um único campo, com a chave da mensagem.
    pub fn field(field: &'static str, message_key: &'static str) -> Self {
        let mut error = validator::ValidationError::new(message_key);
        error.message = Some(message_key.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, error);
        AppError::ValidationError(errors)
    }

    /// Status HTTP e chave de mensagem de cada variante.
    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_already_exists"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::ProductNotFound => (StatusCode::NOT_FOUND, "product_not_found"),
            AppError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
            AppError::SubscriptionRequired => (StatusCode::PAYMENT_REQUIRED, "subscription_required"),
            AppError::UnknownPlan(_) => (StatusCode::BAD_REQUEST, "unknown_plan"),
            AppError::BillingCustomerNotFound => (StatusCode::NOT_FOUND, "billing_customer_not_found"),
            AppError::InvalidUpload(_) => (StatusCode::BAD_REQUEST, "invalid_upload"),
            AppError::IntegrationDisabled(_) => (StatusCode::SERVICE_UNAVAILABLE, "integration_disabled"),
            AppError::InvalidWebhookSignature(_) => (StatusCode::BAD_REQUEST, "invalid_webhook_signature"),
            AppError::InvalidWebhookPayload(_) => (StatusCode::BAD_REQUEST, "invalid_webhook_payload"),
            AppError::UpstreamError(_) | AppError::HttpError(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            AppError::UpstreamTimeout => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Converte para a resposta da API no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let (status, key) = self.status_and_key();

        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        } else {
            tracing::debug!("Requisição rejeitada ({}): {}", status, self);
        }

        let message = store.translate(lang, key).to_string();

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            let msg_key = e.message.as_deref().unwrap_or(e.code.as_ref());
                            store.translate(lang, msg_key).to_string()
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::InsufficientStock { available, requested } => {
                Some(json!({ "available": available, "requested": requested }))
            }
            AppError::UnknownPlan(price_id) => Some(json!({ "priceId": price_id })),
            AppError::InvalidUpload(reason) => Some(json!({ "reason": store.translate(lang, reason) })),
            AppError::IntegrationDisabled(name) => Some(json!({ "integration": name })),
            _ => None,
        };

        ApiError { status, error: message, details }
    }
}

// Usado pelos middlewares, que não conhecem o idioma do cliente.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::shared()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn pt() -> Locale {
        Locale("pt".into())
    }

    #[test]
    fn insufficient_stock_is_conflict_with_details() {
        let api = AppError::InsufficientStock { available: 2, requested: 5 }
            .to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::CONFLICT);
        let details = api.details.expect("details");
        assert_eq!(details["available"], 2);
        assert_eq!(details["requested"], 5);
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"))
            .to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("hunter2"));
        assert!(api.details.is_none());
    }

    #[test]
    fn validation_messages_are_translated_per_field() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("name_too_short".into());
        errors.add("name", err);

        let en = AppError::ValidationError(errors.clone())
            .to_api_error(&Locale("en".into()), I18nStore::shared());
        assert_eq!(en.status, StatusCode::BAD_REQUEST);
        assert_eq!(en.details.as_ref().unwrap()["name"][0], "Product name must have at least 3 characters.");

        let pt = AppError::ValidationError(errors).to_api_error(&pt(), I18nStore::shared());
        assert_eq!(pt.details.unwrap()["name"][0], "O nome do produto é obrigatório.");
    }

    #[test]
    fn subscription_gate_maps_to_payment_required() {
        let api = AppError::SubscriptionRequired.to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn upstream_timeout_maps_to_gateway_timeout() {
        let api = AppError::UpstreamTimeout.to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
