// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeviceTokenPayload {
    #[validate(length(min = 1, message = "token_required"))]
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendAlertResponse {
    pub success: bool,
    pub message: String,
    pub alerts_found: usize,
    pub notifications_sent: usize,
}

// Mensagem montada a partir do resumo de alertas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub link: String,
}

// Resultado do envio para um token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    // Token não existe mais no provedor: deve ser removido
    Unregistered,
    Failed(String),
}
