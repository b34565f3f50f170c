// src/models/movement.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entrada,
    Saida,
}

impl MovementType {
    pub fn default_reason(self) -> MovementReason {
        match self {
            MovementType::Entrada => MovementReason::ManualEntry,
            MovementType::Saida => MovementReason::ManualExit,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "movement_reason")]
pub enum MovementReason {
    #[serde(rename = "Uso")]
    #[sqlx(rename = "Uso")]
    Usage,
    #[serde(rename = "Venda")]
    #[sqlx(rename = "Venda")]
    Sale,
    #[serde(rename = "Perda")]
    #[sqlx(rename = "Perda")]
    Loss,
    #[serde(rename = "Vencimento")]
    #[sqlx(rename = "Vencimento")]
    Expiry,
    #[serde(rename = "Compra")]
    #[sqlx(rename = "Compra")]
    Purchase,
    #[serde(rename = "Ajuste")]
    #[sqlx(rename = "Ajuste")]
    Adjustment,
    #[serde(rename = "Entrada Manual")]
    #[sqlx(rename = "Entrada Manual")]
    ManualEntry,
    #[serde(rename = "Saída Manual")]
    #[sqlx(rename = "Saída Manual")]
    ManualExit,
}

// --- STOCK MOVEMENT (livro-razão imutável) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: MovementReason,
    pub date: DateTime<Utc>,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub notes: String,
    pub professional_name: Option<String>,
    pub new_batch_number: Option<String>,
    pub new_expiry_date: Option<NaiveDate>,
    #[schema(value_type = Option<f64>)]
    pub new_cost_price: Option<Decimal>,
}

// Pedido de movimentação já validado
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: MovementReason,
    pub notes: String,
    pub professional_name: Option<String>,
    pub new_batch_number: Option<String>,
    pub new_expiry_date: Option<NaiveDate>,
    pub new_cost_price: Option<Decimal>,
}

#[derive(Debug, Default, Clone)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub product_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementReceipt {
    pub movement: StockMovement,
    pub product: crate::models::product::Product,
}
