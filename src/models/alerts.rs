// src/models/alerts.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::product::Product;

// 1. Baldes de alerta (na ordem exibida)
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertBuckets {
    pub expired: Vec<Product>,
    #[serde(rename = "expiring_7")]
    pub expiring_7: Vec<Product>,
    #[serde(rename = "expiring_30")]
    pub expiring_30: Vec<Product>,
    pub low_stock: Vec<Product>,
}

impl AlertBuckets {
    pub fn total(&self) -> usize {
        self.expired.len() + self.expiring_7.len() + self.expiring_30.len() + self.low_stock.len()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertsResponse {
    #[serde(flatten)]
    pub buckets: AlertBuckets,
    pub total: usize,
}

// 2. Resumo para notificação push
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlertDigest {
    pub alerts_found: usize,
    pub expiring_soon: Vec<String>,
    pub low_stock: Vec<String>,
    pub notification_title: String,
    pub notification_body: String,
}

// 3. Painel (cards do topo + próximos vencimentos)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryEntry {
    pub product_id: Uuid,
    pub name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub current_stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_products: usize,
    pub expiring_30_count: usize,
    pub low_stock_count: usize,
    #[schema(value_type = f64)]
    pub total_stock_value: Decimal,
    pub next_expiries: Vec<ExpiryEntry>,
    pub has_urgent_expiries: bool,
}
