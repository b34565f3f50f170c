// src/models/product.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Categorias fixas do catálogo ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "product_category")]
pub enum ProductCategory {
    #[serde(rename = "Injetáveis")]
    #[sqlx(rename = "Injetáveis")]
    Injectables,
    #[serde(rename = "Cosméticos Profissionais")]
    #[sqlx(rename = "Cosméticos Profissionais")]
    ProfessionalCosmetics,
    #[serde(rename = "Materiais Descartáveis")]
    #[sqlx(rename = "Materiais Descartáveis")]
    Disposables,
    #[serde(rename = "Equipamentos")]
    #[sqlx(rename = "Equipamentos")]
    Equipment,
    #[serde(rename = "Outros")]
    #[sqlx(rename = "Outros")]
    Other,
}

// --- Unidades de medida ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "product_unit")]
pub enum ProductUnit {
    #[serde(rename = "Un")]
    #[sqlx(rename = "Un")]
    Piece,
    #[serde(rename = "Caixa")]
    #[sqlx(rename = "Caixa")]
    Box,
    #[serde(rename = "Frasco")]
    #[sqlx(rename = "Frasco")]
    Vial,
    #[serde(rename = "ml")]
    #[sqlx(rename = "ml")]
    Milliliter,
    #[serde(rename = "Ampola")]
    #[sqlx(rename = "Ampola")]
    Ampoule,
}

// --- Produto ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub user_id: Uuid,
    #[schema(example = "Toxina Botulínica 100U")]
    pub name: String,
    pub category: ProductCategory,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    #[schema(example = 12)]
    pub current_stock: i32,
    #[schema(example = 10)]
    pub minimum_stock: i32,
    pub unit: ProductUnit,
    pub expiry_date: NaiveDate,
    pub batch_number: String,
    pub supplier: String,
    #[schema(value_type = f64, example = 89.9)]
    pub cost_price: Decimal,
    pub notes: String,
    pub barcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Situação exibida na listagem (a primeira regra que casar vence)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Expired,
    LowStock,
    Expiring,
    Ok,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductListEntry {
    #[serde(flatten)]
    pub product: Product,
    pub status: ProductStatus,
    pub days_to_expiry: i64,
}

// Campos editáveis, já validados pelo handler
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub category: ProductCategory,
    pub current_stock: i32,
    pub minimum_stock: i32,
    pub unit: ProductUnit,
    pub expiry_date: NaiveDate,
    pub batch_number: String,
    pub supplier: String,
    pub cost_price: Decimal,
    pub notes: String,
    pub barcode: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<ProductCategory>,
}
