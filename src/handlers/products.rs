// src/handlers/products.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError},
        upload::{read_photo, PhotoUploadForm},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::product::{
        Product, ProductCategory, ProductDraft, ProductFilter, ProductListEntry, ProductUnit,
    },
};

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("negative_cost".into());
        return Err(err);
    }
    Ok(())
}

// Espaços nas pontas não contam para o tamanho mínimo
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

fn default_minimum_stock() -> i32 {
    10
}

// ---
// Payload: criação e edição usam o mesmo formulário
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 3, message = "name_too_short"))]
    #[serde(deserialize_with = "trimmed")]
    #[schema(example = "Toxina Botulínica 100U")]
    pub name: String,

    pub category: ProductCategory,

    #[validate(range(min = 0, message = "negative_stock"))]
    #[serde(default)]
    #[schema(example = 12)]
    pub current_stock: i32,

    #[validate(range(min = 0, message = "negative_minimum_stock"))]
    #[serde(default = "default_minimum_stock")]
    #[schema(example = 10)]
    pub minimum_stock: i32,

    pub unit: ProductUnit,

    #[schema(example = "2026-06-30")]
    pub expiry_date: NaiveDate,

    #[serde(default, deserialize_with = "trimmed")]
    pub batch_number: String,

    #[serde(default, deserialize_with = "trimmed")]
    pub supplier: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(value_type = f64, example = 89.9)]
    pub cost_price: Decimal,

    #[serde(default)]
    pub notes: String,

    pub barcode: Option<String>,
}

impl ProductPayload {
    fn into_draft(self) -> ProductDraft {
        ProductDraft {
            name: self.name,
            category: self.category,
            current_stock: self.current_stock,
            minimum_stock: self.minimum_stock,
            unit: self.unit,
            expiry_date: self.expiry_date,
            batch_number: self.batch_number,
            supplier: self.supplier,
            cost_price: self.cost_price,
            notes: self.notes,
            barcode: self
                .barcode
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    /// Trecho do nome ou do código de barras
    pub search: Option<String>,
    pub category: Option<ProductCategory>,
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = ProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 402, description = "Assinatura inativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let product = app_state
        .product_service
        .create_product(user.id, &payload.into_draft())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Produtos do usuário com a situação calculada", body = Vec<ProductListEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<ProductListEntry>>, ApiError> {
    let filter = ProductFilter { search: query.search, category: query.category };

    let products = app_state
        .product_service
        .list_products(user.id, &filter, Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(products))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = app_state
        .product_service
        .get_product(user.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(product))
}

// GET /api/products/barcode/{code}
#[utoipa::path(
    get,
    path = "/api/products/barcode/{code}",
    tag = "Products",
    params(("code" = String, Path, description = "Código de barras lido pelo scanner")),
    responses(
        (status = 200, description = "Produto com o código", body = Product),
        (status = 404, description = "Nenhum produto com esse código")
    ),
    security(("api_jwt" = []))
)]
pub async fn find_by_barcode(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = app_state
        .product_service
        .find_by_barcode(user.id, &code)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(product))
}

// PUT /api/products/{id}
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Produto atualizado; diferença de estoque registrada como ajuste", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let product = app_state
        .product_service
        .update_product(user.id, id, &payload.into_draft())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(product))
}

// POST /api/products/{id}/photo
#[utoipa::path(
    post,
    path = "/api/products/{id}/photo",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body(content = PhotoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Foto atualizada", body = Product),
        (status = 400, description = "Arquivo inválido"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_product_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    let file = read_photo(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let product = app_state
        .product_service
        .set_photo(user.id, id, file)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(product))
}

// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 204, description = "Produto removido; o histórico de movimentações é mantido"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .product_service
        .delete_product(user.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> ProductPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let p = payload(
            r#"{"name":"Ácido Hialurônico","category":"Injetáveis","unit":"Frasco","expiryDate":"2026-01-31"}"#,
        );
        assert_eq!(p.minimum_stock, 10);
        assert_eq!(p.current_stock, 0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn short_names_and_negative_numbers_are_rejected() {
        let p = payload(
            r#"{"name":"Ab","category":"Outros","unit":"Un","expiryDate":"2026-01-31",
                "currentStock":-1,"minimumStock":-2,"costPrice":-5.5}"#,
        );
        let errors = p.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("current_stock"));
        assert!(fields.contains_key("minimum_stock"));
        assert!(fields.contains_key("cost_price"));
    }

    #[test]
    fn draft_trims_and_drops_blank_barcode() {
        let draft = payload(
            r#"{"name":"  Luvas Nitrílicas ","category":"Materiais Descartáveis","unit":"Caixa",
                "expiryDate":"2027-05-01","barcode":"   "}"#,
        )
        .into_draft();
        assert_eq!(draft.name, "Luvas Nitrílicas");
        assert!(draft.barcode.is_none());
    }

    #[test]
    fn name_length_is_checked_after_trimming() {
        let p = payload(
            r#"{"name":"  ab ","category":"Outros","unit":"Un","expiryDate":"2026-01-31"}"#,
        );
        assert_eq!(p.name, "ab");
        assert!(p.validate().unwrap_err().field_errors().contains_key("name"));

        let p = payload(
            r#"{"name":"   ","category":"Outros","unit":"Un","expiryDate":"2026-01-31"}"#,
        );
        assert!(p.validate().is_err());

        let p = payload(
            r#"{"name":" abc ","category":"Outros","unit":"Un","expiryDate":"2026-01-31","supplier":" Dist. "}"#,
        );
        assert!(p.validate().is_ok());
        assert_eq!(p.supplier, "Dist.");
    }
}
