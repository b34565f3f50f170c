// src/db/product_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::product::{Product, ProductDraft, ProductFilter},
};

/// Escapa `\`, `%` e `_` para que a busca os trate como texto.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, AppError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(escape_like);

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE user_id = $1
              AND ($2::text IS NULL
                   OR name ILIKE '%' || $2 || '%' ESCAPE '\'
                   OR barcode ILIKE '%' || $2 || '%' ESCAPE '\')
              AND ($3::product_category IS NULL OR category = $3)
            ORDER BY lower(name) ASC
            "#,
        )
        .bind(user_id)
        .bind(search)
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn find_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn find_by_barcode(
        &self,
        user_id: Uuid,
        barcode: &str,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE user_id = $1 AND barcode = $2 ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Trava a linha do produto até o fim da transação.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE user_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    // ---
    // Escrita (transacional)
    // ---

    /// Insere o produto com estoque zerado; o estoque inicial entra via movimentação.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        id: Uuid,
        draft: &ProductDraft,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                id, user_id, name, category, current_stock, minimum_stock, unit,
                expiry_date, batch_number, supplier, cost_price, notes, barcode
            )
            VALUES ($1, $2, $3, $4, 0, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&draft.name)
        .bind(draft.category)
        .bind(draft.minimum_stock)
        .bind(draft.unit)
        .bind(draft.expiry_date)
        .bind(&draft.batch_number)
        .bind(&draft.supplier)
        .bind(draft.cost_price)
        .bind(&draft.notes)
        .bind(draft.barcode.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    /// Atualiza os campos descritivos. `current_stock` não é tocado aqui.
    pub async fn update_details<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        id: Uuid,
        draft: &ProductDraft,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = $3,
                category = $4,
                minimum_stock = $5,
                unit = $6,
                expiry_date = $7,
                batch_number = $8,
                supplier = $9,
                cost_price = $10,
                notes = $11,
                barcode = $12,
                updated_at = now()
            WHERE user_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(&draft.name)
        .bind(draft.category)
        .bind(draft.minimum_stock)
        .bind(draft.unit)
        .bind(draft.expiry_date)
        .bind(&draft.batch_number)
        .bind(&draft.supplier)
        .bind(draft.cost_price)
        .bind(&draft.notes)
        .bind(draft.barcode.as_deref())
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::ProductNotFound)
    }

    /// Grava o novo saldo e, nas entradas, os dados de lote/validade/custo.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_stock_change<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        id: Uuid,
        new_stock: i32,
        new_batch_number: Option<&str>,
        new_expiry_date: Option<NaiveDate>,
        new_cost_price: Option<Decimal>,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                current_stock = $3,
                batch_number = COALESCE($4, batch_number),
                expiry_date = COALESCE($5, expiry_date),
                cost_price = COALESCE($6, cost_price),
                updated_at = now()
            WHERE user_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(new_stock)
        .bind(new_batch_number)
        .bind(new_expiry_date)
        .bind(new_cost_price)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::ProductNotFound)
    }

    pub async fn update_photo(
        &self,
        user_id: Uuid,
        id: Uuid,
        photo_url: &str,
    ) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET photo_url = $3, updated_at = now()
            WHERE user_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(photo_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::ProductNotFound)
    }

    /// Remove o produto e devolve a linha removida (para limpar a foto).
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Product>, AppError> {
        let deleted = sqlx::query_as::<_, Product>(
            "DELETE FROM products WHERE user_id = $1 AND id = $2 RETURNING *",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("botox"), "botox");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
    }
}
