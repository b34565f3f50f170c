// src/db/movement_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::movement::{MovementFilter, MovementRequest, StockMovement},
};

#[derive(Clone)]
pub struct MovementRepository {
    pool: PgPool,
}

impl MovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Histórico do usuário, mais recentes primeiro.
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE user_id = $1
              AND ($2::movement_type IS NULL OR movement_type = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
              AND ($4::date IS NULL OR date::date >= $4)
              AND ($5::date IS NULL OR date::date <= $5)
            ORDER BY date DESC
            LIMIT $6
            "#,
        )
        .bind(user_id)
        .bind(filter.movement_type)
        .bind(filter.product_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// Anexa uma linha ao livro-razão. Não existe update nem delete.
    pub async fn append<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        product_name: &str,
        request: &MovementRequest,
        previous_stock: i32,
        new_stock: i32,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                user_id, product_id, product_name, movement_type, quantity, reason,
                previous_stock, new_stock, notes, professional_name,
                new_batch_number, new_expiry_date, new_cost_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request.product_id)
        .bind(product_name)
        .bind(request.movement_type)
        .bind(request.quantity)
        .bind(request.reason)
        .bind(previous_stock)
        .bind(new_stock)
        .bind(&request.notes)
        .bind(request.professional_name.as_deref())
        .bind(request.new_batch_number.as_deref())
        .bind(request.new_expiry_date)
        .bind(request.new_cost_price)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }
}
