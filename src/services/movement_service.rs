// src/services/movement_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MovementRepository, ProductRepository},
    models::{
        movement::{MovementFilter, MovementReceipt, MovementRequest, MovementType, StockMovement},
        product::Product,
    },
};

/// Saldos antes e depois de uma movimentação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementPlan {
    pub previous_stock: i32,
    pub new_stock: i32,
}

/// Valida o pedido contra o saldo atual e calcula o novo saldo.
/// Não toca no banco: um erro aqui significa que nada será gravado.
pub fn plan_movement(current_stock: i32, request: &MovementRequest) -> Result<MovementPlan, AppError> {
    if request.quantity <= 0 {
        return Err(AppError::field("quantity", "quantity_positive"));
    }

    let new_stock = match request.movement_type {
        MovementType::Entrada => {
            if request.new_cost_price.is_some_and(|cost| cost < Decimal::ZERO) {
                return Err(AppError::field("newCostPrice", "negative_cost"));
            }
            current_stock
                .checked_add(request.quantity)
                .ok_or_else(|| AppError::field("quantity", "quantity_positive"))?
        }
        MovementType::Saida => {
            if request.new_batch_number.is_some()
                || request.new_expiry_date.is_some()
                || request.new_cost_price.is_some()
            {
                return Err(AppError::field("type", "entry_only_field"));
            }
            if request.quantity > current_stock {
                return Err(AppError::InsufficientStock {
                    available: current_stock,
                    requested: request.quantity,
                });
            }
            current_stock - request.quantity
        }
    };

    Ok(MovementPlan { previous_stock: current_stock, new_stock })
}

#[derive(Clone)]
pub struct MovementService {
    pool: PgPool,
    product_repo: ProductRepository,
    movement_repo: MovementRepository,
}

impl MovementService {
    pub fn new(pool: PgPool, product_repo: ProductRepository, movement_repo: MovementRepository) -> Self {
        Self { pool, product_repo, movement_repo }
    }

    // --- REGISTRAR MOVIMENTAÇÃO ---
    pub async fn record_movement(
        &self,
        user_id: Uuid,
        request: &MovementRequest,
    ) -> Result<MovementReceipt, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava o produto
        let product = self
            .product_repo
            .find_for_update(&mut *tx, user_id, request.product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        // 2. Atualiza o saldo e grava o histórico
        let receipt = self.record_locked(&mut tx, user_id, &product, request).await?;

        tx.commit().await?;

        tracing::info!(
            "Movimentação registrada: {:?} {} de '{}' ({} -> {})",
            receipt.movement.movement_type,
            receipt.movement.quantity,
            receipt.product.name,
            receipt.movement.previous_stock,
            receipt.movement.new_stock
        );
        Ok(receipt)
    }

    /// Aplica a movimentação sobre um produto já travado pela transação do chamador.
    pub(crate) async fn record_locked(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        product: &Product,
        request: &MovementRequest,
    ) -> Result<MovementReceipt, AppError> {
        let plan = plan_movement(product.current_stock, request)?;

        let updated = self
            .product_repo
            .apply_stock_change(
                &mut *conn,
                user_id,
                product.id,
                plan.new_stock,
                request.new_batch_number.as_deref(),
                request.new_expiry_date,
                request.new_cost_price,
            )
            .await?;

        let movement = self
            .movement_repo
            .append(
                &mut *conn,
                user_id,
                &product.name,
                request,
                plan.previous_stock,
                plan.new_stock,
            )
            .await?;

        Ok(MovementReceipt { movement, product: updated })
    }

    pub async fn list_movements(
        &self,
        user_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, AppError> {
        self.movement_repo.list(user_id, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::movement::MovementReason;
    use chrono::NaiveDate;

    fn request(movement_type: MovementType, quantity: i32) -> MovementRequest {
        MovementRequest {
            product_id: Uuid::new_v4(),
            movement_type,
            quantity,
            reason: movement_type.default_reason(),
            notes: String::new(),
            professional_name: None,
            new_batch_number: None,
            new_expiry_date: None,
            new_cost_price: None,
        }
    }

    fn field_key(err: &AppError) -> Option<String> {
        match err {
            AppError::ValidationError(errors) => errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string())),
            _ => None,
        }
    }

    #[test]
    fn entrada_adds_to_stock() {
        let plan = plan_movement(12, &request(MovementType::Entrada, 8)).unwrap();
        assert_eq!(plan, MovementPlan { previous_stock: 12, new_stock: 20 });
    }

    #[test]
    fn saida_subtracts_from_stock() {
        let plan = plan_movement(12, &request(MovementType::Saida, 5)).unwrap();
        assert_eq!(plan.new_stock, 7);
    }

    #[test]
    fn saida_may_empty_the_stock() {
        let plan = plan_movement(5, &request(MovementType::Saida, 5)).unwrap();
        assert_eq!(plan.new_stock, 0);
    }

    #[test]
    fn saida_beyond_stock_is_rejected() {
        let err = plan_movement(3, &request(MovementType::Saida, 4)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { available: 3, requested: 4 }
        ));
    }

    #[test]
    fn quantity_must_be_positive() {
        for quantity in [0, -1] {
            let err = plan_movement(10, &request(MovementType::Entrada, quantity)).unwrap_err();
            assert_eq!(field_key(&err).as_deref(), Some("quantity_positive"));
        }
    }

    #[test]
    fn saida_rejects_entry_only_fields() {
        let mut req = request(MovementType::Saida, 1);
        req.new_batch_number = Some("L99".into());
        let err = plan_movement(10, &req).unwrap_err();
        assert_eq!(field_key(&err).as_deref(), Some("entry_only_field"));

        let mut req = request(MovementType::Saida, 1);
        req.new_expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        assert!(plan_movement(10, &req).is_err());
    }

    #[test]
    fn entrada_accepts_overrides_but_not_negative_cost() {
        let mut req = request(MovementType::Entrada, 2);
        req.new_batch_number = Some("L02".into());
        req.new_cost_price = Some(Decimal::new(4590, 2));
        assert!(plan_movement(0, &req).is_ok());

        req.new_cost_price = Some(Decimal::new(-1, 0));
        let err = plan_movement(0, &req).unwrap_err();
        assert_eq!(field_key(&err).as_deref(), Some("negative_cost"));
    }

    #[test]
    fn entrada_overflow_is_rejected() {
        assert!(plan_movement(i32::MAX, &request(MovementType::Entrada, 1)).is_err());
    }

    #[test]
    fn default_reasons_follow_the_type() {
        assert_eq!(MovementType::Entrada.default_reason(), MovementReason::ManualEntry);
        assert_eq!(MovementType::Saida.default_reason(), MovementReason::ManualExit);
    }
}
