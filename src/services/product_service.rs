// src/services/product_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, upload::UploadedFile},
    db::ProductRepository,
    models::{
        movement::{MovementReason, MovementRequest, MovementType},
        product::{Product, ProductDraft, ProductFilter, ProductListEntry},
    },
    services::{
        alert_service::{days_to_expiry, product_status},
        movement_service::MovementService,
        storage::{product_photo_key, FileStorage},
    },
};

/// Movimentação que leva o saldo de `current` para `target`, se houver diferença.
pub fn adjustment_request(
    product_id: Uuid,
    current: i32,
    target: i32,
    reason: MovementReason,
    notes: &str,
) -> Option<MovementRequest> {
    let (movement_type, quantity) = match target.checked_sub(current)? {
        0 => return None,
        delta if delta > 0 => (MovementType::Entrada, delta),
        delta => (MovementType::Saida, delta.checked_neg()?),
    };

    Some(MovementRequest {
        product_id,
        movement_type,
        quantity,
        reason,
        notes: notes.to_string(),
        professional_name: None,
        new_batch_number: None,
        new_expiry_date: None,
        new_cost_price: None,
    })
}

#[derive(Clone)]
pub struct ProductService {
    pool: PgPool,
    product_repo: ProductRepository,
    movement_service: MovementService,
    storage: Arc<dyn FileStorage>,
}

impl ProductService {
    pub fn new(
        pool: PgPool,
        product_repo: ProductRepository,
        movement_service: MovementService,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self { pool, product_repo, movement_service, storage }
    }

    // --- CREATE PRODUCT ---
    pub async fn create_product(&self, user_id: Uuid, draft: &ProductDraft) -> Result<Product, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Produto nasce zerado
        let product = self
            .product_repo
            .insert(&mut *tx, user_id, Uuid::new_v4(), draft)
            .await?;

        // 2. Estoque inicial entra como movimentação
        let product = match adjustment_request(
            product.id,
            0,
            draft.current_stock,
            MovementReason::ManualEntry,
            "Estoque inicial",
        ) {
            Some(request) => {
                self.movement_service
                    .record_locked(&mut tx, user_id, &product, &request)
                    .await?
                    .product
            }
            None => product,
        };

        tx.commit().await?;

        tracing::info!("Produto criado: {} ({})", product.name, product.id);
        Ok(product)
    }

    // --- LISTAGEM ---
    pub async fn list_products(
        &self,
        user_id: Uuid,
        filter: &ProductFilter,
        today: NaiveDate,
    ) -> Result<Vec<ProductListEntry>, AppError> {
        let products = self.product_repo.list_by_user(user_id, filter).await?;
        Ok(products
            .into_iter()
            .map(|product| ProductListEntry {
                status: product_status(&product, today),
                days_to_expiry: days_to_expiry(product.expiry_date, today),
                product,
            })
            .collect())
    }

    pub async fn get_product(&self, user_id: Uuid, id: Uuid) -> Result<Product, AppError> {
        self.product_repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(AppError::ProductNotFound)
    }

    pub async fn find_by_barcode(&self, user_id: Uuid, barcode: &str) -> Result<Product, AppError> {
        self.product_repo
            .find_by_barcode(user_id, barcode.trim())
            .await?
            .ok_or(AppError::ProductNotFound)
    }

    // --- UPDATE PRODUCT ---
    pub async fn update_product(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &ProductDraft,
    ) -> Result<Product, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava o produto
        let current = self
            .product_repo
            .find_for_update(&mut *tx, user_id, id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        // 2. Campos descritivos
        let updated = self
            .product_repo
            .update_details(&mut *tx, user_id, id, draft)
            .await?;

        // 3. Diferença de saldo vira um ajuste no histórico
        let updated = match adjustment_request(
            id,
            current.current_stock,
            draft.current_stock,
            MovementReason::Adjustment,
            "Ajuste na edição do produto",
        ) {
            Some(request) => {
                self.movement_service
                    .record_locked(&mut tx, user_id, &updated, &request)
                    .await?
                    .product
            }
            None => updated,
        };

        tx.commit().await?;
        Ok(updated)
    }

    // --- FOTO ---
    pub async fn set_photo(
        &self,
        user_id: Uuid,
        id: Uuid,
        file: UploadedFile,
    ) -> Result<Product, AppError> {
        let current = self.get_product(user_id, id).await?;

        let key = product_photo_key(user_id, id, file.format);
        let url = self.storage.save(&key, file.format.content_type(), &file.bytes).await?;
        let updated = match self.product_repo.update_photo(user_id, id, &url).await {
            Ok(updated) => updated,
            Err(e) => {
                // O produto pode ter sido removido entre a leitura e a gravação
                self.remove_photo(&url).await;
                return Err(e);
            }
        };

        self.remove_photo(&current.photo_url).await;
        Ok(updated)
    }

    // --- DELETE PRODUCT ---
    pub async fn delete_product(&self, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let deleted = self
            .product_repo
            .delete(user_id, id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        self.remove_photo(&deleted.photo_url).await;

        tracing::info!("Produto removido: {} ({})", deleted.name, deleted.id);
        Ok(())
    }

    // Falha ao remover a foto só gera log
    async fn remove_photo(&self, photo_url: &str) {
        if photo_url.is_empty() {
            return;
        }
        if let Err(e) = self.storage.delete_by_url(photo_url).await {
            tracing::warn!("Falha ao remover foto {}: {}", photo_url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_adjustment_when_stock_is_unchanged() {
        assert!(adjustment_request(Uuid::nil(), 7, 7, MovementReason::Adjustment, "").is_none());
    }

    #[test]
    fn increase_becomes_entrada() {
        let req = adjustment_request(Uuid::nil(), 0, 12, MovementReason::ManualEntry, "Estoque inicial")
            .unwrap();
        assert_eq!(req.movement_type, MovementType::Entrada);
        assert_eq!(req.quantity, 12);
        assert_eq!(req.reason, MovementReason::ManualEntry);
        assert_eq!(req.notes, "Estoque inicial");
    }

    #[test]
    fn decrease_becomes_saida() {
        let req = adjustment_request(Uuid::nil(), 10, 4, MovementReason::Adjustment, "").unwrap();
        assert_eq!(req.movement_type, MovementType::Saida);
        assert_eq!(req.quantity, 6);
        assert_eq!(req.reason, MovementReason::Adjustment);
    }
}
