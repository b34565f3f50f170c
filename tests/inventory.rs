// tests/inventory.rs
//
// Caminhos transacionais contra um Postgres real. Cada teste recebe um banco
// novo com as migrações aplicadas (`DATABASE_URL` aponta para o servidor).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use clinicstock::{
    common::{
        error::AppError,
        upload::{PhotoFormat, UploadedFile},
    },
    db::{MovementRepository, ProductRepository, SubscriptionRepository, UserRepository},
    models::{
        auth::User,
        movement::{MovementFilter, MovementReason, MovementRequest, MovementType, StockMovement},
        product::{Product, ProductCategory, ProductDraft, ProductFilter, ProductUnit},
    },
    services::{
        auth::AuthService,
        movement_service::MovementService,
        product_service::ProductService,
        storage::FileStorage,
    },
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

// ---
// Armazenamento falso que registra gravações e remoções
// ---

#[derive(Default)]
struct RecordingStorage {
    saved: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    // Simula uma exclusão concorrente entre o upload e a gravação no banco
    delete_on_save: Option<(PgPool, &'static str, Uuid)>,
}

impl RecordingStorage {
    fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn save(&self, key: &str, _content_type: &str, _bytes: &[u8]) -> Result<String, AppError> {
        if let Some((pool, sql, id)) = &self.delete_on_save {
            sqlx::query(sql).bind(*id).execute(pool).await?;
        }
        let url = format!("/uploads/{key}");
        self.saved.lock().unwrap().push(url.clone());
        Ok(url)
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ---
// Montagem
// ---

struct Fixture {
    user: User,
    products: ProductService,
    movements: MovementService,
    storage: Arc<RecordingStorage>,
}

async fn create_user(pool: &PgPool) -> User {
    UserRepository::new(pool.clone())
        .create_user(pool, &format!("{}@clinica.com", Uuid::new_v4()), "hash", None)
        .await
        .unwrap()
}

fn services(pool: &PgPool, storage: Arc<RecordingStorage>) -> (ProductService, MovementService) {
    let product_repo = ProductRepository::new(pool.clone());
    let movements = MovementService::new(
        pool.clone(),
        product_repo.clone(),
        MovementRepository::new(pool.clone()),
    );
    let products = ProductService::new(pool.clone(), product_repo, movements.clone(), storage);
    (products, movements)
}

async fn fixture(pool: &PgPool) -> Fixture {
    let user = create_user(pool).await;
    let storage = Arc::new(RecordingStorage::default());
    let (products, movements) = services(pool, storage.clone());
    Fixture { user, products, movements, storage }
}

fn draft(name: &str, current_stock: i32) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        category: ProductCategory::Injectables,
        current_stock,
        minimum_stock: 5,
        unit: ProductUnit::Vial,
        expiry_date: NaiveDate::from_ymd_opt(2030, 6, 30).unwrap(),
        batch_number: "L01".to_string(),
        supplier: "Distribuidora".to_string(),
        cost_price: Decimal::new(8990, 2),
        notes: String::new(),
        barcode: None,
    }
}

fn movement(product_id: Uuid, movement_type: MovementType, quantity: i32) -> MovementRequest {
    MovementRequest {
        product_id,
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

async fn ledger(f: &Fixture, product_id: Uuid) -> Vec<StockMovement> {
    let filter = MovementFilter { product_id: Some(product_id), limit: 100, ..Default::default() };
    f.movements.list_movements(f.user.id, &filter).await.unwrap()
}

async fn stored(f: &Fixture, id: Uuid) -> Product {
    f.products.get_product(f.user.id, id).await.unwrap()
}

fn photo() -> UploadedFile {
    UploadedFile { format: PhotoFormat::Png, bytes: Bytes::from_static(PNG) }
}

// ---
// Movimentações
// ---

#[sqlx::test(migrations = "./migrations")]
async fn entrada_updates_stock_and_appends_matching_row(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Toxina Botulínica", 5)).await.unwrap();

    let mut request = movement(product.id, MovementType::Entrada, 3);
    request.reason = MovementReason::Purchase;
    request.new_batch_number = Some("L02".into());
    request.new_cost_price = Some(Decimal::new(9500, 2));
    let receipt = f.movements.record_movement(f.user.id, &request).await.unwrap();

    assert_eq!(receipt.movement.previous_stock, 5);
    assert_eq!(receipt.movement.new_stock, 8);
    assert_eq!(receipt.movement.product_name, "Toxina Botulínica");
    assert_eq!(receipt.product.current_stock, 8);

    let current = stored(&f, product.id).await;
    assert_eq!(current.current_stock, receipt.movement.new_stock);
    assert_eq!(current.batch_number, "L02");
    assert_eq!(current.cost_price, Decimal::new(9500, 2));

    // Mais recente primeiro: a entrada e depois o estoque inicial
    let rows = ledger(&f, product.id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, receipt.movement.id);
    assert_eq!(rows[0].reason, MovementReason::Purchase);
    assert_eq!(rows[1].new_stock, rows[0].previous_stock);
}

#[sqlx::test(migrations = "./migrations")]
async fn saida_may_empty_the_stock(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Luvas", 4)).await.unwrap();

    let receipt = f
        .movements
        .record_movement(f.user.id, &movement(product.id, MovementType::Saida, 4))
        .await
        .unwrap();

    assert_eq!(receipt.movement.new_stock, 0);
    assert_eq!(stored(&f, product.id).await.current_stock, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn rejected_saida_leaves_product_and_ledger_untouched(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Ácido Hialurônico", 2)).await.unwrap();

    let err = f
        .movements
        .record_movement(f.user.id, &movement(product.id, MovementType::Saida, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 2, requested: 5 }));

    let mut with_batch = movement(product.id, MovementType::Saida, 1);
    with_batch.new_batch_number = Some("L99".into());
    assert!(f.movements.record_movement(f.user.id, &with_batch).await.is_err());

    let current = stored(&f, product.id).await;
    assert_eq!(current.current_stock, 2);
    assert_eq!(current.batch_number, "L01");
    assert_eq!(ledger(&f, product.id).await.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn movements_on_other_users_products_are_not_found(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Seringas", 10)).await.unwrap();
    let intruder = create_user(&pool).await;

    let err = f
        .movements
        .record_movement(intruder.id, &movement(product.id, MovementType::Saida, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound));
    assert_eq!(stored(&f, product.id).await.current_stock, 10);
}

// ---
// Produtos
// ---

#[sqlx::test(migrations = "./migrations")]
async fn initial_stock_is_recorded_as_manual_entry(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Bioestimulador", 12)).await.unwrap();
    assert_eq!(product.current_stock, 12);

    let rows = ledger(&f, product.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].movement_type, MovementType::Entrada);
    assert_eq!(rows[0].reason, MovementReason::ManualEntry);
    assert_eq!(rows[0].notes, "Estoque inicial");
    assert_eq!((rows[0].previous_stock, rows[0].new_stock, rows[0].quantity), (0, 12, 12));

    let empty = f.products.create_product(f.user.id, &draft("Gaze", 0)).await.unwrap();
    assert!(ledger(&f, empty.id).await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn editing_stock_appends_an_adjustment(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Máscaras", 10)).await.unwrap();

    let mut edited = draft("Máscaras N95", 4);
    edited.supplier = "Outro".into();
    let updated = f.products.update_product(f.user.id, product.id, &edited).await.unwrap();
    assert_eq!(updated.name, "Máscaras N95");
    assert_eq!(updated.current_stock, 4);

    let rows = ledger(&f, product.id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].movement_type, MovementType::Saida);
    assert_eq!(rows[0].reason, MovementReason::Adjustment);
    assert_eq!((rows[0].previous_stock, rows[0].new_stock, rows[0].quantity), (10, 4, 6));

    // Sem mudança de saldo, sem nova linha
    f.products.update_product(f.user.id, product.id, &edited).await.unwrap();
    assert_eq!(ledger(&f, product.id).await.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_keeps_history_and_removes_the_photo(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Anestésico", 3)).await.unwrap();

    let with_photo = f.products.set_photo(f.user.id, product.id, photo()).await.unwrap();
    assert!(with_photo.photo_url.ends_with(".png"));
    assert_eq!(f.storage.saved(), vec![with_photo.photo_url.clone()]);

    f.products.delete_product(f.user.id, product.id).await.unwrap();

    assert!(matches!(
        f.products.get_product(f.user.id, product.id).await,
        Err(AppError::ProductNotFound)
    ));
    assert_eq!(f.storage.deleted(), vec![with_photo.photo_url]);

    let rows = ledger(&f, product.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_name, "Anestésico");

    assert!(matches!(
        f.products.delete_product(f.user.id, product.id).await,
        Err(AppError::ProductNotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn replacing_a_photo_removes_the_previous_one(pool: PgPool) {
    let f = fixture(&pool).await;
    let product = f.products.create_product(f.user.id, &draft("Cânulas", 1)).await.unwrap();

    let first = f.products.set_photo(f.user.id, product.id, photo()).await.unwrap();
    let second = f.products.set_photo(f.user.id, product.id, photo()).await.unwrap();

    assert_ne!(first.photo_url, second.photo_url);
    assert_eq!(f.storage.deleted(), vec![first.photo_url]);
}

#[sqlx::test(migrations = "./migrations")]
async fn photo_saved_for_a_vanished_product_is_cleaned_up(pool: PgPool) {
    let user = create_user(&pool).await;
    let (products, _) = services(&pool, Arc::new(RecordingStorage::default()));
    let product = products.create_product(user.id, &draft("Fios", 2)).await.unwrap();

    let storage = Arc::new(RecordingStorage {
        delete_on_save: Some((pool.clone(), "DELETE FROM products WHERE id = $1", product.id)),
        ..Default::default()
    });
    let (products, _) = services(&pool, storage.clone());

    let err = products.set_photo(user.id, product.id, photo()).await.unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound));
    assert_eq!(storage.saved().len(), 1);
    assert_eq!(storage.deleted(), storage.saved());
}

#[sqlx::test(migrations = "./migrations")]
async fn avatar_saved_for_a_vanished_user_is_cleaned_up(pool: PgPool) {
    let user = create_user(&pool).await;
    let storage = Arc::new(RecordingStorage {
        delete_on_save: Some((pool.clone(), "DELETE FROM users WHERE id = $1", user.id)),
        ..Default::default()
    });
    let auth = AuthService::new(
        UserRepository::new(pool.clone()),
        SubscriptionRepository::new(pool.clone()),
        storage.clone(),
        "segredo-de-teste".into(),
        pool.clone(),
    );

    let err = auth.set_avatar(&user, photo()).await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound));
    assert_eq!(storage.saved().len(), 1);
    assert_eq!(storage.deleted(), storage.saved());
}

#[sqlx::test(migrations = "./migrations")]
async fn search_treats_wildcards_as_text(pool: PgPool) {
    let f = fixture(&pool).await;
    f.products.create_product(f.user.id, &draft("Desconto 50% Peeling", 1)).await.unwrap();
    f.products.create_product(f.user.id, &draft("Botox", 1)).await.unwrap();

    let search = |term: &str| ProductFilter { search: Some(term.to_string()), category: None };
    let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

    let found = f.products.list_products(f.user.id, &search("%"), today).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].product.name, "Desconto 50% Peeling");

    assert!(f.products.list_products(f.user.id, &search("_"), today).await.unwrap().is_empty());
    assert_eq!(f.products.list_products(f.user.id, &search("BOT"), today).await.unwrap().len(), 1);
}
