// src/services/alert_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::{
        alerts::{AlertBuckets, AlertDigest, DashboardSummary, ExpiryEntry},
        product::{Product, ProductFilter, ProductStatus},
    },
};

const EXPIRING_SOON_DAYS: i64 = 7;
const EXPIRING_DAYS: i64 = 30;
const NEXT_EXPIRIES_LIMIT: usize = 5;

// ---
// Regras puras (recalculadas a cada requisição, nada é persistido)
// ---

/// Dias de calendário até a validade; negativo quando já venceu.
pub fn days_to_expiry(expiry_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiry_date - today).num_days()
}

fn is_low_stock(product: &Product) -> bool {
    product.current_stock > 0 && product.current_stock <= product.minimum_stock
}

/// Separa os produtos nos quatro baldes de alerta.
pub fn classify(products: &[Product], today: NaiveDate) -> AlertBuckets {
    let mut buckets = AlertBuckets::default();

    for product in products.iter().filter(|p| p.current_stock > 0) {
        let days = days_to_expiry(product.expiry_date, today);
        if days < 0 {
            buckets.expired.push(product.clone());
        } else if days <= EXPIRING_SOON_DAYS {
            buckets.expiring_7.push(product.clone());
        } else if days <= EXPIRING_DAYS {
            buckets.expiring_30.push(product.clone());
        }

        if is_low_stock(product) {
            buckets.low_stock.push(product.clone());
        }
    }

    buckets
}

/// Selo da listagem de produtos.
pub fn product_status(product: &Product, today: NaiveDate) -> ProductStatus {
    let days = days_to_expiry(product.expiry_date, today);
    if days < 0 {
        ProductStatus::Expired
    } else if product.current_stock <= product.minimum_stock {
        ProductStatus::LowStock
    } else if days <= EXPIRING_DAYS {
        ProductStatus::Expiring
    } else {
        ProductStatus::Ok
    }
}

/// Resumo usado pela notificação push.
pub fn notification_digest(products: &[Product], today: NaiveDate) -> AlertDigest {
    let mut expiring_soon = Vec::new();
    let mut low_stock = Vec::new();

    for product in products.iter().filter(|p| p.current_stock > 0) {
        let days = days_to_expiry(product.expiry_date, today);
        if (0..=EXPIRING_SOON_DAYS).contains(&days) {
            expiring_soon.push(product.name.clone());
        }
        if is_low_stock(product) {
            low_stock.push(product.name.clone());
        }
    }

    let alerts_found = expiring_soon.len() + low_stock.len();
    let (notification_title, notification_body) = match (expiring_soon.len(), low_stock.len()) {
        (0, 0) => (String::new(), String::new()),
        (expiring, 0) => (
            "Alerta de Estoque!".to_string(),
            format!("Você tem {expiring} produto(s) vencendo em breve."),
        ),
        (0, low) => (
            "Alerta de Estoque!".to_string(),
            format!("Você tem {low} produto(s) com estoque baixo."),
        ),
        (expiring, low) => (
            "Alerta de Estoque!".to_string(),
            format!("Você tem {expiring} produto(s) vencendo e {low} com estoque baixo."),
        ),
    };

    AlertDigest {
        alerts_found,
        expiring_soon,
        low_stock,
        notification_title,
        notification_body,
    }
}

/// Cards do painel e próximos vencimentos.
pub fn dashboard_summary(products: &[Product], today: NaiveDate) -> DashboardSummary {
    let expiring_30_count = products
        .iter()
        .filter(|p| p.current_stock > 0)
        .filter(|p| (0..=EXPIRING_DAYS).contains(&days_to_expiry(p.expiry_date, today)))
        .count();

    let low_stock_count = products.iter().filter(|p| is_low_stock(p)).count();

    let total_stock_value = products
        .iter()
        .map(|p| p.cost_price * Decimal::from(p.current_stock))
        .sum();

    let mut upcoming: Vec<&Product> = products
        .iter()
        .filter(|p| days_to_expiry(p.expiry_date, today) >= 0)
        .collect();
    upcoming.sort_by_key(|p| p.expiry_date);

    let next_expiries: Vec<ExpiryEntry> = upcoming
        .into_iter()
        .take(NEXT_EXPIRIES_LIMIT)
        .map(|p| ExpiryEntry {
            product_id: p.id,
            name: p.name.clone(),
            photo_url: p.photo_url.clone(),
            expiry_date: p.expiry_date,
            days_to_expiry: days_to_expiry(p.expiry_date, today),
            current_stock: p.current_stock,
        })
        .collect();

    let has_urgent_expiries = next_expiries.iter().any(|e| e.days_to_expiry <= EXPIRING_DAYS);

    DashboardSummary {
        total_products: products.len(),
        expiring_30_count,
        low_stock_count,
        total_stock_value,
        next_expiries,
        has_urgent_expiries,
    }
}

// ---
// Serviço (carrega os produtos e aplica as regras)
// ---

#[derive(Clone)]
pub struct AlertService {
    product_repo: ProductRepository,
}

impl AlertService {
    pub fn new(product_repo: ProductRepository) -> Self {
        Self { product_repo }
    }

    async fn all_products(&self, user_id: Uuid) -> Result<Vec<Product>, AppError> {
        self.product_repo
            .list_by_user(user_id, &ProductFilter::default())
            .await
    }

    pub async fn get_alerts(&self, user_id: Uuid, today: NaiveDate) -> Result<AlertBuckets, AppError> {
        let products = self.all_products(user_id).await?;
        Ok(classify(&products, today))
    }

    pub async fn get_dashboard(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<DashboardSummary, AppError> {
        let products = self.all_products(user_id).await?;
        Ok(dashboard_summary(&products, today))
    }

    pub async fn get_digest(&self, user_id: Uuid, today: NaiveDate) -> Result<AlertDigest, AppError> {
        let products = self.all_products(user_id).await?;
        Ok(notification_digest(&products, today))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::product::{ProductCategory, ProductUnit};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    pub(crate) fn product(name: &str, stock: i32, minimum: i32, expires_in_days: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_string(),
            category: ProductCategory::Injectables,
            photo_url: String::new(),
            current_stock: stock,
            minimum_stock: minimum,
            unit: ProductUnit::Vial,
            expiry_date: today() + Duration::days(expires_in_days),
            batch_number: "L01".into(),
            supplier: "Fornecedor".into(),
            cost_price: Decimal::new(1000, 2),
            notes: String::new(),
            barcode: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn expiry_buckets_are_exclusive() {
        let products = vec![
            product("vencido", 5, 1, -1),
            product("hoje", 5, 1, 0),
            product("sete", 5, 1, 7),
            product("oito", 5, 1, 8),
            product("trinta", 5, 1, 30),
            product("longe", 5, 1, 31),
        ];
        let buckets = classify(&products, today());
        assert_eq!(names(&buckets.expired), ["vencido"]);
        assert_eq!(names(&buckets.expiring_7), ["hoje", "sete"]);
        assert_eq!(names(&buckets.expiring_30), ["oito", "trinta"]);
        assert!(buckets.low_stock.is_empty());
        assert_eq!(buckets.total(), 5);
    }

    #[test]
    fn low_stock_is_independent_of_expiry() {
        let products = vec![product("baixo e vencendo", 2, 10, 3)];
        let buckets = classify(&products, today());
        assert_eq!(names(&buckets.expiring_7), ["baixo e vencendo"]);
        assert_eq!(names(&buckets.low_stock), ["baixo e vencendo"]);
        assert_eq!(buckets.total(), 2);
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        let products = vec![product("no limite", 10, 10, 90), product("acima", 11, 10, 90)];
        let buckets = classify(&products, today());
        assert_eq!(names(&buckets.low_stock), ["no limite"]);
    }

    #[test]
    fn zero_stock_never_alerts() {
        let products = vec![product("zerado vencido", 0, 10, -5), product("zerado", 0, 10, 2)];
        let buckets = classify(&products, today());
        assert_eq!(buckets.total(), 0);

        let digest = notification_digest(&products, today());
        assert_eq!(digest.alerts_found, 0);
        assert!(digest.notification_title.is_empty());
    }

    #[test]
    fn status_badge_prefers_expired_then_low_stock() {
        assert_eq!(product_status(&product("a", 1, 10, -1), today()), ProductStatus::Expired);
        assert_eq!(product_status(&product("b", 1, 10, 5), today()), ProductStatus::LowStock);
        assert_eq!(product_status(&product("c", 50, 10, 20), today()), ProductStatus::Expiring);
        assert_eq!(product_status(&product("d", 50, 10, 60), today()), ProductStatus::Ok);
    }

    #[test]
    fn digest_body_mentions_both_kinds() {
        let products = vec![
            product("vencendo", 50, 10, 3),
            product("baixo", 2, 10, 200),
            product("ok", 50, 10, 200),
        ];
        let digest = notification_digest(&products, today());
        assert_eq!(digest.alerts_found, 2);
        assert_eq!(digest.expiring_soon, ["vencendo"]);
        assert_eq!(digest.low_stock, ["baixo"]);
        assert_eq!(digest.notification_title, "Alerta de Estoque!");
        assert_eq!(
            digest.notification_body,
            "Você tem 1 produto(s) vencendo e 1 com estoque baixo."
        );
    }

    #[test]
    fn digest_ignores_already_expired_products() {
        let digest = notification_digest(&[product("vencido", 50, 10, -2)], today());
        assert_eq!(digest.alerts_found, 0);
    }

    #[test]
    fn digest_body_for_single_kind() {
        let only_low = notification_digest(&[product("baixo", 1, 10, 200)], today());
        assert_eq!(only_low.notification_body, "Você tem 1 produto(s) com estoque baixo.");

        let only_expiring = notification_digest(
            &[product("a", 50, 10, 1), product("b", 50, 10, 6)],
            today(),
        );
        assert_eq!(only_expiring.notification_body, "Você tem 2 produto(s) vencendo em breve.");
    }

    #[test]
    fn dashboard_summary_counts_and_values() {
        let mut cheap = product("barato", 4, 10, 40);
        cheap.cost_price = Decimal::new(250, 2); // 2,50
        let products = vec![
            cheap,
            product("vencendo", 20, 10, 12), // 20 x 10,00
            product("vencido", 3, 1, -3),    // 3 x 10,00
            product("zerado", 0, 1, 5),
        ];
        let summary = dashboard_summary(&products, today());
        assert_eq!(summary.total_products, 4);
        assert_eq!(summary.expiring_30_count, 1);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.total_stock_value, Decimal::new(24000, 2));
        assert!(summary.has_urgent_expiries);
    }

    #[test]
    fn next_expiries_are_sorted_and_capped() {
        let products: Vec<Product> = (0..8)
            .rev()
            .map(|i| product(&format!("p{i}"), 5, 1, i * 10))
            .chain(std::iter::once(product("vencido", 5, 1, -1)))
            .collect();
        let summary = dashboard_summary(&products, today());
        let next: Vec<&str> = summary.next_expiries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(next, ["p0", "p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn no_urgent_expiries_when_everything_is_far() {
        let summary = dashboard_summary(&[product("longe", 5, 1, 120)], today());
        assert!(!summary.has_urgent_expiries);
        assert_eq!(summary.next_expiries.len(), 1);
    }
}
