// src/models/subscription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Estados de assinatura do processador de pagamentos
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn is_active(self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[schema(example = "sub_1PQxyz")]
    pub id: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub user_id: Uuid,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

// O que o cliente precisa saber para liberar o acesso
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: String,
    pub is_active: bool,
}

impl SubscriptionSummary {
    pub fn from_subscriptions(subscriptions: &[Subscription]) -> Self {
        match subscriptions.iter().find(|s| s.status.is_active()) {
            Some(active) => Self { id: active.id.clone(), is_active: true },
            None => Self { id: String::new(), is_active: false },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOverview {
    pub is_active: bool,
    pub subscriptions: Vec<Subscription>,
}

// Dados sincronizados a partir de um evento do Stripe
#[derive(Debug, Clone)]
pub struct SubscriptionSync {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

// --- Planos ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[schema(example = "Plano Mensal")]
    pub name: String,
    #[schema(example = "R$ 39,90")]
    pub price: String,
    pub interval: PlanInterval,
    pub price_id: String,
    pub features: Vec<String>,
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "price_1PQmonthly")]
    pub price_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedirectUrl {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: id.into(),
            user_id: Uuid::nil(),
            status,
            price_id: None,
            current_period_end: None,
            cancel_at_period_end: false,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_active_and_trialing_grant_access() {
        assert!(SubscriptionStatus::Active.is_active());
        assert!(SubscriptionStatus::Trialing.is_active());
        for status in [
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Unpaid,
            SubscriptionStatus::Paused,
        ] {
            assert!(!status.is_active(), "{status:?}");
        }
    }

    #[test]
    fn summary_picks_the_active_subscription() {
        let subs = vec![
            sub("sub_old", SubscriptionStatus::Canceled),
            sub("sub_new", SubscriptionStatus::Trialing),
        ];
        let summary = SubscriptionSummary::from_subscriptions(&subs);
        assert!(summary.is_active);
        assert_eq!(summary.id, "sub_new");
    }

    #[test]
    fn summary_without_subscriptions_is_inactive() {
        let summary = SubscriptionSummary::from_subscriptions(&[]);
        assert!(!summary.is_active);
        assert!(summary.id.is_empty());
    }

    #[test]
    fn status_uses_processor_spelling() {
        let status: SubscriptionStatus = serde_json::from_str("\"incomplete_expired\"").unwrap();
        assert_eq!(status, SubscriptionStatus::IncompleteExpired);
    }
}
