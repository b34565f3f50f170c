// src/services/billing.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::StripeConfig,
    db::{SubscriptionRepository, UserRepository},
    models::{
        auth::User,
        subscription::{
            Plan, PlanInterval, SubscriptionOverview, SubscriptionStatus, SubscriptionSync,
        },
    },
};

const STRIPE_API: &str = "https://api.stripe.com/v1";
const SIGNATURE_TOLERANCE_SECS: i64 = 300;
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Operações do processador de pagamentos usadas pelo serviço.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Procura o cliente pelo metadado `userId`.
    async fn find_customer_by_user(&self, user_id: Uuid) -> Result<Option<String>, AppError>;

    async fn create_customer(&self, user_id: Uuid, email: &str) -> Result<String, AppError>;

    /// Sessão de checkout em modo assinatura; devolve a URL de redirecionamento.
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, AppError>;

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, AppError>;
}

// ---
// Cliente HTTP do Stripe
// ---

#[derive(Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Deserialize)]
struct StripeList {
    data: Vec<StripeObject>,
}

#[derive(Deserialize)]
struct StripeSession {
    url: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

pub struct StripeClient {
    http: Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Result<Self, AppError> {
        Self::with_endpoint(secret_key, STRIPE_API, HTTP_TIMEOUT)
    }

    fn with_endpoint(secret_key: String, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, secret_key, base_url: base_url.to_string() })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| status.to_string());
            tracing::error!("Stripe respondeu {}: {}", status, message);
            return Err(AppError::UpstreamError(format!("Stripe: {message}")));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BillingGateway for StripeClient {
    async fn find_customer_by_user(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let query = format!("metadata['userId']:'{user_id}'");
        let url = reqwest::Url::parse_with_params(
            &format!("{}/customers/search", self.base_url),
            &[("query", query.as_str()), ("limit", "1")],
        )
        .map_err(|e| anyhow::anyhow!("URL de busca inválida: {e}"))?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let list: StripeList = Self::read_json(response).await?;
        Ok(list.data.into_iter().next().map(|c| c.id))
    }

    async fn create_customer(&self, user_id: Uuid, email: &str) -> Result<String, AppError> {
        let user_id = user_id.to_string();
        let customer: StripeObject = self
            .post_form(
                "/customers",
                &[("email", email), ("metadata[userId]", user_id.as_str())],
            )
            .await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, AppError> {
        let session: StripeSession = self
            .post_form(
                "/checkout/sessions",
                &[
                    ("mode", "subscription"),
                    ("customer", customer_id),
                    ("payment_method_types[0]", "card"),
                    ("line_items[0][price]", price_id),
                    ("line_items[0][quantity]", "1"),
                    ("success_url", success_url),
                    ("cancel_url", cancel_url),
                ],
            )
            .await?;
        session
            .url
            .ok_or_else(|| AppError::UpstreamError("Stripe não devolveu a URL do checkout".into()))
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, AppError> {
        let session: StripeSession = self
            .post_form(
                "/billing_portal/sessions",
                &[("customer", customer_id), ("return_url", return_url)],
            )
            .await?;
        session
            .url
            .ok_or_else(|| AppError::UpstreamError("Stripe não devolveu a URL do portal".into()))
    }
}

// ---
// Webhook: assinatura e eventos
// ---

/// Confere o cabeçalho `Stripe-Signature` (`t=...,v1=...`) contra o corpo bruto.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    body: &str,
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::InvalidWebhookSignature("timestamp ausente".into()))?;
    if signatures.is_empty() {
        return Err(AppError::InvalidWebhookSignature("assinatura v1 ausente".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::InvalidWebhookSignature("timestamp inválido".into()))?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::InvalidWebhookSignature("timestamp fora da tolerância".into()));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::InvalidWebhookSignature(e.to_string()))?;
    mac.update(format!("{timestamp}.{body}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        Ok(())
    } else {
        Err(AppError::InvalidWebhookSignature("assinatura não confere".into()))
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookEventData,
}

#[derive(Deserialize)]
struct WebhookEventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct StripeSubscription {
    id: String,
    customer: String,
    status: SubscriptionStatus,
    #[serde(default)]
    cancel_at_period_end: bool,
    current_period_end: Option<i64>,
    items: Option<StripeItems>,
}

#[derive(Deserialize)]
struct StripeItems {
    data: Vec<StripeItem>,
}

#[derive(Deserialize)]
struct StripeItem {
    price: Option<StripeObject>,
    current_period_end: Option<i64>,
}

/// Extrai a assinatura de um evento `customer.subscription.*`.
/// Outros tipos de evento devolvem `None`.
pub fn parse_subscription_event(body: &str) -> Result<Option<SubscriptionSync>, AppError> {
    let event: WebhookEvent = serde_json::from_str(body)
        .map_err(|e| AppError::InvalidWebhookPayload(format!("Evento do Stripe inválido: {e}")))?;

    if !matches!(
        event.event_type.as_str(),
        "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted"
    ) {
        return Ok(None);
    }

    let subscription: StripeSubscription = serde_json::from_value(event.data.object)
        .map_err(|e| AppError::InvalidWebhookPayload(format!("Assinatura do Stripe inválida: {e}")))?;

    let first_item = subscription.items.as_ref().and_then(|items| items.data.first());
    let period_end = subscription
        .current_period_end
        .or_else(|| first_item.and_then(|item| item.current_period_end))
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    Ok(Some(SubscriptionSync {
        price_id: first_item.and_then(|item| item.price.as_ref()).map(|p| p.id.clone()),
        id: subscription.id,
        customer_id: subscription.customer,
        status: subscription.status,
        current_period_end: period_end,
        cancel_at_period_end: subscription.cancel_at_period_end,
    }))
}

// ---
// Serviço
// ---

#[derive(Clone)]
pub struct BillingService {
    gateway: Option<Arc<dyn BillingGateway>>,
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    config: StripeConfig,
}

impl BillingService {
    pub fn new(
        gateway: Option<Arc<dyn BillingGateway>>,
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        config: StripeConfig,
    ) -> Self {
        Self { gateway, user_repo, subscription_repo, config }
    }

    fn gateway(&self) -> Result<&Arc<dyn BillingGateway>, AppError> {
        self.gateway.as_ref().ok_or(AppError::IntegrationDisabled("stripe"))
    }

    pub fn plans(&self) -> Vec<Plan> {
        vec![
            Plan {
                name: "Plano Mensal".into(),
                price: "R$ 39,90".into(),
                interval: PlanInterval::Month,
                price_id: self.config.monthly_price_id.clone().unwrap_or_default(),
                features: vec![
                    "Gerenciamento de Produtos".into(),
                    "Controle de Estoque e Validade".into(),
                    "Histórico de Movimentações".into(),
                    "Alertas de Estoque Baixo".into(),
                    "Exportação de Dados".into(),
                ],
                is_featured: false,
            },
            Plan {
                name: "Plano Anual".into(),
                price: "R$ 399".into(),
                interval: PlanInterval::Year,
                price_id: self.config.yearly_price_id.clone().unwrap_or_default(),
                features: vec![
                    "Todos os benefícios do plano mensal".into(),
                    "2 meses de desconto".into(),
                    "Suporte prioritário".into(),
                    "Acesso a novas funcionalidades".into(),
                ],
                is_featured: true,
            },
        ]
    }

    fn is_known_price(&self, price_id: &str) -> bool {
        !price_id.is_empty() && self.plans().iter().any(|p| p.price_id == price_id)
    }

    // Cliente salvo, senão busca por metadado, senão cria
    async fn ensure_customer(&self, gateway: &dyn BillingGateway, user: &User) -> Result<String, AppError> {
        if let Some(customer_id) = user.stripe_customer_id.as_deref() {
            return Ok(customer_id.to_string());
        }

        let customer_id = match gateway.find_customer_by_user(user.id).await? {
            Some(existing) => existing,
            None => gateway.create_customer(user.id, &user.email).await?,
        };

        self.user_repo.set_stripe_customer(user.id, &customer_id).await?;
        tracing::info!("Cliente Stripe {} vinculado ao usuário {}", customer_id, user.id);
        Ok(customer_id)
    }

    pub async fn create_checkout(&self, user: &User, price_id: &str, origin: &str) -> Result<String, AppError> {
        if !self.is_known_price(price_id) {
            return Err(AppError::UnknownPlan(price_id.to_string()));
        }
        let gateway = self.gateway()?.clone();

        let success_url = format!("{origin}/profile?session_id={{CHECKOUT_SESSION_ID}}");
        let cancel_url = format!("{origin}/subscription");

        let exchange = async {
            let customer_id = self.ensure_customer(gateway.as_ref(), user).await?;
            gateway
                .create_checkout_session(&customer_id, price_id, &success_url, &cancel_url)
                .await
        };

        match tokio::time::timeout(self.config.checkout_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    "Checkout do usuário {} excedeu {:?}",
                    user.id,
                    self.config.checkout_timeout
                );
                Err(AppError::UpstreamTimeout)
            }
        }
    }

    pub async fn create_portal(&self, user: &User, origin: &str) -> Result<String, AppError> {
        let customer_id = user
            .stripe_customer_id
            .as_deref()
            .ok_or(AppError::BillingCustomerNotFound)?;
        let gateway = self.gateway()?;
        gateway
            .create_portal_session(customer_id, &format!("{origin}/profile"))
            .await
    }

    pub async fn handle_webhook(&self, signature: Option<&str>, body: &str) -> Result<(), AppError> {
        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .ok_or(AppError::IntegrationDisabled("stripe_webhook"))?;
        let signature = signature
            .ok_or_else(|| AppError::InvalidWebhookSignature("cabeçalho ausente".into()))?;

        verify_webhook_signature(secret, signature, body, Utc::now().timestamp())?;

        let Some(sync) = parse_subscription_event(body)? else {
            tracing::debug!("Evento do Stripe ignorado");
            return Ok(());
        };

        let Some(user) = self.user_repo.find_by_stripe_customer(&sync.customer_id).await? else {
            tracing::warn!(
                "Assinatura {} de cliente desconhecido {}",
                sync.id,
                sync.customer_id
            );
            return Ok(());
        };

        let saved = self.subscription_repo.upsert(user.id, &sync).await?;
        tracing::info!("Assinatura {} do usuário {}: {:?}", saved.id, user.id, saved.status);
        Ok(())
    }

    pub async fn overview(&self, user_id: Uuid) -> Result<SubscriptionOverview, AppError> {
        let subscriptions = self.subscription_repo.list_by_user(user_id).await?;
        Ok(SubscriptionOverview {
            is_active: subscriptions.iter().any(|s| s.status.is_active()),
            subscriptions,
        })
    }

    pub async fn has_active_subscription(&self, user_id: Uuid) -> Result<bool, AppError> {
        self.subscription_repo.has_active(user_id).await
    }
}

pub fn default_checkout_timeout() -> Duration {
    Duration::from_secs(20)
}
