// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        DeviceTokenRepository, MovementRepository, ProductRepository, SubscriptionRepository,
        UserRepository,
    },
    services::{
        alert_service::AlertService,
        auth::AuthService,
        billing::{default_checkout_timeout, BillingGateway, BillingService, StripeClient},
        movement_service::MovementService,
        product_service::ProductService,
        push::{FcmClient, NotificationService, PushSender},
        storage::{FileStorage, LocalFileStorage},
    },
};

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub monthly_price_id: Option<String>,
    pub yearly_price_id: Option<String>,
    pub checkout_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub app_base_url: String,
    pub upload_dir: PathBuf,
    pub require_subscription: bool,
    pub stripe: StripeConfig,
    // Sem as três chaves o envio de push fica desabilitado
    pub fcm: Option<FcmConfig>,
    pub firebase_web_config: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de uma fonte qualquer de variáveis.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = optional("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = optional("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let require_subscription = match optional("REQUIRE_SUBSCRIPTION") {
            Some(value) => value
                .parse::<bool>()
                .with_context(|| format!("REQUIRE_SUBSCRIPTION inválido: {value}"))?,
            None => true,
        };

        let checkout_timeout = match optional("CHECKOUT_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .parse::<u64>()
                    .with_context(|| format!("CHECKOUT_TIMEOUT_SECS inválido: {value}"))?,
            ),
            None => default_checkout_timeout(),
        };

        let fcm = match (
            optional("FCM_PROJECT_ID"),
            optional("FCM_CLIENT_EMAIL"),
            optional("FCM_PRIVATE_KEY"),
        ) {
            (Some(project_id), Some(client_email), Some(private_key)) => Some(FcmConfig {
                project_id,
                client_email,
                private_key,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            app_base_url: optional("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            upload_dir: optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            require_subscription,
            stripe: StripeConfig {
                secret_key: optional("STRIPE_SECRET_KEY"),
                webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
                monthly_price_id: optional("STRIPE_PRICE_ID_MONTHLY"),
                yearly_price_id: optional("STRIPE_PRICE_ID_YEARLY"),
                checkout_timeout,
            },
            fcm,
            firebase_web_config: optional("FIREBASE_WEB_CONFIG").unwrap_or_else(|| "{}".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: &'static I18nStore,
    pub auth_service: AuthService,
    pub product_service: ProductService,
    pub movement_service: MovementService,
    pub alert_service: AlertService,
    pub billing_service: BillingService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Config::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::build(config, db_pool)
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn build(config: Config, db_pool: PgPool) -> anyhow::Result<Self> {
        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let movement_repo = MovementRepository::new(db_pool.clone());
        let subscription_repo = SubscriptionRepository::new(db_pool.clone());
        let device_token_repo = DeviceTokenRepository::new(db_pool.clone());

        // --- Colaboradores externos ---
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(config.upload_dir.clone()));

        let billing_gateway: Option<Arc<dyn BillingGateway>> = match &config.stripe.secret_key {
            Some(key) => Some(Arc::new(
                StripeClient::new(key.clone()).context("Falha ao criar o cliente do Stripe")?,
            )),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY ausente: checkout e portal desabilitados");
                None
            }
        };

        let push_sender: Option<Arc<dyn PushSender>> = match &config.fcm {
            Some(fcm) => Some(Arc::new(
                FcmClient::new(fcm).context("FCM_PRIVATE_KEY inválida")?,
            )),
            None => {
                tracing::warn!("Credenciais do FCM ausentes: envio de notificações desabilitado");
                None
            }
        };

        // --- Serviços ---
        let auth_service = AuthService::new(
            user_repo.clone(),
            subscription_repo.clone(),
            storage.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let movement_service =
            MovementService::new(db_pool.clone(), product_repo.clone(), movement_repo);
        let product_service = ProductService::new(
            db_pool.clone(),
            product_repo.clone(),
            movement_service.clone(),
            storage,
        );
        let alert_service = AlertService::new(product_repo);
        let billing_service = BillingService::new(
            billing_gateway,
            user_repo,
            subscription_repo,
            config.stripe.clone(),
        );
        let notification_service =
            NotificationService::new(device_token_repo, alert_service.clone(), push_sender);

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store: I18nStore::shared(),
            auth_service,
            product_service,
            movement_service,
            alert_service,
            billing_service,
            notification_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/clinicstock"),
        ("JWT_SECRET", "segredo"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = config_from(&REQUIRED).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.app_base_url, "http://localhost:3000");
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert!(config.require_subscription);
        assert_eq!(config.stripe.checkout_timeout, Duration::from_secs(20));
        assert!(config.stripe.secret_key.is_none());
        assert!(config.fcm.is_none());
        assert_eq!(config.firebase_web_config, "{}");
    }

    #[test]
    fn missing_required_vars_fail() {
        assert!(config_from(&[("JWT_SECRET", "x")]).is_err());
        assert!(config_from(&[("DATABASE_URL", "postgres://x")]).is_err());
    }

    #[test]
    fn optional_values_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("REQUIRE_SUBSCRIPTION", "false"),
            ("CHECKOUT_TIMEOUT_SECS", "5"),
            ("APP_BASE_URL", "https://app.clinicstock.com/"),
            ("STRIPE_PRICE_ID_MONTHLY", "price_m"),
            ("STRIPE_SECRET_KEY", "   "),
        ]);
        let config = config_from(&vars).unwrap();
        assert!(!config.require_subscription);
        assert_eq!(config.stripe.checkout_timeout, Duration::from_secs(5));
        assert_eq!(config.app_base_url, "https://app.clinicstock.com");
        assert_eq!(config.stripe.monthly_price_id.as_deref(), Some("price_m"));
        assert!(config.stripe.secret_key.is_none());
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("REQUIRE_SUBSCRIPTION", "talvez"));
        assert!(config_from(&vars).is_err());
    }

    #[test]
    fn fcm_needs_all_three_keys() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("FCM_PROJECT_ID", "clinicstock"), ("FCM_CLIENT_EMAIL", "sa@x.iam")]);
        assert!(config_from(&vars).unwrap().fcm.is_none());
    }
}
