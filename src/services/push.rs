// src/services/push.rs

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::FcmConfig,
    db::DeviceTokenRepository,
    models::{
        alerts::AlertDigest,
        notification::{DeliveryOutcome, DeviceToken, PushMessage, SendAlertResponse},
    },
    services::alert_service::AlertService,
};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const NOTIFICATION_ICON: &str = "/logo.png";
const NOTIFICATION_LINK: &str = "/alerts";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Envia uma mensagem para um único token de dispositivo.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<DeliveryOutcome, AppError>;
}

// ---
// Cliente do FCM (HTTP v1)
// ---

#[derive(Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct FcmClient {
    http: Client,
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    access_token: Mutex<Option<CachedToken>>,
}

impl FcmClient {
    pub fn new(config: &FcmConfig) -> Result<Self, AppError> {
        // A chave costuma vir do .env com as quebras de linha escapadas
        let pem = config.private_key.replace("\\n", "\n");
        let signing_key = EncodingKey::from_rsa_pem(pem.as_bytes())?;

        // Limita também a espera de quem aguarda o lock do token
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            project_id: config.project_id.clone(),
            client_email: config.client_email.clone(),
            signing_key,
            access_token: Mutex::new(None),
        })
    }

    // Token OAuth em cache, renovado um minuto antes de expirar
    async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: &self.client_email,
            scope: MESSAGING_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?;

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Falha ao obter token do FCM ({}): {}", status, body);
            return Err(AppError::UpstreamError(format!("OAuth do FCM respondeu {status}")));
        }

        let token: AccessTokenResponse = response.json().await?;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<DeliveryOutcome, AppError> {
        let access_token = self.access_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&message_body(token, message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(DeliveryOutcome::Delivered);
        }
        let body = response.text().await.unwrap_or_default();
        Ok(classify_send_error(&body))
    }
}

fn message_body(token: &str, message: &PushMessage) -> serde_json::Value {
    json!({
        "message": {
            "token": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "webpush": {
                "notification": { "icon": message.icon },
                "fcm_options": { "link": message.link },
            },
        }
    })
}

#[derive(Deserialize)]
struct FcmErrorBody {
    error: FcmError,
}

#[derive(Deserialize)]
struct FcmError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Tokens desregistrados ou inválidos viram `Unregistered` (devem ser apagados).
pub fn classify_send_error(body: &str) -> DeliveryOutcome {
    let Ok(parsed) = serde_json::from_str::<FcmErrorBody>(body) else {
        return DeliveryOutcome::Failed(body.chars().take(200).collect());
    };
    let error = parsed.error;

    let unregistered = error
        .details
        .iter()
        .any(|d| d.error_code.as_deref() == Some("UNREGISTERED"));
    let invalid_token =
        error.status == "INVALID_ARGUMENT" && error.message.to_lowercase().contains("registration token");

    if unregistered || invalid_token {
        DeliveryOutcome::Unregistered
    } else {
        DeliveryOutcome::Failed(format!("{}: {}", error.status, error.message))
    }
}

// ---
// Disparo
// ---

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub stale_tokens: Vec<String>,
    pub failed: usize,
}

pub fn alert_message(digest: &AlertDigest) -> PushMessage {
    PushMessage {
        title: digest.notification_title.clone(),
        body: digest.notification_body.clone(),
        icon: NOTIFICATION_ICON.to_string(),
        link: NOTIFICATION_LINK.to_string(),
    }
}

/// Uma mensagem por token; falhas individuais não interrompem as demais.
pub async fn dispatch(sender: &dyn PushSender, tokens: &[String], message: &PushMessage) -> DispatchReport {
    let mut report = DispatchReport::default();

    for token in tokens {
        match sender.send(token, message).await {
            Ok(DeliveryOutcome::Delivered) => report.delivered += 1,
            Ok(DeliveryOutcome::Unregistered) => report.stale_tokens.push(token.clone()),
            Ok(DeliveryOutcome::Failed(reason)) => {
                tracing::warn!("Falha ao enviar notificação: {}", reason);
                report.failed += 1;
            }
            Err(e) => {
                tracing::warn!("Erro ao enviar notificação: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

#[derive(Clone)]
pub struct NotificationService {
    token_repo: DeviceTokenRepository,
    alert_service: AlertService,
    sender: Option<Arc<dyn PushSender>>,
}

impl NotificationService {
    pub fn new(
        token_repo: DeviceTokenRepository,
        alert_service: AlertService,
        sender: Option<Arc<dyn PushSender>>,
    ) -> Self {
        Self { token_repo, alert_service, sender }
    }

    pub async fn register_token(&self, user_id: Uuid, token: &str) -> Result<DeviceToken, AppError> {
        self.token_repo.register(user_id, token.trim()).await
    }

    pub async fn revoke_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        if !self.token_repo.revoke(user_id, token.trim()).await? {
            tracing::debug!("Token de notificação já removido para o usuário {}", user_id);
        }
        Ok(())
    }

    pub async fn send_alerts(&self, user_id: Uuid, today: NaiveDate) -> Result<SendAlertResponse, AppError> {
        let digest = self.alert_service.get_digest(user_id, today).await?;

        if digest.alerts_found == 0 {
            return Ok(SendAlertResponse {
                success: true,
                message: "No alerts to send.".into(),
                alerts_found: 0,
                notifications_sent: 0,
            });
        }

        let tokens = self.token_repo.list_tokens(user_id).await?;
        if tokens.is_empty() {
            return Ok(SendAlertResponse {
                success: true,
                message: "No notification tokens found for user.".into(),
                alerts_found: digest.alerts_found,
                notifications_sent: 0,
            });
        }

        let sender = self.sender.as_ref().ok_or(AppError::IntegrationDisabled("fcm"))?;
        let report = dispatch(sender.as_ref(), &tokens, &alert_message(&digest)).await;

        if !report.stale_tokens.is_empty() {
            let removed = self.token_repo.delete_many(user_id, &report.stale_tokens).await?;
            tracing::info!("{} token(s) inválido(s) removido(s) do usuário {}", removed, user_id);
        }

        Ok(SendAlertResponse {
            success: true,
            message: format!("Sent {} notifications.", report.delivered),
            alerts_found: digest.alerts_found,
            notifications_sent: report.delivered,
        })
    }
}
