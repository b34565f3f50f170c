// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, upload::UploadedFile},
    db::{SubscriptionRepository, UserRepository},
    models::{
        auth::{Claims, MeResponse, User},
        subscription::SubscriptionSummary,
    },
    services::storage::{avatar_key, FileStorage},
};

const SESSION_DAYS: i64 = 7;

/// Gera o token de sessão (HS256, `sub` = id do usuário).
pub fn encode_session_token(secret: &str, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
    let expires_at = now + Duration::days(SESSION_DAYS);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_session_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    storage: Arc<dyn FileStorage>,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        storage: Arc<dyn FileStorage>,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, subscription_repo, storage, jwt_secret, pool }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, AppError> {
        // 1. Hashing fora do runtime assíncrono
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria o usuário
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());
        let new_user = self
            .user_repo
            .create_user(&self.pool, &normalize_email(email), &hashed_password, display_name)
            .await?;

        tracing::info!("Novo usuário registrado: {}", new_user.id);

        // 3. Token de sessão
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_session_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        encode_session_token(&self.jwt_secret, user_id, Utc::now())
    }

    // ---
    // Perfil
    // ---

    pub async fn get_me(&self, user: User) -> Result<MeResponse, AppError> {
        let subscriptions = self.subscription_repo.list_by_user(user.id).await?;
        Ok(MeResponse {
            user,
            subscription: SubscriptionSummary::from_subscriptions(&subscriptions),
        })
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<User, AppError> {
        let email = email.map(normalize_email);
        let display_name = display_name.map(str::trim);
        self.user_repo
            .update_profile(user_id, email.as_deref(), display_name)
            .await
    }

    /// Troca a foto de perfil; a anterior é removida sem interromper a troca.
    pub async fn set_avatar(&self, user: &User, file: UploadedFile) -> Result<User, AppError> {
        let key = avatar_key(user.id, file.format);
        let url = self.storage.save(&key, file.format.content_type(), &file.bytes).await?;

        let updated = match self.user_repo.update_photo(user.id, &url).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_by_url(&url).await {
                    tracing::warn!("Falha ao remover foto de perfil órfã {}: {}", url, cleanup);
                }
                return Err(e);
            }
        };

        if let Some(previous) = user.photo_url.as_deref().filter(|p| !p.is_empty()) {
            if let Err(e) = self.storage.delete_by_url(previous).await {
                tracing::warn!("Falha ao remover foto de perfil antiga {}: {}", previous, e);
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "segredo-de-teste";

    #[test]
    fn session_token_round_trips_the_user_id() {
        let user_id = Uuid::new_v4();
        let token = encode_session_token(SECRET, user_id, Utc::now()).unwrap();
        let claims = decode_session_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode_session_token("outro", Uuid::new_v4(), Utc::now()).unwrap();
        assert!(matches!(
            decode_session_token(SECRET, &token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::days(8);
        let token = encode_session_token(SECRET, Uuid::new_v4(), issued).unwrap();
        assert!(matches!(
            decode_session_token(SECRET, &token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_session_token(SECRET, "nao.e.jwt").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Clinica@Email.COM "), "clinica@email.com");
    }
}
