// src/services/storage.rs

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::{error::AppError, upload::PhotoFormat};

/// Armazenamento de arquivos enviados pelos usuários (fotos).
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Grava o arquivo e devolve a URL pública.
    async fn save(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, AppError>;

    /// Remove o arquivo apontado por uma URL devolvida por `save`.
    /// URLs que não pertencem a este armazenamento são ignoradas.
    async fn delete_by_url(&self, url: &str) -> Result<(), AppError>;
}

pub fn product_photo_key(user_id: Uuid, product_id: Uuid, format: PhotoFormat) -> String {
    format!(
        "users/{user_id}/products/{product_id}/{}.{}",
        Uuid::new_v4(),
        format.extension()
    )
}

pub fn avatar_key(user_id: Uuid, format: PhotoFormat) -> String {
    format!("users/{user_id}/profile/{}.{}", Uuid::new_v4(), format.extension())
}

// ---
// Disco local, servido pelo router em `/uploads`
// ---

pub struct LocalFileStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), public_prefix: "/uploads".to_string() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Converte a chave em caminho, recusando qualquer coisa fora da raiz
    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "Chave de armazenamento inválida: {key}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, AppError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("Falha ao criar diretório {}: {e}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao gravar {}: {e}", path.display()))?;

        tracing::debug!("Arquivo salvo: {} ({}, {} bytes)", key, content_type, bytes.len());
        Ok(format!("{}/{}", self.public_prefix, key))
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
        let Some(key) = url
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Ok(());
        };

        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Falha ao remover {}: {e}", path.display()).into()),
        }
    }
}
