// src/common/upload.rs

use axum::{body::Bytes, extract::Multipart};
use utoipa::ToSchema;

use crate::common::error::AppError;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

// Limite do corpo das rotas de upload (foto + cabeçalhos do multipart)
pub const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Formatos de foto aceitos. O tipo gravado e a extensão servida saem daqui,
/// nunca do nome ou do Content-Type enviados pelo cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl PhotoFormat {
    fn from_declared(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Identifica o formato pela assinatura dos primeiros bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else {
            None
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub format: PhotoFormat,
    pub bytes: Bytes,
}

// Formato documentado das rotas de upload
#[derive(ToSchema)]
pub struct PhotoUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

/// O tipo declarado precisa estar na lista e bater com o conteúdo.
pub fn validate_photo(content_type: &str, bytes: &[u8]) -> Result<PhotoFormat, AppError> {
    let declared = PhotoFormat::from_declared(content_type)
        .ok_or(AppError::InvalidUpload("not_an_image"))?;
    if bytes.is_empty() {
        return Err(AppError::InvalidUpload("missing_photo"));
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::InvalidUpload("photo_too_large"));
    }
    match PhotoFormat::sniff(bytes) {
        Some(actual) if actual == declared => Ok(actual),
        _ => Err(AppError::InvalidUpload("not_an_image")),
    }
}

/// Lê o campo `photo` do formulário e valida tipo e tamanho.
pub async fn read_photo(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::InvalidUpload("invalid_upload"))?
    {
        if field.name() != Some("photo") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::InvalidUpload("photo_too_large"))?;

        let format = validate_photo(&content_type, &bytes)?;
        return Ok(UploadedFile { format, bytes });
    }

    Err(AppError::InvalidUpload("missing_photo"))
}
