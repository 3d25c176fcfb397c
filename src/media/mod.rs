pub mod cloudinary;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cloudinary::CloudinaryMedia;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media gateway is not configured")]
    NotConfigured,

    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("media gateway rejected request: {0}")]
    Upstream(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Hosts listing photos. Uploads happen before any store write; destroys
/// are best-effort.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Upload an image given as a data URI or bare base64.
    async fn upload(&self, payload: &str) -> Result<UploadedMedia, MediaError>;
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
    fn is_configured(&self) -> bool {
        true
    }
}

/// Used when no media credentials are configured.
pub struct DisabledMedia;

#[async_trait]
impl MediaGateway for DisabledMedia {
    async fn upload(&self, _payload: &str) -> Result<UploadedMedia, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn destroy(&self, _public_id: &str) -> Result<(), MediaError> {
        Err(MediaError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }
}

pub fn is_hosted_url(photo: &str) -> bool {
    let lower = photo.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Last path segment without its extension, e.g.
/// `https://res.cloudinary.com/demo/image/upload/v1/abc123.jpg` -> `abc123`.
pub fn public_id_from_url(photo: &str) -> Option<String> {
    if !is_hosted_url(photo) {
        return None;
    }
    let parsed = url::Url::parse(photo.trim()).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let id = segment.split('.').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Normalize an inline image to a `data:` URI after checking the base64 decodes.
pub fn normalize_payload(payload: &str) -> Result<String, MediaError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(MediaError::InvalidPayload("empty".to_string()));
    }
    let (mime, data) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| MediaError::InvalidPayload("data URI without ','".to_string()))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| MediaError::InvalidPayload("data URI is not base64".to_string()))?;
            (mime.to_string(), data)
        }
        None => ("image/jpeg".to_string(), payload),
    };
    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| MediaError::InvalidPayload(e.to_string()))?;
    Ok(format!("data:{};base64,{}", mime, data))
}
