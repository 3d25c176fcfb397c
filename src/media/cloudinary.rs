use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

use super::{normalize_payload, MediaError, MediaGateway, UploadedMedia};
use crate::config::MediaConfig;

/// Cloudinary-compatible signed upload API.
pub struct CloudinaryMedia {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryMedia {
    /// Returns `Ok(None)` when credentials are incomplete.
    pub fn from_config(config: &MediaConfig) -> Result<Option<Self>, MediaError> {
        let Some((cloud_name, api_key, api_secret)) = config.credentials() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        info!("Media gateway configured for cloud {}", cloud_name);
        Ok(Some(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            folder: config.folder.clone(),
        }))
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    /// SHA-256 over the `&`-joined sorted parameters followed by the secret.
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        params.push(("timestamp", chrono::Utc::now().timestamp().to_string()));
        let signature = self.sign(&params);
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params.push(("api_key", self.api_key.clone()));
        params
    }

    fn qualified_id(&self, public_id: &str) -> String {
        match &self.folder {
            Some(folder) if !public_id.contains('/') => format!("{}/{}", folder, public_id),
            _ => public_id.to_string(),
        }
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        form: Vec<(&'static str, String)>,
    ) -> Result<T, MediaError> {
        let res = self.http.post(self.endpoint(action)).form(&form).send().await?;
        let status = res.status();
        if !status.is_success() {
            let message = match res.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            return Err(MediaError::Upstream(message));
        }
        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl MediaGateway for CloudinaryMedia {
    async fn upload(&self, payload: &str) -> Result<UploadedMedia, MediaError> {
        let file = normalize_payload(payload)?;
        let mut params = vec![];
        if let Some(folder) = &self.folder {
            params.push(("folder", folder.clone()));
        }
        let mut form = self.signed_form(params);
        form.push(("file", file));

        let uploaded: UploadResponse = self.post("upload", form).await?;
        debug!(public_id = %uploaded.public_id, "uploaded image");
        Ok(UploadedMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let form = self.signed_form(vec![("public_id", self.qualified_id(public_id))]);
        let res: DestroyResponse = self.post("destroy", form).await?;
        match res.result.as_str() {
            "ok" => Ok(()),
            other => Err(MediaError::Upstream(format!("destroy {}: {}", public_id, other))),
        }
    }
}
