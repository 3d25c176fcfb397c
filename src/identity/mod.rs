pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use google::GoogleIdentity;

/// Verified identity extracted from a provider credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credential: {0}")]
    InvalidToken(String),

    #[error("identity provider unavailable: {0}")]
    Upstream(String),

    #[error("identity provider is not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Upstream(err.to_string())
    }
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<IdentityClaims, IdentityError>;
}

/// Used when no client id is configured.
pub struct DisabledIdentity;

#[async_trait]
impl IdentityGateway for DisabledIdentity {
    async fn verify(&self, _credential: &str) -> Result<IdentityClaims, IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
