use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{IdentityClaims, IdentityError, IdentityGateway};
use crate::config::IdentityConfig;

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Google-style RS256 ID tokens against the provider's JWKS.
pub struct GoogleIdentity {
    http: reqwest::Client,
    client_id: String,
    jwks_url: String,
    issuers: Vec<String>,
    cache_ttl: Duration,
    refetch_after: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl GoogleIdentity {
    /// Returns `Ok(None)` when no client id is configured.
    pub fn from_config(config: &IdentityConfig) -> Result<Option<Self>, IdentityError> {
        let Some(client_id) = config.client_id.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        info!("Identity gateway configured ({})", config.jwks_url);
        Ok(Some(Self {
            http,
            client_id,
            jwks_url: config.jwks_url.clone(),
            issuers: config.issuers.clone(),
            cache_ttl: Duration::from_secs(config.jwks_cache_secs),
            refetch_after: Duration::from_secs(config.jwks_refetch_secs),
            cache: RwLock::new(None),
        }))
    }

    async fn fetch_keys(&self) -> Result<JwkSet, IdentityError> {
        let res = self.http.get(&self.jwks_url).send().await?;
        if !res.status().is_success() {
            return Err(IdentityError::Upstream(format!("JWKS fetch returned {}", res.status())));
        }
        let keys = res.json::<JwkSet>().await?;
        debug!("Fetched {} signing keys", keys.keys.len());
        Ok(keys)
    }

    /// Key for `kid`, from cache when fresh. A miss refetches to pick up
    /// rotated keys, at most once per `refetch_after`.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        if let Some(answer) = self.cached_key(self.cache.read().await.as_ref(), kid) {
            return answer;
        }

        let mut cache = self.cache.write().await;
        // another request may have refreshed the set while this one waited
        if let Some(answer) = self.cached_key(cache.as_ref(), kid) {
            return answer;
        }

        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        *cache = Some(CachedKeys { keys, fetched_at: Instant::now() });

        key.ok_or_else(|| unknown_key(kid))
    }

    /// `None` when the cache cannot settle `kid` and a fetch is due.
    fn cached_key(&self, cached: Option<&CachedKeys>, kid: &str) -> Option<Result<DecodingKey, IdentityError>> {
        let cached = cached?;
        let age = cached.fetched_at.elapsed();
        if age >= self.cache_ttl {
            return None;
        }
        match cached.keys.find(kid) {
            Some(jwk) => Some(DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::InvalidToken(e.to_string()))),
            None if age < self.refetch_after => Some(Err(unknown_key(kid))),
            None => None,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&self.issuers);
        validation
    }
}

fn unknown_key(kid: &str) -> IdentityError {
    IdentityError::InvalidToken(format!("unknown signing key {}", kid))
}

fn into_identity(claims: GoogleClaims) -> Result<IdentityClaims, IdentityError> {
    if claims.email_verified == Some(false) {
        return Err(IdentityError::InvalidToken("email not verified".to_string()));
    }
    let email = claims
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| IdentityError::InvalidToken("credential carries no email".to_string()))?;
    Ok(IdentityClaims {
        sub: claims.sub,
        email,
        name: claims.name,
        picture: claims.picture,
    })
}

#[async_trait]
impl IdentityGateway for GoogleIdentity {
    async fn verify(&self, credential: &str) -> Result<IdentityClaims, IdentityError> {
        let header = decode_header(credential).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<GoogleClaims>(credential, &key, &self.validation())
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        into_identity(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(email: Option<&str>, verified: Option<bool>) -> GoogleClaims {
        GoogleClaims {
            sub: "1234".into(),
            email: email.map(str::to_string),
            email_verified: verified,
            name: Some("Asha".into()),
            picture: None,
        }
    }

    #[test]
    fn missing_client_id_disables_gateway() {
        assert!(GoogleIdentity::from_config(&IdentityConfig::default()).unwrap().is_none());
    }

    #[test]
    fn claims_require_verified_email() {
        assert!(into_identity(claims(Some("a@x.com"), Some(true))).is_ok());
        assert!(into_identity(claims(Some("a@x.com"), None)).is_ok());
        assert!(into_identity(claims(Some("a@x.com"), Some(false))).is_err());
        assert!(into_identity(claims(None, Some(true))).is_err());
    }

    #[tokio::test]
    async fn garbage_credential_is_rejected_before_network() {
        let config = IdentityConfig {
            client_id: Some("client".into()),
            jwks_url: "http://127.0.0.1:9/certs".into(),
            ..IdentityConfig::default()
        };
        let gateway = GoogleIdentity::from_config(&config).unwrap().unwrap();
        assert!(matches!(
            gateway.verify("not-a-jwt").await,
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn unknown_key_ids_do_not_refetch_every_time() {
        use axum::{routing::get, Json, Router};
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let router = Router::new().route(
            "/certs",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({ "keys": [] }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        let config = IdentityConfig {
            client_id: Some("client".into()),
            jwks_url: format!("http://{}/certs", addr),
            ..IdentityConfig::default()
        };
        let gateway = GoogleIdentity::from_config(&config).unwrap().unwrap();
        let token = |kid: &str| {
            let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"RS256","typ":"JWT","kid":"{}"}}"#, kid));
            format!("{}.e30.c2ln", header)
        };

        for kid in ["forged-1", "forged-2", "forged-3"] {
            assert!(matches!(
                gateway.verify(&token(kid)).await,
                Err(IdentityError::InvalidToken(_))
            ));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
