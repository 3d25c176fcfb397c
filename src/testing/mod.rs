//! Fakes and fixtures shared by unit and integration tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::models::{NewUser, User};
use crate::database::{DatabaseError, MemoryStore, Store};
use crate::identity::{IdentityClaims, IdentityError, IdentityGateway};
use crate::media::{MediaError, MediaGateway, UploadedMedia};
use crate::services::{PropertyInput, RequirementInput};
use crate::state::AppState;

/// Media gateway that records calls and can be told to fail.
#[derive(Default)]
pub struct FakeMedia {
    uploads: Mutex<Vec<String>>,
    destroyed: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
    fail_destroys: AtomicBool,
    upload_delay_ms: AtomicU64,
    counter: AtomicUsize,
}

impl FakeMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_destroys(&self, fail: bool) {
        self.fail_destroys.store(fail, Ordering::SeqCst);
    }

    /// Hold every upload for `delay` before answering.
    pub fn set_upload_delay(&self, delay: Duration) {
        self.upload_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Payloads received by `upload`.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Public ids successfully destroyed.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MediaGateway for FakeMedia {
    async fn upload(&self, payload: &str) -> Result<UploadedMedia, MediaError> {
        let delay = self.upload_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Upstream("upload rejected".to_string()));
        }
        crate::media::normalize_payload(payload)?;
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.to_string());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let public_id = format!("fake{}", n);
        Ok(UploadedMedia {
            url: format!("https://res.cloudinary.com/test/image/upload/v1/{}.jpg", public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        if self.fail_destroys.load(Ordering::SeqCst) {
            return Err(MediaError::Upstream("destroy rejected".to_string()));
        }
        self.destroyed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(public_id.to_string());
        Ok(())
    }
}

/// Identity gateway backed by a fixed token table.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: HashMap<String, IdentityClaims>,
    unreachable: bool,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose provider never answers.
    pub fn unreachable() -> Self {
        Self { tokens: HashMap::new(), unreachable: true }
    }

    pub fn with_user(mut self, token: &str, email: &str, name: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            IdentityClaims {
                sub: format!("sub-{}", token),
                email: email.to_string(),
                name: Some(name.to_string()),
                picture: None,
            },
        );
        self
    }
}

#[async_trait]
impl IdentityGateway for StaticIdentity {
    async fn verify(&self, credential: &str) -> Result<IdentityClaims, IdentityError> {
        if self.unreachable {
            return Err(IdentityError::Upstream("connection refused".to_string()));
        }
        self.tokens
            .get(credential)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidToken("unknown token".to_string()))
    }
}

pub async fn seed_user(store: &dyn Store, email: &str) -> Result<User, DatabaseError> {
    let name = email.split('@').next().unwrap_or(email).to_string();
    let user = NewUser { name, email: email.to_string(), avatar: None }.into_user(Utc::now());
    store.create_user(&user).await
}

pub fn property_input(email: &str) -> PropertyInput {
    PropertyInput {
        title: Some("2BHK near station".into()),
        description: Some("Sunny flat, second floor".into()),
        property_type: Some("Apartment".into()),
        deal_type: Some("Direct".into()),
        location: Some("Andheri West, Mumbai".into()),
        price: Some(8_500_000),
        total_square_feet: Some(950),
        phone: Some("9820012345".into()),
        photo: None,
        email: Some(email.into()),
    }
}

pub fn requirement_input(email: &str) -> RequirementInput {
    RequirementInput {
        title: Some("Looking for 1BHK".into()),
        description: Some("Near metro, ready to move".into()),
        property_type: Some("apartment".into()),
        deal_type: Some("Indirect".into()),
        location: Some("Pune".into()),
        asked_price: Some(4_000_000),
        phone: Some("9820054321".into()),
        email: Some(email.into()),
    }
}

/// Application state over the in-memory store and fakes.
pub fn test_state(
    store: MemoryStore,
    media: Arc<FakeMedia>,
    identity: StaticIdentity,
    require_auth: bool,
) -> AppState {
    let mut config = AppConfig::development();
    config.security.require_auth = require_auth;
    AppState::new(Arc::new(store), media, Arc::new(identity), Arc::new(config))
}
