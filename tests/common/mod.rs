#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use brickbix_api::app::app;
use brickbix_api::database::models::User;
use brickbix_api::database::MemoryStore;
use brickbix_api::testing::{seed_user, test_state, FakeMedia, StaticIdentity};

/// The real router on a free port, backed by the in-memory store and fakes.
/// Lives as long as the test's runtime.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: MemoryStore,
    pub media: Arc<FakeMedia>,
    pub http: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(StaticIdentity::new(), false).await
    }

    pub async fn start_with(identity: StaticIdentity, require_auth: bool) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = MemoryStore::new();
        let media = FakeMedia::new();
        let router = app(test_state(store.clone(), media.clone(), identity, require_auth));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        let server = Self { port, base_url, store, media, http: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.http.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub async fn seed_user(&self, email: &str) -> Result<User> {
        Ok(seed_user(&self.store, email).await?)
    }

    pub async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.http.get(self.url(path)).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let res = self.http.post(self.url(path)).json(body).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let res = self.http.patch(self.url(path)).json(body).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.http.delete(self.url(path)).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }
}

/// Minimal valid property body.
pub fn property_body(email: &str, title: &str, property_type: &str, price: i64) -> Value {
    serde_json::json!({
        "title": title,
        "description": "Well lit, close to market",
        "propertyType": property_type,
        "dealType": "Direct",
        "location": "Baner, Pune",
        "price": price,
        "totalSquareFeet": 1100,
        "phone": "9820012345",
        "email": email,
    })
}

pub fn requirement_body(email: &str, title: &str, asked_price: i64) -> Value {
    serde_json::json!({
        "title": title,
        "description": "Client wants ready possession",
        "propertyType": "apartment",
        "dealType": "Indirect",
        "location": "Kothrud, Pune",
        "askedPrice": asked_price,
        "phone": "9820054321",
        "email": email,
    })
}
