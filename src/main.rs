use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use brickbix_api::app::app;
use brickbix_api::config;
use brickbix_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use brickbix_api::identity::{DisabledIdentity, GoogleIdentity, IdentityGateway};
use brickbix_api::media::{CloudinaryMedia, DisabledMedia, MediaGateway};
use brickbix_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, CLOUDINARY_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("brickbix_api=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting BrickBix API in {:?} mode", config.environment);

    let (store, database): (Arc<dyn Store>, Option<DatabaseManager>) = match std::env::var("BRICKBIX_STORE").as_deref() {
        Ok("memory") => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            (Arc::new(MemoryStore::new()), None)
        }
        _ => {
            let db = DatabaseManager::connect(&config.database)
                .await
                .context("connecting to database")?;
            db.ensure_schema().await.context("creating schema")?;
            (Arc::new(PgStore::new(db.clone())), Some(db))
        }
    };

    let media: Arc<dyn MediaGateway> = match CloudinaryMedia::from_config(&config.media)? {
        Some(gateway) => Arc::new(gateway),
        None => {
            tracing::warn!("Cloudinary credentials not set; photo uploads are disabled");
            Arc::new(DisabledMedia)
        }
    };

    let identity: Arc<dyn IdentityGateway> = match GoogleIdentity::from_config(&config.identity)? {
        Some(gateway) => Arc::new(gateway),
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set; credential login is disabled");
            Arc::new(DisabledIdentity)
        }
    };

    if config.security.require_auth && config.identity.client_id.is_none() {
        tracing::warn!("require_auth is on but no identity provider is configured; mutations will be refused");
    }

    let state = AppState::new(store, media, identity, Arc::new(config.clone()));
    let router = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("BrickBix API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(db) = database {
        db.close().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
