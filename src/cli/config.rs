use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::{ApiClient, Session};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub selected_at: DateTime<Utc>,
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("BRICKBIX_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("brickbix").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn read_json<T: for<'de> Deserialize<'de>>(file: &Path) -> anyhow::Result<Option<T>> {
    if !file.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(file)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_json<T: Serialize>(file: &Path, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(file, content)?;
    Ok(())
}

pub fn load_session_in(dir: &Path) -> anyhow::Result<Option<Session>> {
    read_json(&dir.join("session.json"))
}

pub fn save_session_in(dir: &Path, session: &Session) -> anyhow::Result<()> {
    write_json(&dir.join("session.json"), session)
}

/// Returns whether a session file existed.
pub fn clear_session_in(dir: &Path) -> anyhow::Result<bool> {
    let file = dir.join("session.json");
    if !file.exists() {
        return Ok(false);
    }
    fs::remove_file(file)?;
    Ok(true)
}

pub fn load_server_config_in(dir: &Path) -> anyhow::Result<Option<ServerConfig>> {
    read_json(&dir.join("server.json"))
}

pub fn save_server_config_in(dir: &Path, config: &ServerConfig) -> anyhow::Result<()> {
    write_json(&dir.join("server.json"), config)
}

pub fn load_session() -> anyhow::Result<Option<Session>> {
    load_session_in(&get_config_dir()?)
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    save_session_in(&get_config_dir()?, session)
}

pub fn clear_session() -> anyhow::Result<bool> {
    clear_session_in(&get_config_dir()?)
}

/// `--server`, then `BRICKBIX_API_URL`, then the saved server, then localhost.
pub fn resolve_server_url(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(url) = flag {
        return Ok(url);
    }
    if let Ok(url) = std::env::var("BRICKBIX_API_URL") {
        return Ok(url);
    }
    Ok(load_server_config_in(&get_config_dir()?)?
        .map(|c| c.url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()))
}

/// Client for the resolved server, resuming the saved session.
pub fn build_client(server: Option<String>) -> anyhow::Result<ApiClient> {
    let url = resolve_server_url(server)?;
    let client = ApiClient::new(&url)?;
    Ok(client.with_session(load_session()?))
}
