use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{get_config_dir, resolve_server_url, save_server_config_in, ServerConfig};
use crate::cli::utils::{output_success, output_value};
use crate::cli::OutputFormat;
use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from the /health endpoint")]
    Health,

    #[command(about = "Remember a server URL for later commands")]
    Use {
        #[arg(help = "Server URL, e.g. https://api.brickbix.in")]
        url: String,
    },

    #[command(about = "Show the server commands will talk to")]
    Current,
}

pub async fn handle(cmd: ServerCommands, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health => {
            let client = ApiClient::new(&resolve_server_url(server)?)?;
            let status = client.health().await?;
            output_value(output_format, &status, |s| {
                if s.healthy {
                    format!("✓ {} is healthy", client.base_url())
                } else {
                    format!("✗ {} is degraded: {}", client.base_url(), s.body)
                }
            })?;
            if !status.healthy {
                anyhow::bail!("server reported unhealthy");
            }
            Ok(())
        }
        ServerCommands::Use { url } => {
            // validates the URL before saving it
            let client = ApiClient::new(&url)?;
            let config = ServerConfig {
                url: client.base_url().to_string(),
                selected_at: Utc::now(),
            };
            save_server_config_in(&get_config_dir()?, &config)?;
            output_success(
                output_format,
                &format!("Using server {}", config.url),
                Some(json!({ "server": config.url })),
            )
        }
        ServerCommands::Current => {
            let url = resolve_server_url(server)?;
            output_success(output_format, &format!("Current server: {}", url), Some(json!({ "server": url })))
        }
    }
}
