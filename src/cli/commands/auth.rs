use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{build_client, clear_session, save_session};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login with a Google ID token")]
    Login {
        #[arg(help = "ID token issued by Google Sign-In")]
        credential: String,
    },

    #[command(about = "Forget the saved session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { credential } => {
            let mut client = build_client(server)?;
            let session = client.login(credential.trim()).await?;
            save_session(session)?;
            output_success(
                output_format,
                &format!("Logged in as {} <{}>", session.user.name, session.email()),
                Some(json!({ "user": session.user })),
            )
        }
        AuthCommands::Logout => {
            let mut client = build_client(server)?;
            let dropped = client.logout();
            clear_session()?;
            match dropped {
                Some(session) => output_success(output_format, &format!("Logged out {}", session.email()), None),
                None => output_success(output_format, "No active session", None),
            }
        }
        AuthCommands::Status => {
            let client = build_client(server)?;
            match client.session() {
                Some(session) => output_success(
                    output_format,
                    &format!(
                        "Logged in to {} as {} since {}",
                        client.base_url(),
                        session.email(),
                        session.started_at.format("%Y-%m-%d %H:%M UTC")
                    ),
                    Some(json!({ "server": client.base_url(), "user": session.user })),
                ),
                None => output_success(
                    output_format,
                    &format!("Not logged in to {}", client.base_url()),
                    Some(json!({ "server": client.base_url(), "user": null })),
                ),
            }
        }
    }
}
