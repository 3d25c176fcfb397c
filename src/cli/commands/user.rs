use clap::Subcommand;
use serde_json::json;

use super::property::session_email;
use crate::cli::config::{build_client, save_session};
use crate::cli::utils::{output_success, output_value, property_row};
use crate::cli::OutputFormat;
use crate::client::Session;
use crate::services::UserProfileInput;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List every agent")]
    List,

    #[command(about = "Show an agent and their properties")]
    Get { id: String },

    #[command(about = "Update the logged-in agent's profile")]
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        work_location: Option<String>,
        #[arg(long)]
        rera: Option<String>,
    },
}

pub async fn handle(cmd: UserCommands, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = build_client(server)?;
    match cmd {
        UserCommands::List => {
            let users = client.list_users().await?;
            output_value(output_format, &users, |users| {
                users
                    .iter()
                    .map(|u| format!("{}  {:<24}  {}", u.id, u.name, u.email))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        UserCommands::Get { id } => {
            let user = client.get_user(&id).await?;
            output_value(output_format, &user, |u| {
                let mut text = format!("{} <{}>\n", u.name, u.email);
                if let Some(phone) = &u.phone_number {
                    text.push_str(&format!("Phone: {}\n", phone));
                }
                if let Some(rera) = &u.rera_number {
                    text.push_str(&format!("RERA: {}\n", rera));
                }
                text.push_str(&format!("{} properties\n", u.all_properties.len()));
                for p in &u.all_properties {
                    text.push_str(&property_row(p));
                    text.push('\n');
                }
                text.trim_end().to_string()
            })
        }
        UserCommands::Update { name, phone, work_location, rera } => {
            let email = session_email(&client).ok_or_else(|| anyhow::anyhow!("not logged in"))?;
            let user = client
                .update_profile(&UserProfileInput {
                    email: Some(email),
                    name,
                    phone_number: phone,
                    work_location,
                    rera_number: rera,
                })
                .await?;
            if let Some(session) = client.session() {
                save_session(&Session { user: user.clone(), ..session.clone() })?;
            }
            output_success(output_format, "Profile updated", Some(json!({ "user": user })))
        }
    }
}
