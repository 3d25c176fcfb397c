use clap::{Args, Subcommand};
use serde_json::json;

use super::property::{session_email, ListArgs};
use crate::cli::config::build_client;
use crate::cli::utils::{output_page, output_success, output_value, requirement_row};
use crate::cli::OutputFormat;
use crate::services::RequirementInput;

#[derive(Args, Clone, Default)]
pub struct RequirementArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "type")]
    pub property_type: Option<String>,
    #[arg(long)]
    pub deal_type: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub asked_price: Option<i64>,
    #[arg(long)]
    pub phone: Option<String>,
}

impl RequirementArgs {
    fn into_input(self, email: Option<String>) -> RequirementInput {
        RequirementInput {
            title: self.title,
            description: self.description,
            property_type: self.property_type,
            deal_type: self.deal_type,
            location: self.location,
            asked_price: self.asked_price,
            phone: self.phone,
            email,
        }
    }
}

#[derive(Subcommand)]
pub enum RequirementCommands {
    #[command(about = "List requirements, one page at a time")]
    List(ListArgs),

    #[command(about = "Show one requirement with its creator")]
    Get { id: String },

    #[command(about = "Post a requirement as the logged-in user")]
    Create(RequirementArgs),

    #[command(about = "Change the given fields of a requirement")]
    Update {
        id: String,
        #[command(flatten)]
        fields: RequirementArgs,
    },

    #[command(about = "Delete a requirement")]
    Delete { id: String },

    #[command(about = "Latest three requirements and the total count")]
    Latest,
}

pub async fn handle(cmd: RequirementCommands, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = build_client(server)?;
    match cmd {
        RequirementCommands::List(args) => {
            let page = client.list_requirements(&args.to_page_request()).await?;
            output_page(output_format, &page, requirement_row)
        }
        RequirementCommands::Get { id } => {
            let requirement = client.get_requirement(&id).await?;
            output_value(output_format, &requirement, |r| {
                serde_json::to_string_pretty(r).unwrap_or_else(|_| r.to_string())
            })
        }
        RequirementCommands::Create(fields) => {
            let requirement = client
                .create_requirement(&fields.into_input(session_email(&client)))
                .await?;
            output_success(
                output_format,
                &format!("Created requirement {}", requirement.id),
                Some(json!({ "requirement": requirement })),
            )
        }
        RequirementCommands::Update { id, fields } => {
            let requirement = client.update_requirement(&id, &fields.into_input(None)).await?;
            output_success(
                output_format,
                &format!("Updated requirement {}", requirement.id),
                Some(json!({ "requirement": requirement })),
            )
        }
        RequirementCommands::Delete { id } => {
            let message = client.delete_requirement(&id).await?;
            output_success(output_format, &message, Some(json!({ "id": id })))
        }
        RequirementCommands::Latest => {
            let summary = client.latest_requirements().await?;
            output_value(output_format, &summary, |s| {
                let mut text = format!("{} requirements\n", s.total_requirements_count);
                for r in &s.requirements {
                    text.push_str(&requirement_row(r));
                    text.push('\n');
                }
                text.trim_end().to_string()
            })
        }
    }
}
