use clap::{Args, Subcommand};
use serde_json::json;

use crate::cli::config::build_client;
use crate::cli::utils::{output_page, output_success, output_value, property_row, resolve_photo};
use crate::cli::OutputFormat;
use crate::client::{ApiClient, PageRequest};
use crate::services::PropertyInput;

#[derive(Args, Clone, Default)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1, help = "Page number, starting at 1")]
    pub page: u32,
    #[arg(long, default_value_t = 10, help = "Rows per page")]
    pub page_size: u32,
    #[arg(long, help = "Sort field, e.g. price or createdAt")]
    pub sort: Option<String>,
    #[arg(long, help = "asc or desc")]
    pub order: Option<String>,
    #[arg(long, help = "Substring matched against title and location")]
    pub search: Option<String>,
    #[arg(long = "type", help = "Property type, e.g. apartment")]
    pub property_type: Option<String>,
}

impl ListArgs {
    pub fn to_page_request(&self) -> PageRequest {
        PageRequest {
            sort: self.sort.clone(),
            order: self.order.clone(),
            search: self.search.clone(),
            property_type: self.property_type.clone(),
            ..PageRequest::new(self.page, self.page_size)
        }
    }
}

#[derive(Args, Clone, Default)]
pub struct PropertyArgs {
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
    pub price: Option<i64>,
    #[arg(long)]
    pub sqft: Option<i64>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long, help = "Image URL or path to a local image file")]
    pub photo: Option<String>,
}

impl PropertyArgs {
    fn into_input(self, email: Option<String>) -> anyhow::Result<PropertyInput> {
        let photo = self.photo.as_deref().map(resolve_photo).transpose()?;
        Ok(PropertyInput {
            title: self.title,
            description: self.description,
            property_type: self.property_type,
            deal_type: self.deal_type,
            location: self.location,
            price: self.price,
            total_square_feet: self.sqft,
            phone: self.phone,
            photo,
            email,
        })
    }
}

#[derive(Subcommand)]
pub enum PropertyCommands {
    #[command(about = "List properties, one page at a time")]
    List(ListArgs),

    #[command(about = "Show one property with its creator")]
    Get { id: String },

    #[command(about = "Create a property owned by the logged-in user")]
    Create(PropertyArgs),

    #[command(about = "Change the given fields of a property")]
    Update {
        id: String,
        #[command(flatten)]
        fields: PropertyArgs,
    },

    #[command(about = "Delete a property and its photo")]
    Delete { id: String },

    #[command(about = "Latest five properties and dashboard counts")]
    Latest,
}

pub async fn handle(cmd: PropertyCommands, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = build_client(server)?;
    match cmd {
        PropertyCommands::List(args) => {
            let page = client.list_properties(&args.to_page_request()).await?;
            output_page(output_format, &page, property_row)
        }
        PropertyCommands::Get { id } => {
            let property = client.get_property(&id).await?;
            output_value(output_format, &property, |p| {
                serde_json::to_string_pretty(p).unwrap_or_else(|_| p.to_string())
            })
        }
        PropertyCommands::Create(fields) => {
            let input = fields.into_input(session_email(&client))?;
            let property = client.create_property(&input).await?;
            output_success(
                output_format,
                &format!("Created property {}", property.id),
                Some(json!({ "property": property })),
            )
        }
        PropertyCommands::Update { id, fields } => {
            let property = client.update_property(&id, &fields.into_input(None)?).await?;
            output_success(
                output_format,
                &format!("Updated property {}", property.id),
                Some(json!({ "property": property })),
            )
        }
        PropertyCommands::Delete { id } => {
            let message = client.delete_property(&id).await?;
            output_success(output_format, &message, Some(json!({ "id": id })))
        }
        PropertyCommands::Latest => {
            let summary = client.latest_properties().await?;
            output_value(output_format, &summary, |s| {
                let mut text = format!(
                    "{} properties ({} commercial, {} apartment)\n",
                    s.total_properties_count, s.commercial_properties_count, s.apartment_properties_count
                );
                for p in &s.properties {
                    text.push_str(&property_row(p));
                    text.push('\n');
                }
                text.trim_end().to_string()
            })
        }
    }
}

pub(crate) fn session_email(client: &ApiClient) -> Option<String> {
    client.session().map(|s| s.email().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_args_become_page_request() {
        let args = ListArgs {
            page: 2,
            page_size: 5,
            property_type: Some("commercial".into()),
            ..Default::default()
        };
        let params = args.to_page_request().to_params().unwrap();
        assert_eq!(params.start.as_deref(), Some("5"));
        assert_eq!(params.end.as_deref(), Some("10"));
        assert_eq!(params.property_type.as_deref(), Some("commercial"));
    }

    #[test]
    fn update_args_leave_owner_unset() {
        let args = PropertyArgs { price: Some(100), ..Default::default() };
        let input = args.into_input(None).unwrap();
        assert_eq!(input.price, Some(100));
        assert!(input.email.is_none());
        assert!(input.title.is_none());
    }
}
