use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::client::Page;
use crate::database::models::{Property, Requirement};

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "message": message });
            if let (Some(Value::Object(extra)), Some(map)) = (data, response.as_object_mut()) {
                map.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// Pretty JSON in either mode, or `text` when asked for text.
pub fn output_value<T: Serialize>(
    output_format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text(value)),
    }
    Ok(())
}

pub fn output_page<T: Serialize>(
    output_format: OutputFormat,
    page: &Page<T>,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let body = json!({
                "items": page.items,
                "total": page.total,
                "page": page.page,
                "page_size": page.page_size,
                "page_count": page.page_count(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            if page.items.is_empty() {
                println!("No results");
            }
            for item in &page.items {
                println!("{}", row(item));
            }
            println!("Page {} of {} ({} total)", page.page, page.page_count().max(1), page.total);
        }
    }
    Ok(())
}

pub fn property_row(p: &Property) -> String {
    format!(
        "{}  {:<32}  {:<10}  {:<24}  ₹{}",
        p.id,
        truncate(&p.title, 32),
        p.property_type,
        truncate(&p.location, 24),
        p.price
    )
}

pub fn requirement_row(r: &Requirement) -> String {
    format!(
        "{}  {:<32}  {:<10}  {:<24}  ₹{}",
        r.id,
        truncate(&r.title, 32),
        r.property_type,
        truncate(&r.location, 24),
        r.asked_price
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// URLs and data URIs pass through; anything else is read as an image file.
pub fn resolve_photo(arg: &str) -> anyhow::Result<String> {
    if arg.starts_with("http://") || arg.starts_with("https://") || arg.starts_with("data:") {
        return Ok(arg.to_string());
    }
    image_to_data_uri(Path::new(arg))
}

pub fn image_to_data_uri(path: &Path) -> anyhow::Result<String> {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        other => anyhow::bail!("unsupported image type {:?} for {}", other, path.display()),
    };
    let bytes = std::fs::read(path).map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}
