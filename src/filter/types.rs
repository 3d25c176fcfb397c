use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Raw list query parameters as sent by the admin client's REST data provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(rename = "_start", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(rename = "_end", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(rename = "_sort", skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(rename = "_order", skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_like: Option<String>,
    #[serde(rename = "propertyType", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
}

/// Table name plus the API sort fields it accepts, mapped to columns.
#[derive(Debug)]
pub struct ListingSchema {
    pub table: &'static str,
    pub sort_fields: &'static [(&'static str, &'static str)],
}

impl ListingSchema {
    pub fn column_for(&self, field: &str) -> Option<&'static str> {
        self.sort_fields
            .iter()
            .find(|(api, _)| *api == field)
            .map(|(_, column)| *column)
    }
}

pub static PROPERTY_SCHEMA: ListingSchema = ListingSchema {
    table: "properties",
    sort_fields: &[
        ("_id", "id"),
        ("id", "id"),
        ("title", "title"),
        ("location", "location"),
        ("propertyType", "property_type"),
        ("dealType", "deal_type"),
        ("price", "price"),
        ("totalSquareFeet", "total_square_feet"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
};

pub static REQUIREMENT_SCHEMA: ListingSchema = ListingSchema {
    table: "requirements",
    sort_fields: &[
        ("_id", "id"),
        ("id", "id"),
        ("title", "title"),
        ("location", "location"),
        ("propertyType", "property_type"),
        ("dealType", "deal_type"),
        ("askedPrice", "asked_price"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    /// API field name, e.g. `price`.
    pub field: String,
    /// Column it maps to, e.g. `price`.
    pub column: &'static str,
    pub sort: SortDirection,
}

/// Sortable value extracted from a record for in-process ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Text(String),
    Int(Option<i64>),
    Time(DateTime<Utc>),
    Id(Uuid),
}

impl SortValue {
    /// Ascending comparison. Missing numbers sort last, as NULLs do in Postgres.
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Int(a), SortValue::Int(b)) => match (a, b) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            (SortValue::Id(a), SortValue::Id(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
