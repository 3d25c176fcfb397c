use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ListingRecord;
use crate::filter::SortValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub deal_type: String,
    pub location: String,
    pub price: i64,
    pub total_square_feet: Option<i64>,
    pub phone: String,
    pub photo: Option<String>,
    pub creator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated property ready to insert. `photo` is already a hosted URL.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub deal_type: String,
    pub location: String,
    pub price: i64,
    pub total_square_feet: Option<i64>,
    pub phone: String,
    pub photo: Option<String>,
}

impl NewProperty {
    pub fn into_property(self, creator: Uuid, now: DateTime<Utc>) -> Property {
        Property {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            property_type: self.property_type,
            deal_type: self.deal_type,
            location: self.location,
            price: self.price,
            total_square_feet: self.total_square_feet,
            phone: self.phone,
            photo: self.photo,
            creator,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub deal_type: Option<String>,
    pub location: Option<String>,
    pub price: Option<i64>,
    pub total_square_feet: Option<i64>,
    pub phone: Option<String>,
    pub photo: Option<String>,
}

impl PropertyUpdate {
    pub fn apply(&self, property: &mut Property, now: DateTime<Utc>) {
        if let Some(v) = &self.title {
            property.title = v.clone();
        }
        if let Some(v) = &self.description {
            property.description = v.clone();
        }
        if let Some(v) = &self.property_type {
            property.property_type = v.clone();
        }
        if let Some(v) = &self.deal_type {
            property.deal_type = v.clone();
        }
        if let Some(v) = &self.location {
            property.location = v.clone();
        }
        if let Some(v) = self.price {
            property.price = v;
        }
        if let Some(v) = self.total_square_feet {
            property.total_square_feet = Some(v);
        }
        if let Some(v) = &self.phone {
            property.phone = v.clone();
        }
        if let Some(v) = &self.photo {
            property.photo = Some(v.clone());
        }
        property.updated_at = now;
    }
}

impl ListingRecord for Property {
    fn id(&self) -> Uuid {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn property_type(&self) -> &str {
        &self.property_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "title" => SortValue::Text(self.title.clone()),
            "location" => SortValue::Text(self.location.clone()),
            "propertyType" => SortValue::Text(self.property_type.clone()),
            "dealType" => SortValue::Text(self.deal_type.clone()),
            "price" => SortValue::Int(Some(self.price)),
            "totalSquareFeet" => SortValue::Int(self.total_square_feet),
            "createdAt" => SortValue::Time(self.created_at),
            "updatedAt" => SortValue::Time(self.updated_at),
            _ => SortValue::Id(self.id),
        }
    }
}
