use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ListingRecord;
use crate::filter::SortValue;

/// A buyer's want-ad. Parallel to `Property` with `askedPrice` and no photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub deal_type: String,
    pub location: String,
    pub asked_price: i64,
    pub phone: String,
    pub creator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRequirement {
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub deal_type: String,
    pub location: String,
    pub asked_price: i64,
    pub phone: String,
}

impl NewRequirement {
    pub fn into_requirement(self, creator: Uuid, now: DateTime<Utc>) -> Requirement {
        Requirement {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            property_type: self.property_type,
            deal_type: self.deal_type,
            location: self.location,
            asked_price: self.asked_price,
            phone: self.phone,
            creator,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequirementUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub deal_type: Option<String>,
    pub location: Option<String>,
    pub asked_price: Option<i64>,
    pub phone: Option<String>,
}

impl RequirementUpdate {
    pub fn apply(&self, requirement: &mut Requirement, now: DateTime<Utc>) {
        if let Some(v) = &self.title {
            requirement.title = v.clone();
        }
        if let Some(v) = &self.description {
            requirement.description = v.clone();
        }
        if let Some(v) = &self.property_type {
            requirement.property_type = v.clone();
        }
        if let Some(v) = &self.deal_type {
            requirement.deal_type = v.clone();
        }
        if let Some(v) = &self.location {
            requirement.location = v.clone();
        }
        if let Some(v) = self.asked_price {
            requirement.asked_price = v;
        }
        if let Some(v) = &self.phone {
            requirement.phone = v.clone();
        }
        requirement.updated_at = now;
    }
}

impl ListingRecord for Requirement {
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
            "askedPrice" => SortValue::Int(Some(self.asked_price)),
            "createdAt" => SortValue::Time(self.created_at),
            "updatedAt" => SortValue::Time(self.updated_at),
            _ => SortValue::Id(self.id),
        }
    }
}
