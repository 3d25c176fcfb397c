use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{authorize, finish, parse_id, with_creator, FieldErrors, ServiceError};
use crate::config::FilterConfig;
use crate::database::models::{NewRequirement, Requirement, RequirementUpdate};
use crate::database::{Store, StoreTx};
use crate::filter::{Filter, ListParams, REQUIREMENT_SCHEMA};
use crate::types::{flexible_i64, flexible_string, ListingKind};

const LATEST_REQUIREMENTS: i64 = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub deal_type: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "flexible_i64", skip_serializing_if = "Option::is_none")]
    pub asked_price: Option<i64>,
    #[serde(default, deserialize_with = "flexible_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl RequirementInput {
    fn validate_new(&self) -> Result<(NewRequirement, String), ServiceError> {
        let mut errors = FieldErrors::default();
        let title = errors.required("title", &self.title);
        let description = errors.required("description", &self.description);
        let mut property_type = errors.required("propertyType", &self.property_type);
        if !property_type.is_empty() {
            property_type = errors.property_type(&property_type);
        }
        let mut deal_type = errors.required("dealType", &self.deal_type);
        if !deal_type.is_empty() {
            deal_type = errors.deal_type(&deal_type);
        }
        let location = errors.required("location", &self.location);
        let asked_price = errors.required_number("askedPrice", self.asked_price);
        let phone = errors.required("phone", &self.phone);
        let email = errors.required("email", &self.email);
        errors.into_result()?;

        Ok((
            NewRequirement {
                title,
                description,
                property_type,
                deal_type,
                location,
                asked_price,
                phone,
            },
            email,
        ))
    }

    fn validate_update(&self) -> Result<RequirementUpdate, ServiceError> {
        let mut errors = FieldErrors::default();
        let update = RequirementUpdate {
            title: errors.optional("title", &self.title),
            description: errors.optional("description", &self.description),
            property_type: errors
                .optional("propertyType", &self.property_type)
                .map(|t| errors.property_type(&t)),
            deal_type: errors
                .optional("dealType", &self.deal_type)
                .map(|d| errors.deal_type(&d)),
            location: errors.optional("location", &self.location),
            asked_price: errors.optional_number("askedPrice", self.asked_price),
            phone: errors.optional("phone", &self.phone),
        };
        errors.into_result()?;
        Ok(update)
    }
}

/// Dashboard payload for `GET /requirement/five`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSummary {
    pub requirements: Vec<Requirement>,
    pub total_requirements_count: i64,
}

#[derive(Clone)]
pub struct RequirementService {
    store: Arc<dyn Store>,
    filter: FilterConfig,
}

impl RequirementService {
    pub fn new(store: Arc<dyn Store>, filter: FilterConfig) -> Self {
        Self { store, filter }
    }

    pub async fn list(&self, params: &ListParams) -> Result<(Vec<Requirement>, i64), ServiceError> {
        let filter = Filter::from_params(&REQUIREMENT_SCHEMA, params, &self.filter)?;
        Ok(self.store.list_requirements(&filter).await?)
    }

    pub async fn latest(&self) -> Result<RequirementSummary, ServiceError> {
        let (requirements, total) = futures::try_join!(
            self.store.latest_requirements(LATEST_REQUIREMENTS),
            self.store.count_requirements(),
        )?;
        Ok(RequirementSummary {
            requirements,
            total_requirements_count: total,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Value, ServiceError> {
        let requirement = self.find(id).await?;
        let creator = self.store.find_user(requirement.creator).await?;
        with_creator(&requirement, creator)
    }

    async fn find(&self, id: &str) -> Result<Requirement, ServiceError> {
        let id = parse_id("requirement", id)?;
        self.store
            .find_requirement(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Requirement".to_string()))
    }

    pub async fn create(&self, input: RequirementInput, actor: Option<&str>) -> Result<Requirement, ServiceError> {
        let (draft, email) = input.validate_new()?;
        authorize(actor, Some(&email))?;

        let mut tx = self.store.begin().await?;
        let result = insert_owned(tx.as_mut(), &email, draft, Utc::now()).await;
        let requirement = finish(tx, result).await?;
        info!(requirement_id = %requirement.id, owner = %requirement.creator, "Created requirement");
        Ok(requirement)
    }

    pub async fn update(&self, id: &str, input: RequirementInput, actor: Option<&str>) -> Result<Requirement, ServiceError> {
        let requirement = self.find(id).await?;
        let update = input.validate_update()?;
        let owner = self.store.find_user(requirement.creator).await?;
        authorize(actor, owner.as_ref().map(|u| u.email.as_str()))?;

        self.store
            .update_requirement(requirement.id, &update, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Requirement".to_string()))
    }

    pub async fn delete(&self, id: &str, actor: Option<&str>) -> Result<(), ServiceError> {
        let requirement = self.find(id).await?;
        let owner = self.store.find_user(requirement.creator).await?;
        authorize(actor, owner.as_ref().map(|u| u.email.as_str()))?;

        let mut tx = self.store.begin().await?;
        let result = remove_owned(tx.as_mut(), &requirement).await;
        finish(tx, result).await?;
        info!(requirement_id = %requirement.id, "Deleted requirement");
        Ok(())
    }
}

async fn insert_owned(
    tx: &mut dyn StoreTx,
    email: &str,
    draft: NewRequirement,
    now: DateTime<Utc>,
) -> Result<Requirement, ServiceError> {
    let owner = tx
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
    let requirement = draft.into_requirement(owner.id, now);
    tx.insert_requirement(&requirement).await?;
    tx.push_listing_ref(owner.id, ListingKind::Requirement, requirement.id).await?;
    Ok(requirement)
}

async fn remove_owned(tx: &mut dyn StoreTx, requirement: &Requirement) -> Result<(), ServiceError> {
    if !tx.delete_requirement(requirement.id).await? {
        return Err(ServiceError::NotFound("Requirement".to_string()));
    }
    match tx.find_user(requirement.creator).await? {
        Some(owner) => {
            tx.pull_listing_ref(owner.id, ListingKind::Requirement, requirement.id)
                .await?
        }
        None => warn!(
            requirement_id = %requirement.id,
            creator = %requirement.creator,
            "Deleting requirement whose creator no longer exists"
        ),
    }
    Ok(())
}
