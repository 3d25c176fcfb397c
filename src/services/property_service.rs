use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{authorize, finish, parse_id, with_creator, FieldErrors, ServiceError};
use crate::config::FilterConfig;
use crate::database::models::{NewProperty, Property, PropertyUpdate};
use crate::database::{Store, StoreTx};
use crate::filter::{Filter, ListParams, PROPERTY_SCHEMA};
use crate::media::{is_hosted_url, public_id_from_url, MediaGateway};
use crate::types::{flexible_i64, flexible_string, ListingKind, PropertyType};

const LATEST_PROPERTIES: i64 = 5;

/// Request body for create and update. Every field is optional here;
/// create enforces the required set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub deal_type: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "flexible_i64", skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "flexible_i64", skip_serializing_if = "Option::is_none")]
    pub total_square_feet: Option<i64>,
    #[serde(default, deserialize_with = "flexible_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub photo: Option<String>,
    /// Owner email, used on create only.
    pub email: Option<String>,
}

impl PropertyInput {
    fn photo(&self) -> Option<String> {
        self.photo
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    fn validate_new(&self) -> Result<(NewProperty, String), ServiceError> {
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
        let price = errors.required_number("price", self.price);
        let total_square_feet = errors.optional_number("totalSquareFeet", self.total_square_feet);
        let phone = errors.required("phone", &self.phone);
        let email = errors.required("email", &self.email);
        errors.into_result()?;

        Ok((
            NewProperty {
                title,
                description,
                property_type,
                deal_type,
                location,
                price,
                total_square_feet,
                phone,
                photo: self.photo(),
            },
            email,
        ))
    }

    fn validate_update(&self) -> Result<PropertyUpdate, ServiceError> {
        let mut errors = FieldErrors::default();
        let update = PropertyUpdate {
            title: errors.optional("title", &self.title),
            description: errors.optional("description", &self.description),
            property_type: errors
                .optional("propertyType", &self.property_type)
                .map(|t| errors.property_type(&t)),
            deal_type: errors
                .optional("dealType", &self.deal_type)
                .map(|d| errors.deal_type(&d)),
            location: errors.optional("location", &self.location),
            price: errors.optional_number("price", self.price),
            total_square_feet: errors.optional_number("totalSquareFeet", self.total_square_feet),
            phone: errors.optional("phone", &self.phone),
            photo: self.photo(),
        };
        errors.into_result()?;
        Ok(update)
    }
}

/// Dashboard payload for `GET /properties/five`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub properties: Vec<Property>,
    pub total_properties_count: i64,
    pub commercial_properties_count: i64,
    pub apartment_properties_count: i64,
}

#[derive(Clone)]
pub struct PropertyService {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaGateway>,
    filter: FilterConfig,
}

impl PropertyService {
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaGateway>, filter: FilterConfig) -> Self {
        Self { store, media, filter }
    }

    pub async fn list(&self, params: &ListParams) -> Result<(Vec<Property>, i64), ServiceError> {
        let filter = Filter::from_params(&PROPERTY_SCHEMA, params, &self.filter)?;
        Ok(self.store.list_properties(&filter).await?)
    }

    pub async fn latest(&self) -> Result<PropertySummary, ServiceError> {
        let (properties, total, commercial, apartment) = futures::try_join!(
            self.store.latest_properties(LATEST_PROPERTIES),
            self.store.count_properties(None),
            self.store.count_properties(Some(PropertyType::Commercial.as_str())),
            self.store.count_properties(Some(PropertyType::Apartment.as_str())),
        )?;
        Ok(PropertySummary {
            properties,
            total_properties_count: total,
            commercial_properties_count: commercial,
            apartment_properties_count: apartment,
        })
    }

    /// The property with `creator` replaced by the owning user.
    pub async fn get(&self, id: &str) -> Result<Value, ServiceError> {
        let property = self.find(id).await?;
        let creator = self.store.find_user(property.creator).await?;
        with_creator(&property, creator)
    }

    async fn find(&self, id: &str) -> Result<Property, ServiceError> {
        let id = parse_id("property", id)?;
        self.store
            .find_property(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Property".to_string()))
    }

    /// Upload first, then insert the listing and link it to its owner in one
    /// unit of work.
    pub async fn create(&self, input: PropertyInput, actor: Option<&str>) -> Result<Property, ServiceError> {
        let (mut draft, email) = input.validate_new()?;
        authorize(actor, Some(&email))?;

        let mut uploaded_id = None;
        if let Some(photo) = draft.photo.take() {
            let (url, public_id) = self.host_photo(&photo).await?;
            draft.photo = Some(url);
            uploaded_id = public_id;
        }

        let tx = self.store.begin().await?;
        let result = finish_insert(tx, &email, draft, Utc::now()).await;

        match &result {
            Ok(property) => info!(property_id = %property.id, owner = %property.creator, "Created property"),
            Err(_) => {
                if let Some(public_id) = uploaded_id {
                    self.release_public_id(&public_id).await;
                }
            }
        }
        result
    }

    /// Merge the given fields into the stored listing. A new inline photo is
    /// uploaded before the write and released again if the write fails.
    pub async fn update(&self, id: &str, input: PropertyInput, actor: Option<&str>) -> Result<Property, ServiceError> {
        let property = self.find(id).await?;
        let mut update = input.validate_update()?;
        let owner = self.store.find_user(property.creator).await?;
        authorize(actor, owner.as_ref().map(|u| u.email.as_str()))?;

        let mut uploaded_id = None;
        if let Some(photo) = update.photo.take() {
            let (url, public_id) = self.host_photo(&photo).await?;
            update.photo = Some(url);
            uploaded_id = public_id;
        }

        let result = match self.store.update_property(property.id, &update, Utc::now()).await {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => Err(ServiceError::NotFound("Property".to_string())),
            Err(e) => Err(e.into()),
        };
        if result.is_err() {
            if let Some(public_id) = uploaded_id {
                self.release_public_id(&public_id).await;
            }
        }
        result
    }

    /// Best-effort photo cleanup, then delete the listing and unlink it from
    /// its owner in one unit of work.
    pub async fn delete(&self, id: &str, actor: Option<&str>) -> Result<(), ServiceError> {
        let property = self.find(id).await?;
        let owner = self.store.find_user(property.creator).await?;
        authorize(actor, owner.as_ref().map(|u| u.email.as_str()))?;

        if let Some(photo) = property.photo.as_deref() {
            self.release_photo(photo).await;
        }

        let mut tx = self.store.begin().await?;
        let result = remove_owned(tx.as_mut(), &property).await;
        finish(tx, result).await?;
        info!(property_id = %property.id, "Deleted property");
        Ok(())
    }

    /// Hosted URL for a photo value, plus the public id when it was uploaded now.
    async fn host_photo(&self, photo: &str) -> Result<(String, Option<String>), ServiceError> {
        if is_hosted_url(photo) {
            return Ok((photo.to_string(), None));
        }
        let uploaded = self.media.upload(photo).await?;
        Ok((uploaded.url, Some(uploaded.public_id)))
    }

    async fn release_photo(&self, photo: &str) {
        match public_id_from_url(photo) {
            Some(public_id) => self.release_public_id(&public_id).await,
            None => warn!("Photo '{}' has no media id, skipping cleanup", photo),
        }
    }

    async fn release_public_id(&self, public_id: &str) {
        if !self.media.is_configured() {
            warn!("Media gateway not configured, leaving {} in place", public_id);
            return;
        }
        if let Err(e) = self.media.destroy(public_id).await {
            warn!("Failed to delete image {}: {}", public_id, e);
        }
    }
}

async fn finish_insert(
    mut tx: Box<dyn StoreTx>,
    email: &str,
    draft: NewProperty,
    now: DateTime<Utc>,
) -> Result<Property, ServiceError> {
    let result = insert_owned(tx.as_mut(), email, draft, now).await;
    finish(tx, result).await
}

async fn insert_owned(
    tx: &mut dyn StoreTx,
    email: &str,
    draft: NewProperty,
    now: DateTime<Utc>,
) -> Result<Property, ServiceError> {
    let owner = tx
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
    let property = draft.into_property(owner.id, now);
    tx.insert_property(&property).await?;
    tx.push_listing_ref(owner.id, ListingKind::Property, property.id).await?;
    Ok(property)
}

async fn remove_owned(tx: &mut dyn StoreTx, property: &Property) -> Result<(), ServiceError> {
    if !tx.delete_property(property.id).await? {
        return Err(ServiceError::NotFound("Property".to_string()));
    }
    match tx.find_user(property.creator).await? {
        Some(owner) => {
            tx.pull_listing_ref(owner.id, ListingKind::Property, property.id)
                .await?
        }
        None => warn!(
            property_id = %property.id,
            creator = %property.creator,
            "Deleting property whose creator no longer exists"
        ),
    }
    Ok(())
}
