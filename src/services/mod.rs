pub mod property_service;
pub mod requirement_service;
pub mod user_service;

pub use property_service::{PropertyInput, PropertyService, PropertySummary};
pub use requirement_service::{RequirementInput, RequirementService, RequirementSummary};
pub use user_service::{UserInput, UserProfileInput, UserService, UserUpsert, UserWithProperties};

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::database::models::User;
use crate::database::{DatabaseError, StoreTx};
use crate::filter::FilterError;
use crate::identity::IdentityError;
use crate::media::MediaError;
use crate::types::{DealType, PropertyType};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid {0} ID format")]
    InvalidId(String),

    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn validation(field_errors: HashMap<String, String>) -> Self {
        let mut fields: Vec<&str> = field_errors.keys().map(String::as_str).collect();
        fields.sort_unstable();
        ServiceError::Validation {
            message: format!("Invalid or missing fields: {}", fields.join(", ")),
            field_errors,
        }
    }
}

/// Parse a path id, reporting the entity label on failure.
pub fn parse_id(label: &str, raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::InvalidId(label.to_string()))
}

/// When a caller identity is present it must match the owner email.
pub fn authorize(actor: Option<&str>, owner_email: Option<&str>) -> Result<(), ServiceError> {
    match (actor, owner_email) {
        (None, _) => Ok(()),
        (Some(actor), Some(owner)) if actor.eq_ignore_ascii_case(owner) => Ok(()),
        (Some(_), _) => Err(ServiceError::Forbidden(
            "You do not have permission to modify this resource".to_string(),
        )),
    }
}

/// Replace `creator` on a serialized listing with the full user, or null.
pub fn with_creator<T: Serialize>(listing: &T, creator: Option<User>) -> Result<Value, ServiceError> {
    let mut value = serde_json::to_value(listing)?;
    if let Value::Object(map) = &mut value {
        map.insert("creator".to_string(), serde_json::to_value(creator)?);
    }
    Ok(value)
}

fn aborted(err: DatabaseError) -> ServiceError {
    error!("Transaction aborted: {}", err);
    ServiceError::TransactionAborted(err.to_string())
}

/// Commit on success, roll back on failure. Store errors raised inside the
/// unit of work surface as `TransactionAborted`.
pub(crate) async fn finish<T>(
    tx: Box<dyn StoreTx>,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(aborted)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            Err(match err {
                ServiceError::Database(db) => aborted(db),
                other => other,
            })
        }
    }
}

/// Collects per-field validation failures.
#[derive(Debug, Default)]
pub(crate) struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    /// Trimmed required string, recording an error when blank or absent.
    pub fn required(&mut self, field: &str, value: &Option<String>) -> String {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                self.add(field, "is required");
                String::new()
            }
        }
    }

    pub fn required_number(&mut self, field: &str, value: Option<i64>) -> i64 {
        match value {
            Some(v) if v >= 0 => v,
            Some(_) => {
                self.add(field, "must not be negative");
                0
            }
            None => {
                self.add(field, "is required");
                0
            }
        }
    }

    /// Canonical lowercase property type, recording an error when unknown.
    pub fn property_type(&mut self, raw: &str) -> String {
        match raw.parse::<PropertyType>() {
            Ok(kind) => kind.as_str().to_string(),
            Err(_) => {
                let allowed: Vec<&str> = PropertyType::ALL.iter().map(|t| t.as_str()).collect();
                self.add("propertyType", format!("must be one of: {}", allowed.join(", ")));
                raw.to_string()
            }
        }
    }

    pub fn deal_type(&mut self, raw: &str) -> String {
        match raw.parse::<DealType>() {
            Ok(kind) => kind.as_str().to_string(),
            Err(_) => {
                self.add("dealType", "must be one of: Direct, Indirect");
                raw.to_string()
            }
        }
    }

    /// Optional string that must not be blank when present.
    pub fn optional(&mut self, field: &str, value: &Option<String>) -> Option<String> {
        let value = value.as_deref()?.trim();
        if value.is_empty() {
            self.add(field, "must not be empty");
            return None;
        }
        Some(value.to_string())
    }

    pub fn optional_number(&mut self, field: &str, value: Option<i64>) -> Option<i64> {
        match value {
            Some(v) if v < 0 => {
                self.add(field, "must not be negative");
                None
            }
            other => other,
        }
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::validation(self.0))
        }
    }
}
