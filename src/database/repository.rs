use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{ProfileUpdate, Property, PropertyUpdate, Requirement, RequirementUpdate, User};
use crate::filter::Filter;
use crate::types::ListingKind;

/// Non-transactional reads and single-document writes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError>;
    /// Merges the given profile fields into the stored row in one write.
    /// `None` when no user has that id.
    async fn update_user(&self, id: Uuid, update: &ProfileUpdate, now: DateTime<Utc>) -> Result<Option<User>, DatabaseError>;

    async fn list_properties(&self, filter: &Filter) -> Result<(Vec<Property>, i64), DatabaseError>;
    /// Newest first.
    async fn latest_properties(&self, limit: i64) -> Result<Vec<Property>, DatabaseError>;
    async fn count_properties(&self, property_type: Option<&str>) -> Result<i64, DatabaseError>;
    async fn find_property(&self, id: Uuid) -> Result<Option<Property>, DatabaseError>;
    async fn find_properties(&self, ids: &[Uuid]) -> Result<Vec<Property>, DatabaseError>;
    /// Field-merge against the stored row; fields left `None` keep their current value.
    async fn update_property(&self, id: Uuid, update: &PropertyUpdate, now: DateTime<Utc>) -> Result<Option<Property>, DatabaseError>;

    async fn list_requirements(&self, filter: &Filter) -> Result<(Vec<Requirement>, i64), DatabaseError>;
    async fn latest_requirements(&self, limit: i64) -> Result<Vec<Requirement>, DatabaseError>;
    async fn count_requirements(&self) -> Result<i64, DatabaseError>;
    async fn find_requirement(&self, id: Uuid) -> Result<Option<Requirement>, DatabaseError>;
    async fn find_requirements(&self, ids: &[Uuid]) -> Result<Vec<Requirement>, DatabaseError>;
    async fn update_requirement(
        &self,
        id: Uuid,
        update: &RequirementUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Requirement>, DatabaseError>;

    /// Start a unit of work. Nothing written through it is visible until `commit`.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError>;
}

/// Multi-document unit of work. Dropping without `commit` discards all writes.
#[async_trait]
pub trait StoreTx: Send {
    /// Loads and locks the owner row until the unit of work ends.
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn insert_property(&mut self, property: &Property) -> Result<(), DatabaseError>;
    async fn insert_requirement(&mut self, requirement: &Requirement) -> Result<(), DatabaseError>;
    /// Returns false when the listing did not exist.
    async fn delete_property(&mut self, id: Uuid) -> Result<bool, DatabaseError>;
    async fn delete_requirement(&mut self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Add a listing id to the owner's reference array; a no-op if already present.
    async fn push_listing_ref(&mut self, user: Uuid, kind: ListingKind, listing: Uuid) -> Result<(), DatabaseError>;
    async fn pull_listing_ref(&mut self, user: Uuid, kind: ListingKind, listing: Uuid) -> Result<(), DatabaseError>;

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
