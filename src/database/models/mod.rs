pub mod property;
pub mod requirement;
pub mod user;

pub use property::{NewProperty, Property, PropertyUpdate};
pub use requirement::{NewRequirement, Requirement, RequirementUpdate};
pub use user::{NewUser, ProfileUpdate, User};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::filter::SortValue;

/// Read access shared by both listing collections, used by in-process
/// filtering and sorting.
pub trait ListingRecord: Clone + Send + Sync {
    fn id(&self) -> Uuid;
    fn title(&self) -> &str;
    fn location(&self) -> &str;
    fn property_type(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    /// Value for an API sort field already validated by `FilterOrder`.
    fn sort_value(&self, field: &str) -> SortValue;
}
