use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An agent. `email` is the join key used by login to find-or-create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub work_location: Option<String>,
    pub rera_number: Option<String>,
    pub avatar: Option<String>,
    pub all_properties: Vec<Uuid>,
    pub all_requirements: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn owns_listings(&self) -> bool {
        !self.all_properties.is_empty() || !self.all_requirements.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone_number: None,
            work_location: None,
            rera_number: None,
            avatar: self.avatar,
            all_properties: vec![],
            all_requirements: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile fields merged by `POST /users/update`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub work_location: Option<String>,
    pub rera_number: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(phone) = &self.phone_number {
            user.phone_number = Some(phone.clone());
        }
        if let Some(location) = &self.work_location {
            user.work_location = Some(location.clone());
        }
        if let Some(rera) = &self.rera_number {
            user.rera_number = Some(rera.clone());
        }
        user.updated_at = now;
    }
}
