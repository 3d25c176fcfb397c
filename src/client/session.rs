use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::User;

/// A logged-in caller: the bearer credential plus the user it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
            started_at: Utc::now(),
        }
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }
}
