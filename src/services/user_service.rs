use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{authorize, finish, parse_id, FieldErrors, ServiceError};
use crate::database::models::{NewUser, ProfileUpdate, Property, User};
use crate::database::{DatabaseError, Store, StoreTx};
use crate::identity::IdentityGateway;
use crate::types::flexible_string;

/// Body of `POST /users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// Body of `POST /users/update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileInput {
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flexible_string", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub work_location: Option<String>,
    pub rera_number: Option<String>,
}

/// Result of find-or-create.
#[derive(Debug, Clone)]
pub struct UserUpsert {
    pub user: User,
    pub created: bool,
}

/// A user with `allProperties` resolved to the listing documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithProperties {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub work_location: Option<String>,
    pub rera_number: Option<String>,
    pub avatar: Option<String>,
    pub all_properties: Vec<Property>,
    pub all_requirements: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserWithProperties {
    fn new(user: User, all_properties: Vec<Property>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone_number: user.phone_number,
            work_location: user.work_location,
            rera_number: user.rera_number,
            avatar: user.avatar,
            all_properties,
            all_requirements: user.all_requirements,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityGateway>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, identity: Arc<dyn IdentityGateway>) -> Self {
        Self { store, identity }
    }

    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.list_users().await?)
    }

    /// Find by email, or create. A concurrent create of the same email
    /// resolves to the stored record.
    pub async fn upsert(&self, input: UserInput) -> Result<UserUpsert, ServiceError> {
        let mut errors = FieldErrors::default();
        let name = errors.required("name", &input.name);
        let email = errors.required("email", &input.email);
        errors.into_result()?;

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            return Ok(UserUpsert { user, created: false });
        }

        let avatar = input.avatar.filter(|a| !a.trim().is_empty());
        let new_user = NewUser { name, email: email.clone(), avatar }.into_user(Utc::now());
        match self.store.create_user(&new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "Created user");
                Ok(UserUpsert { user, created: true })
            }
            Err(DatabaseError::Conflict(_)) => {
                let user = self
                    .store
                    .find_user_by_email(&email)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
                Ok(UserUpsert { user, created: false })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify a provider credential, then find-or-create its user.
    pub async fn login(&self, credential: &str) -> Result<UserUpsert, ServiceError> {
        let credential = credential.trim();
        if credential.is_empty() {
            let mut errors = FieldErrors::default();
            errors.add("credential", "is required");
            errors.into_result()?;
        }
        let claims = self.identity.verify(credential).await?;
        let name = claims
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| claims.email.split('@').next().unwrap_or_default().to_string());
        self.upsert(UserInput {
            name: Some(name),
            email: Some(claims.email),
            avatar: claims.picture,
        })
        .await
    }

    pub async fn update_profile(&self, input: UserProfileInput, actor: Option<&str>) -> Result<User, ServiceError> {
        let mut errors = FieldErrors::default();
        let email = errors.required("email", &input.email);
        errors.into_result()?;

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
        authorize(actor, Some(&user.email))?;

        let update = ProfileUpdate {
            name: input.name.filter(|n| !n.trim().is_empty()),
            phone_number: input.phone_number,
            work_location: input.work_location,
            rera_number: input.rera_number,
        };
        self.store
            .update_user(user.id, &update, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))
    }

    pub async fn get(&self, id: &str) -> Result<UserWithProperties, ServiceError> {
        let id = parse_id("user", id)?;
        let user = self
            .store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
        let properties = self.store.find_properties(&user.all_properties).await?;
        Ok(UserWithProperties::new(user, properties))
    }

    /// Users that still own listings are kept.
    pub async fn delete(&self, id: &str, actor: Option<&str>) -> Result<(), ServiceError> {
        let id = parse_id("user", id)?;
        let user = self
            .store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
        authorize(actor, Some(&user.email))?;
        if user.owns_listings() {
            return Err(owns_listings_conflict());
        }

        let mut tx = self.store.begin().await?;
        let result = remove_unowned(tx.as_mut(), id).await;
        finish(tx, result).await?;
        info!(user_id = %id, "Deleted user");
        Ok(())
    }
}

fn owns_listings_conflict() -> ServiceError {
    ServiceError::Conflict("User still owns properties or requirements".to_string())
}

async fn remove_unowned(tx: &mut dyn StoreTx, id: Uuid) -> Result<(), ServiceError> {
    let user = tx
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;
    if user.owns_listings() {
        return Err(owns_listings_conflict());
    }
    tx.delete_user(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::identity::DisabledIdentity;
    use crate::services::PropertyService;
    use crate::testing::{property_input, FakeMedia, StaticIdentity};

    fn service(store: &MemoryStore) -> UserService {
        UserService::new(Arc::new(store.clone()), Arc::new(StaticIdentity::new().with_user("tok-asha", "asha@x.com", "Asha")))
    }

    fn input(name: &str, email: &str) -> UserInput {
        UserInput { name: Some(name.into()), email: Some(email.into()), avatar: None }
    }

    #[tokio::test]
    async fn upsert_creates_then_returns_existing() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let first = svc.upsert(input("Asha", "asha@x.com")).await.unwrap();
        assert!(first.created);
        let second = svc.upsert(input("Someone Else", "asha@x.com")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.user.name, "Asha");
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn upsert_requires_name_and_email() {
        let store = MemoryStore::new();
        let err = service(&store)
            .upsert(UserInput { name: None, email: Some("x@x.com".into()), avatar: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn login_verifies_credential() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let logged_in = svc.login("tok-asha").await.unwrap();
        assert_eq!(logged_in.user.email, "asha@x.com");
        assert!(logged_in.created);
        assert!(matches!(svc.login("forged").await, Err(ServiceError::Identity(_))));
        assert!(matches!(svc.login("  ").await, Err(ServiceError::Validation { .. })));

        let disabled = UserService::new(Arc::new(store.clone()), Arc::new(DisabledIdentity));
        assert!(matches!(disabled.login("tok-asha").await, Err(ServiceError::Identity(_))));
    }

    #[tokio::test]
    async fn update_profile_merges_only_given_fields() {
        let store = MemoryStore::new();
        let svc = service(&store);
        svc.upsert(input("Asha", "asha@x.com")).await.unwrap();

        let updated = svc
            .update_profile(
                UserProfileInput {
                    email: Some("asha@x.com".into()),
                    phone_number: Some("98200".into()),
                    rera_number: Some("P5170".into()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Asha");
        assert_eq!(updated.phone_number.as_deref(), Some("98200"));
        assert_eq!(updated.rera_number.as_deref(), Some("P5170"));

        let missing = svc
            .update_profile(UserProfileInput { email: Some("nobody@x.com".into()), ..Default::default() }, None)
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_populates_properties() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let user = svc.upsert(input("Asha", "asha@x.com")).await.unwrap().user;
        let properties = PropertyService::new(
            Arc::new(store.clone()),
            FakeMedia::new(),
            crate::config::AppConfig::development().filter,
        );
        let created = properties.create(property_input("asha@x.com"), None).await.unwrap();

        let shown = svc.get(&user.id.to_string()).await.unwrap();
        assert_eq!(shown.all_properties.len(), 1);
        assert_eq!(shown.all_properties[0].id, created.id);

        assert!(matches!(svc.get("zzz").await, Err(ServiceError::InvalidId(_))));
        assert!(matches!(svc.get(&Uuid::new_v4().to_string()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_is_refused_while_listings_exist() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let user = svc.upsert(input("Asha", "asha@x.com")).await.unwrap().user;
        let properties = PropertyService::new(
            Arc::new(store.clone()),
            FakeMedia::new(),
            crate::config::AppConfig::development().filter,
        );
        let created = properties.create(property_input("asha@x.com"), None).await.unwrap();

        let err = svc.delete(&user.id.to_string(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(store.user_count().await, 1);

        properties.delete(&created.id.to_string(), None).await.unwrap();
        svc.delete(&user.id.to_string(), Some("asha@x.com")).await.unwrap();
        assert_eq!(store.user_count().await, 0);
    }
}
