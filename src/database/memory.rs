use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{ProfileUpdate, Property, PropertyUpdate, Requirement, RequirementUpdate, User};
use crate::database::repository::{Store, StoreTx};
use crate::filter::Filter;
use crate::types::ListingKind;

/// Operations a test can make fail once. All but `HealthCheck` fire inside
/// a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    HealthCheck,
    Insert,
    Delete,
    PushRef,
    PullRef,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    properties: HashMap<Uuid, Property>,
    requirements: HashMap<Uuid, Requirement>,
}

impl Tables {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    faults: HashSet<FailPoint>,
}

/// In-process store used by tests and `BRICKBIX_STORE=memory`.
///
/// A unit of work holds the store lock for its whole lifetime and writes
/// to a private copy of the tables, so it is fully serialized and atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `point` operation inside a unit of work fail.
    pub async fn fail_on(&self, point: FailPoint) {
        self.inner.lock().await.faults.insert(point);
    }

    pub async fn user_count(&self) -> usize {
        self.inner.lock().await.tables.users.len()
    }

    pub async fn property_count(&self) -> usize {
        self.inner.lock().await.tables.properties.len()
    }

    pub async fn requirement_count(&self) -> usize {
        self.inner.lock().await.tables.requirements.len()
    }
}

fn sorted_by_creation<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (DateTime<Utc>, Uuid),
{
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        if self.inner.lock().await.faults.remove(&FailPoint::HealthCheck) {
            return Err(DatabaseError::QueryError(
                "error communicating with database: Connection refused (os error 111)".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let inner = self.inner.lock().await;
        let users = inner.tables.users.values().cloned().collect();
        Ok(sorted_by_creation(users, |u: &User| (u.created_at, u.id)))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.inner.lock().await.tables.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.inner.lock().await.tables.user_by_email(email).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let mut inner = self.inner.lock().await;
        if inner.tables.user_by_email(&user.email).is_some() {
            return Err(DatabaseError::Conflict(format!("email {} already registered", user.email)));
        }
        inner.tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, id: Uuid, update: &ProfileUpdate, now: DateTime<Utc>) -> Result<Option<User>, DatabaseError> {
        let mut inner = self.inner.lock().await;
        let Some(existing) = inner.tables.users.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(existing, now);
        Ok(Some(existing.clone()))
    }

    async fn list_properties(&self, filter: &Filter) -> Result<(Vec<Property>, i64), DatabaseError> {
        let inner = self.inner.lock().await;
        Ok(filter.apply(inner.tables.properties.values().cloned()))
    }

    async fn latest_properties(&self, limit: i64) -> Result<Vec<Property>, DatabaseError> {
        let inner = self.inner.lock().await;
        let mut rows = sorted_by_creation(
            inner.tables.properties.values().cloned().collect(),
            |p: &Property| (p.created_at, p.id),
        );
        rows.reverse();
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn count_properties(&self, property_type: Option<&str>) -> Result<i64, DatabaseError> {
        let inner = self.inner.lock().await;
        let count = inner
            .tables
            .properties
            .values()
            .filter(|p| property_type.map_or(true, |t| p.property_type.eq_ignore_ascii_case(t)))
            .count();
        Ok(count as i64)
    }

    async fn find_property(&self, id: Uuid) -> Result<Option<Property>, DatabaseError> {
        Ok(self.inner.lock().await.tables.properties.get(&id).cloned())
    }

    async fn find_properties(&self, ids: &[Uuid]) -> Result<Vec<Property>, DatabaseError> {
        let inner = self.inner.lock().await;
        let rows = ids
            .iter()
            .filter_map(|id| inner.tables.properties.get(id).cloned())
            .collect();
        Ok(sorted_by_creation(rows, |p: &Property| (p.created_at, p.id)))
    }

    async fn update_property(&self, id: Uuid, update: &PropertyUpdate, now: DateTime<Utc>) -> Result<Option<Property>, DatabaseError> {
        let mut inner = self.inner.lock().await;
        let Some(existing) = inner.tables.properties.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(existing, now);
        Ok(Some(existing.clone()))
    }

    async fn list_requirements(&self, filter: &Filter) -> Result<(Vec<Requirement>, i64), DatabaseError> {
        let inner = self.inner.lock().await;
        Ok(filter.apply(inner.tables.requirements.values().cloned()))
    }

    async fn latest_requirements(&self, limit: i64) -> Result<Vec<Requirement>, DatabaseError> {
        let inner = self.inner.lock().await;
        let mut rows = sorted_by_creation(
            inner.tables.requirements.values().cloned().collect(),
            |r: &Requirement| (r.created_at, r.id),
        );
        rows.reverse();
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn count_requirements(&self) -> Result<i64, DatabaseError> {
        Ok(self.inner.lock().await.tables.requirements.len() as i64)
    }

    async fn find_requirement(&self, id: Uuid) -> Result<Option<Requirement>, DatabaseError> {
        Ok(self.inner.lock().await.tables.requirements.get(&id).cloned())
    }

    async fn find_requirements(&self, ids: &[Uuid]) -> Result<Vec<Requirement>, DatabaseError> {
        let inner = self.inner.lock().await;
        let rows = ids
            .iter()
            .filter_map(|id| inner.tables.requirements.get(id).cloned())
            .collect();
        Ok(sorted_by_creation(rows, |r: &Requirement| (r.created_at, r.id)))
    }

    async fn update_requirement(
        &self,
        id: Uuid,
        update: &RequirementUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Requirement>, DatabaseError> {
        let mut inner = self.inner.lock().await;
        let Some(existing) = inner.tables.requirements.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(existing, now);
        Ok(Some(existing.clone()))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        let guard = self.inner.clone().lock_owned().await;
        let working = guard.tables.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Inner>,
    working: Tables,
}

impl MemoryTx {
    fn check(&mut self, point: FailPoint) -> Result<(), DatabaseError> {
        if self.guard.faults.remove(&point) {
            return Err(DatabaseError::QueryError(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn refs_mut(&mut self, user: Uuid, kind: ListingKind) -> Option<&mut Vec<Uuid>> {
        let user = self.working.users.get_mut(&user)?;
        Some(match kind {
            ListingKind::Property => &mut user.all_properties,
            ListingKind::Requirement => &mut user.all_requirements,
        })
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.working.user_by_email(email).cloned())
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn insert_property(&mut self, property: &Property) -> Result<(), DatabaseError> {
        self.check(FailPoint::Insert)?;
        if self.working.properties.contains_key(&property.id) {
            return Err(DatabaseError::Conflict(format!("property {} exists", property.id)));
        }
        self.working.properties.insert(property.id, property.clone());
        Ok(())
    }

    async fn insert_requirement(&mut self, requirement: &Requirement) -> Result<(), DatabaseError> {
        self.check(FailPoint::Insert)?;
        if self.working.requirements.contains_key(&requirement.id) {
            return Err(DatabaseError::Conflict(format!("requirement {} exists", requirement.id)));
        }
        self.working.requirements.insert(requirement.id, requirement.clone());
        Ok(())
    }

    async fn delete_property(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        self.check(FailPoint::Delete)?;
        Ok(self.working.properties.remove(&id).is_some())
    }

    async fn delete_requirement(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        self.check(FailPoint::Delete)?;
        Ok(self.working.requirements.remove(&id).is_some())
    }

    async fn push_listing_ref(&mut self, user: Uuid, kind: ListingKind, listing: Uuid) -> Result<(), DatabaseError> {
        self.check(FailPoint::PushRef)?;
        if let Some(refs) = self.refs_mut(user, kind) {
            if !refs.contains(&listing) {
                refs.push(listing);
            }
        }
        Ok(())
    }

    async fn pull_listing_ref(&mut self, user: Uuid, kind: ListingKind, listing: Uuid) -> Result<(), DatabaseError> {
        self.check(FailPoint::PullRef)?;
        if let Some(refs) = self.refs_mut(user, kind) {
            refs.retain(|id| *id != listing);
        }
        Ok(())
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        self.check(FailPoint::Delete)?;
        Ok(self.working.users.remove(&id).is_some())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DatabaseError> {
        self.check(FailPoint::Commit)?;
        let MemoryTx { mut guard, working } = *self;
        guard.tables = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewProperty, NewUser};

    fn user(email: &str) -> User {
        NewUser { name: "Agent".into(), email: email.into(), avatar: None }.into_user(Utc::now())
    }

    #[tokio::test]
    async fn commit_publishes_working_copy() {
        let store = MemoryStore::new();
        let owner = store.create_user(&user("a@x.com")).await.unwrap();
        let listing = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.push_listing_ref(owner.id, ListingKind::Property, listing).await.unwrap();
        tx.push_listing_ref(owner.id, ListingKind::Property, listing).await.unwrap();
        tx.commit().await.unwrap();

        let owner = store.find_user(owner.id).await.unwrap().unwrap();
        assert_eq!(owner.all_properties, vec![listing]);
    }

    #[tokio::test]
    async fn dropped_unit_of_work_leaves_no_trace() {
        let store = MemoryStore::new();
        let owner = store.create_user(&user("a@x.com")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.push_listing_ref(owner.id, ListingKind::Requirement, Uuid::new_v4()).await.unwrap();
        tx.delete_user(owner.id).await.unwrap();
        drop(tx);

        let owner = store.find_user(owner.id).await.unwrap().unwrap();
        assert!(owner.all_requirements.is_empty());
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let store = MemoryStore::new();
        let owner = store.create_user(&user("a@x.com")).await.unwrap();
        store.fail_on(FailPoint::PushRef).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.push_listing_ref(owner.id, ListingKind::Property, Uuid::new_v4()).await.is_err());
        assert!(tx.push_listing_ref(owner.id, ListingKind::Property, Uuid::new_v4()).await.is_ok());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(&user("a@x.com")).await.unwrap();
        assert!(matches!(
            store.create_user(&user("a@x.com")).await,
            Err(DatabaseError::Conflict(_))
        ));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn partial_updates_merge_into_the_stored_row() {
        let store = MemoryStore::new();
        let owner = store.create_user(&user("a@x.com")).await.unwrap();
        let property = NewProperty {
            title: "2BHK".into(),
            description: "Near metro".into(),
            property_type: "apartment".into(),
            deal_type: "Direct".into(),
            location: "Pune".into(),
            price: 100,
            total_square_feet: None,
            phone: "9800000000".into(),
            photo: None,
        }
        .into_property(owner.id, Utc::now());
        let mut tx = store.begin().await.unwrap();
        tx.insert_property(&property).await.unwrap();
        tx.commit().await.unwrap();

        let price = PropertyUpdate { price: Some(1), ..Default::default() };
        let photo = PropertyUpdate { photo: Some("https://cdn.example.com/a.jpg".into()), ..Default::default() };
        store.update_property(property.id, &price, Utc::now()).await.unwrap();
        let merged = store.update_property(property.id, &photo, Utc::now()).await.unwrap().unwrap();

        assert_eq!(merged.price, 1);
        assert_eq!(merged.photo.as_deref(), Some("https://cdn.example.com/a.jpg"));
        assert_eq!(merged.title, "2BHK");
        assert_eq!(merged.creator, owner.id);
        assert!(store.update_property(Uuid::new_v4(), &price, Utc::now()).await.unwrap().is_none());
    }
}
