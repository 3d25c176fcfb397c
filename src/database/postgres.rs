use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{ProfileUpdate, Property, PropertyUpdate, Requirement, RequirementUpdate, User};
use crate::database::query_builder::QueryBuilder;
use crate::database::repository::{Store, StoreTx};
use crate::filter::Filter;
use crate::types::ListingKind;

// Field-merge updates. A NULL parameter keeps the stored value.
const USER_PROFILE_UPDATE: &str = r#"UPDATE "users"
    SET "name" = COALESCE($2, "name"),
        "phone_number" = COALESCE($3, "phone_number"),
        "work_location" = COALESCE($4, "work_location"),
        "rera_number" = COALESCE($5, "rera_number"),
        "updated_at" = $6
    WHERE "id" = $1 RETURNING *"#;

const PROPERTY_UPDATE: &str = r#"UPDATE "properties"
    SET "title" = COALESCE($2, "title"),
        "description" = COALESCE($3, "description"),
        "property_type" = COALESCE($4, "property_type"),
        "deal_type" = COALESCE($5, "deal_type"),
        "location" = COALESCE($6, "location"),
        "price" = COALESCE($7, "price"),
        "total_square_feet" = COALESCE($8, "total_square_feet"),
        "phone" = COALESCE($9, "phone"),
        "photo" = COALESCE($10, "photo"),
        "updated_at" = $11
    WHERE "id" = $1 RETURNING *"#;

const REQUIREMENT_UPDATE: &str = r#"UPDATE "requirements"
    SET "title" = COALESCE($2, "title"),
        "description" = COALESCE($3, "description"),
        "property_type" = COALESCE($4, "property_type"),
        "deal_type" = COALESCE($5, "deal_type"),
        "location" = COALESCE($6, "location"),
        "asked_price" = COALESCE($7, "asked_price"),
        "phone" = COALESCE($8, "phone"),
        "updated_at" = $9
    WHERE "id" = $1 RETURNING *"#;

fn ref_column(kind: ListingKind) -> &'static str {
    match kind {
        ListingKind::Property => "all_properties",
        ListingKind::Requirement => "all_requirements",
    }
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseManager,
}

impl PgStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.db.health_check().await
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(r#"SELECT * FROM "users" ORDER BY "created_at", "id""#)
            .fetch_all(self.db.pool())
            .await?;
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "users" WHERE "id" = $1"#)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "users" WHERE "email" = $1"#)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO "users" ("id", "name", "email", "phone_number", "work_location",
                "rera_number", "avatar", "all_properties", "all_requirements", "created_at", "updated_at")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.work_location)
        .bind(&user.rera_number)
        .bind(&user.avatar)
        .bind(&user.all_properties)
        .bind(&user.all_requirements)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.db.pool())
        .await
        .map_err(DatabaseError::classify)
    }

    async fn update_user(&self, id: Uuid, update: &ProfileUpdate, now: DateTime<Utc>) -> Result<Option<User>, DatabaseError> {
        let updated = sqlx::query_as::<_, User>(USER_PROFILE_UPDATE)
            .bind(id)
            .bind(&update.name)
            .bind(&update.phone_number)
            .bind(&update.work_location)
            .bind(&update.rera_number)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(updated)
    }

    async fn list_properties(&self, filter: &Filter) -> Result<(Vec<Property>, i64), DatabaseError> {
        let mut conn = self.db.pool().acquire().await?;
        let query = QueryBuilder::<Property>::new(filter);
        let rows = query.select_all(&mut conn).await?;
        let total = query.count(&mut conn).await?;
        Ok((rows, total))
    }

    async fn latest_properties(&self, limit: i64) -> Result<Vec<Property>, DatabaseError> {
        let rows = sqlx::query_as::<_, Property>(
            r#"SELECT * FROM "properties" ORDER BY "created_at" DESC, "id" DESC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    async fn count_properties(&self, property_type: Option<&str>) -> Result<i64, DatabaseError> {
        let count: i64 = match property_type {
            Some(kind) => {
                sqlx::query_scalar(r#"SELECT COUNT(*) FROM "properties" WHERE LOWER("property_type") = $1"#)
                    .bind(kind.to_lowercase())
                    .fetch_one(self.db.pool())
                    .await?
            }
            None => {
                sqlx::query_scalar(r#"SELECT COUNT(*) FROM "properties""#)
                    .fetch_one(self.db.pool())
                    .await?
            }
        };
        Ok(count)
    }

    async fn find_property(&self, id: Uuid) -> Result<Option<Property>, DatabaseError> {
        let row = sqlx::query_as::<_, Property>(r#"SELECT * FROM "properties" WHERE "id" = $1"#)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn find_properties(&self, ids: &[Uuid]) -> Result<Vec<Property>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, Property>(
            r#"SELECT * FROM "properties" WHERE "id" = ANY($1) ORDER BY "created_at", "id""#,
        )
        .bind(ids)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    async fn update_property(&self, id: Uuid, p: &PropertyUpdate, now: DateTime<Utc>) -> Result<Option<Property>, DatabaseError> {
        let row = sqlx::query_as::<_, Property>(PROPERTY_UPDATE)
            .bind(id)
            .bind(&p.title)
            .bind(&p.description)
            .bind(&p.property_type)
            .bind(&p.deal_type)
            .bind(&p.location)
            .bind(p.price)
            .bind(p.total_square_feet)
            .bind(&p.phone)
            .bind(&p.photo)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn list_requirements(&self, filter: &Filter) -> Result<(Vec<Requirement>, i64), DatabaseError> {
        let mut conn = self.db.pool().acquire().await?;
        let query = QueryBuilder::<Requirement>::new(filter);
        let rows = query.select_all(&mut conn).await?;
        let total = query.count(&mut conn).await?;
        Ok((rows, total))
    }

    async fn latest_requirements(&self, limit: i64) -> Result<Vec<Requirement>, DatabaseError> {
        let rows = sqlx::query_as::<_, Requirement>(
            r#"SELECT * FROM "requirements" ORDER BY "created_at" DESC, "id" DESC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    async fn count_requirements(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "requirements""#)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn find_requirement(&self, id: Uuid) -> Result<Option<Requirement>, DatabaseError> {
        let row = sqlx::query_as::<_, Requirement>(r#"SELECT * FROM "requirements" WHERE "id" = $1"#)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn find_requirements(&self, ids: &[Uuid]) -> Result<Vec<Requirement>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, Requirement>(
            r#"SELECT * FROM "requirements" WHERE "id" = ANY($1) ORDER BY "created_at", "id""#,
        )
        .bind(ids)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    async fn update_requirement(
        &self,
        id: Uuid,
        r: &RequirementUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Requirement>, DatabaseError> {
        let row = sqlx::query_as::<_, Requirement>(REQUIREMENT_UPDATE)
            .bind(id)
            .bind(&r.title)
            .bind(&r.description)
            .bind(&r.property_type)
            .bind(&r.deal_type)
            .bind(&r.location)
            .bind(r.asked_price)
            .bind(&r.phone)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        let tx = self.db.pool().begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// A Postgres transaction. Owner rows are locked with `FOR UPDATE` so
/// concurrent pushes and pulls on the same user serialize.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "users" WHERE "email" = $1 FOR UPDATE"#)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "users" WHERE "id" = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn insert_property(&mut self, p: &Property) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO "properties" ("id", "title", "description", "property_type", "deal_type",
                "location", "price", "total_square_feet", "phone", "photo", "creator", "created_at", "updated_at")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(p.id)
        .bind(&p.title)
        .bind(&p.description)
        .bind(&p.property_type)
        .bind(&p.deal_type)
        .bind(&p.location)
        .bind(p.price)
        .bind(p.total_square_feet)
        .bind(&p.phone)
        .bind(&p.photo)
        .bind(p.creator)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::classify)?;
        Ok(())
    }

    async fn insert_requirement(&mut self, r: &Requirement) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO "requirements" ("id", "title", "description", "property_type", "deal_type",
                "location", "asked_price", "phone", "creator", "created_at", "updated_at")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(r.id)
        .bind(&r.title)
        .bind(&r.description)
        .bind(&r.property_type)
        .bind(&r.deal_type)
        .bind(&r.location)
        .bind(r.asked_price)
        .bind(&r.phone)
        .bind(r.creator)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::classify)?;
        Ok(())
    }

    async fn delete_property(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(r#"DELETE FROM "properties" WHERE "id" = $1"#)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_requirement(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(r#"DELETE FROM "requirements" WHERE "id" = $1"#)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_listing_ref(&mut self, user: Uuid, kind: ListingKind, listing: Uuid) -> Result<(), DatabaseError> {
        let column = ref_column(kind);
        let query = format!(
            r#"UPDATE "users" SET "{column}" = array_append("{column}", $2), "updated_at" = now()
               WHERE "id" = $1 AND NOT ($2 = ANY("{column}"))"#
        );
        sqlx::query(&query)
            .bind(user)
            .bind(listing)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn pull_listing_ref(&mut self, user: Uuid, kind: ListingKind, listing: Uuid) -> Result<(), DatabaseError> {
        let column = ref_column(kind);
        let query = format!(
            r#"UPDATE "users" SET "{column}" = array_remove("{column}", $2), "updated_at" = now()
               WHERE "id" = $1"#
        );
        sqlx::query(&query)
            .bind(user)
            .bind(listing)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(r#"DELETE FROM "users" WHERE "id" = $1"#)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
