//! `ProfileStore` backed by the Postgres `users` table.

use sqlx::PgPool;
use uuid::Uuid;

use super::{NewProfile, ProfileStore, ProfileUpdate, StoreError, UserProfile};

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn insert(&self, profile: &NewProfile) -> Result<UserProfile, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            r"INSERT INTO users (id, email, first_name, last_name)
              VALUES ($1, $2, $3, $4)
              RETURNING id, email, first_name, last_name, created_at",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn select_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            "SELECT id, email, first_name, last_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: &ProfileUpdate) -> Result<UserProfile, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            r"UPDATE users
              SET first_name = COALESCE($2, first_name),
                  last_name = COALESCE($3, last_name)
              WHERE id = $1
              RETURNING id, email, first_name, last_name, created_at",
        )
        .bind(id)
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
