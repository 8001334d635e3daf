//! User profiles — the application-level record keyed by identity id.
//!
//! DESIGN
//! ======
//! A `UserProfile` mirrors one row of the `users` table. Its `id` is the
//! auth provider's identity id, so the table's primary key is what enforces
//! "at most one profile per identity". The synchronizer reaches the table
//! only through the `ProfileStore` trait.

pub mod postgres;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Mirrors the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied at sign-up. `created_at` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Mutable display attributes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile already exists")]
    UniqueViolation,
    #[error("profile not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::UniqueViolation,
            _ => Self::Db(e),
        }
    }
}

/// Keyed record store for profiles.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new row. Fails with `UniqueViolation` if the id exists.
    async fn insert(&self, profile: &NewProfile) -> Result<UserProfile, StoreError>;

    /// Point lookup by id. `Ok(None)` means no row, which callers must
    /// handle separately from failures.
    async fn select_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn update(&self, id: Uuid, changes: &ProfileUpdate) -> Result<UserProfile, StoreError>;
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn display_name(profile: &UserProfile) -> String {
    let full = format!("{} {}", profile.first_name.trim(), profile.last_name.trim());
    let full = full.trim();
    if full.is_empty() { profile.email.clone() } else { full.to_string() }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
