//! Workout data service — plans, exercises, logged sessions, 1RM records.
//!
//! Each operation is a single query against the pool. Ownership checks are
//! left to row-level policies on the database side.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::progress;

// =============================================================================
// ROWS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Exercise {
    pub id: Uuid,
    pub workout_plan_id: Uuid,
    pub name: String,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExercise {
    pub workout_plan_id: Uuid,
    pub name: String,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workout_plan_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub completed: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkoutSession {
    pub user_id: Uuid,
    pub workout_plan_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub completed: bool,
    pub notes: Option<String>,
}

/// Partial update of a logged session. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSessionUpdate {
    pub completed: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_name: String,
    pub one_rep_max: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProgressRecord {
    pub user_id: Uuid,
    pub exercise_name: String,
    pub one_rep_max: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

/// Dashboard summary for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutStats {
    pub total_workouts: i64,
    pub this_month_workouts: i64,
    pub average_workout_minutes: u32,
    /// Whole-percent change between the earliest and latest 1RM records.
    pub strength_increase_pct: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
    #[error("workout session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

// =============================================================================
// SESSIONS
// =============================================================================

pub async fn save_workout_session(pool: &PgPool, session: &NewWorkoutSession) -> Result<WorkoutSession, WorkoutError> {
    let row = sqlx::query_as::<_, WorkoutSession>(
        r"INSERT INTO workout_sessions (user_id, workout_plan_id, date, completed, notes)
          VALUES ($1, $2, $3, $4, $5)
          RETURNING id, user_id, workout_plan_id, date, completed, notes",
    )
    .bind(session.user_id)
    .bind(session.workout_plan_id)
    .bind(session.date)
    .bind(session.completed)
    .bind(&session.notes)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Newest first.
pub async fn user_workout_sessions(pool: &PgPool, user_id: Uuid) -> Result<Vec<WorkoutSession>, WorkoutError> {
    let rows = sqlx::query_as::<_, WorkoutSession>(
        r"SELECT id, user_id, workout_plan_id, date, completed, notes
          FROM workout_sessions
          WHERE user_id = $1
          ORDER BY date DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_workout_session(
    pool: &PgPool,
    session_id: Uuid,
    updates: &WorkoutSessionUpdate,
) -> Result<WorkoutSession, WorkoutError> {
    let row = sqlx::query_as::<_, WorkoutSession>(
        r"UPDATE workout_sessions
          SET completed = COALESCE($2, completed),
              notes = COALESCE($3, notes)
          WHERE id = $1
          RETURNING id, user_id, workout_plan_id, date, completed, notes",
    )
    .bind(session_id)
    .bind(updates.completed)
    .bind(updates.notes.as_deref())
    .fetch_optional(pool)
    .await?;
    row.ok_or(WorkoutError::SessionNotFound(session_id))
}

// =============================================================================
// PROGRESS RECORDS
// =============================================================================

pub async fn save_progress_record(pool: &PgPool, record: &NewProgressRecord) -> Result<ProgressRecord, WorkoutError> {
    let row = sqlx::query_as::<_, ProgressRecord>(
        r"INSERT INTO progress_records (user_id, exercise_name, one_rep_max, date)
          VALUES ($1, $2, $3, $4)
          RETURNING id, user_id, exercise_name, one_rep_max, date",
    )
    .bind(record.user_id)
    .bind(&record.exercise_name)
    .bind(record.one_rep_max)
    .bind(record.date)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Oldest first, for charting.
pub async fn exercise_progress(
    pool: &PgPool,
    user_id: Uuid,
    exercise_name: &str,
) -> Result<Vec<ProgressRecord>, WorkoutError> {
    let rows = sqlx::query_as::<_, ProgressRecord>(
        r"SELECT id, user_id, exercise_name, one_rep_max, date
          FROM progress_records
          WHERE user_id = $1 AND exercise_name = $2
          ORDER BY date ASC",
    )
    .bind(user_id)
    .bind(exercise_name)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// =============================================================================
// PLANS AND EXERCISES
// =============================================================================

pub async fn create_workout_plan(pool: &PgPool, user_id: Uuid, name: &str) -> Result<WorkoutPlan, WorkoutError> {
    let row = sqlx::query_as::<_, WorkoutPlan>(
        r"INSERT INTO workout_plans (user_id, name)
          VALUES ($1, $2)
          RETURNING id, user_id, name, created_at, updated_at",
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Newest first.
pub async fn user_workout_plans(pool: &PgPool, user_id: Uuid) -> Result<Vec<WorkoutPlan>, WorkoutError> {
    let rows = sqlx::query_as::<_, WorkoutPlan>(
        r"SELECT id, user_id, name, created_at, updated_at
          FROM workout_plans
          WHERE user_id = $1
          ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert all exercises in one transaction.
pub async fn add_exercises_to_plan(pool: &PgPool, exercises: &[NewExercise]) -> Result<Vec<Exercise>, WorkoutError> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(exercises.len());
    for ex in exercises {
        let row = sqlx::query_as::<_, Exercise>(
            r#"INSERT INTO exercises (workout_plan_id, name, sets, reps, weight, "order")
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, workout_plan_id, name, sets, reps, weight, "order""#,
        )
        .bind(ex.workout_plan_id)
        .bind(&ex.name)
        .bind(ex.sets)
        .bind(ex.reps)
        .bind(ex.weight)
        .bind(ex.order)
        .fetch_one(&mut *tx)
        .await?;
        created.push(row);
    }
    tx.commit().await?;
    Ok(created)
}

pub async fn plan_exercises(pool: &PgPool, plan_id: Uuid) -> Result<Vec<Exercise>, WorkoutError> {
    let rows = sqlx::query_as::<_, Exercise>(
        r#"SELECT id, workout_plan_id, name, sets, reps, weight, "order"
           FROM exercises
           WHERE workout_plan_id = $1
           ORDER BY "order" ASC"#,
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// =============================================================================
// STATS
// =============================================================================

pub async fn workout_stats(pool: &PgPool, user_id: Uuid, now: OffsetDateTime) -> Result<WorkoutStats, WorkoutError> {
    let counts = sqlx::query(
        r"SELECT
              COUNT(*) AS total,
              COUNT(*) FILTER (WHERE date >= $2) AS this_month
          FROM workout_sessions
          WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(progress::start_of_month(now))
    .fetch_one(pool)
    .await?;

    let maxes: Vec<f64> = sqlx::query_scalar(
        r"SELECT one_rep_max
          FROM progress_records
          WHERE user_id = $1
          ORDER BY date ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(summarize(counts.get("total"), counts.get("this_month"), &maxes))
}

#[allow(clippy::cast_possible_truncation)]
fn summarize(total_workouts: i64, this_month_workouts: i64, one_rep_maxes: &[f64]) -> WorkoutStats {
    WorkoutStats {
        total_workouts,
        this_month_workouts,
        average_workout_minutes: progress::AVERAGE_WORKOUT_MINUTES,
        strength_increase_pct: progress::series_increase_pct(one_rep_maxes).round() as i64,
    }
}

#[cfg(test)]
#[path = "workout_test.rs"]
mod tests;
