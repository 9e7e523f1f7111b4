//! Minimal user surface: seeding and lookups. The core only consumes
//! this to resolve a bidder's display name for notifications.

// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::info;

// endregion: --- Imports

// region:    --- Model

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Model

// region:    --- SQL

const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";

const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, first_name, last_name)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (username) DO NOTHING
"#;

const GET_ALL_ACTIVE: &str = r#"
    SELECT id, username, email, first_name, last_name, is_active, created_at
    FROM users
    WHERE is_active
    ORDER BY id ASC
"#;

const GET_ACTIVE_BY_ID: &str = r#"
    SELECT id, username, email, first_name, last_name, is_active, created_at
    FROM users
    WHERE id = $1 AND is_active
"#;

// endregion: --- SQL

// region:    --- Operations

/// Seed 100 fixed users when the table is empty, matching the demo data
/// the rest of the system expects.
pub async fn seed_users(pool: &PgPool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>(COUNT_USERS)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    for i in 1..=100 {
        sqlx::query(INSERT_USER)
            .bind(format!("user{}", i))
            .bind(format!("user{}@example.com", i))
            .bind(format!("User{}", i))
            .bind(format!("Smith{}", i))
            .execute(pool)
            .await?;
    }
    info!("{:<12} --> seeded 100 users", "Users");
    Ok(())
}

pub async fn get_all_users(executor: impl PgExecutor<'_>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(GET_ALL_ACTIVE)
        .fetch_all(executor)
        .await
}

pub async fn get_user_by_id(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(GET_ACTIVE_BY_ID)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

// endregion: --- Operations
