use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // argon2 hash, not exposed in JSON
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &SqlitePool, email: &str, hashed_password: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES (?, ?)
            RETURNING id, email, hashed_password
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

/// True when the error is the database rejecting a duplicate key, e.g. the
/// unique index on `users.email` backstopping a concurrent registration.
pub fn is_unique_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}
