use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::services::password::{self, PasswordError};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUser {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(thiserror::Error, Debug)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Password(#[from] PasswordError),
}

impl AdminUser {
    /// Inserts the admin row unless one with this username already exists.
    /// Returns true when a new row was written.
    pub async fn seed(pool: &SqlitePool, username: &str, password: &str) -> Result<bool, SeedError> {
        let password_hash = password::hash_password(password)?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?1, ?2)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            SELECT username, password_hash FROM users WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Looks up the user and checks the password against the stored hash
    pub async fn verify_credentials(
        pool: &SqlitePool,
        username: &str,
        password: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = Self::find_by_username(pool, username)
            .await?
            .filter(|user| password::verify_password(password, &user.password_hash));

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = db::create_memory_pool().await.unwrap();

        assert!(AdminUser::seed(&pool, "admin", "first").await.unwrap());
        assert!(!AdminUser::seed(&pool, "admin", "second").await.unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // The original password survives a second seed
        assert!(AdminUser::verify_credentials(&pool, "admin", "first")
            .await
            .unwrap()
            .is_some());
        assert!(AdminUser::verify_credentials(&pool, "admin", "second")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_plaintext() {
        let pool = db::create_memory_pool().await.unwrap();
        AdminUser::seed(&pool, "admin", "admin123").await.unwrap();

        let user = AdminUser::find_by_username(&pool, "admin")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(user.password_hash, "admin123");
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let pool = db::create_memory_pool().await.unwrap();
        AdminUser::seed(&pool, "admin", "admin123").await.unwrap();

        let user = AdminUser::verify_credentials(&pool, "root", "admin123")
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
