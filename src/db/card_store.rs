use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::card::{Card, CardEvent};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Token already exists")]
    Conflict,

    #[error("Point balance would overflow")]
    Overflow,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage operations behind the card service.
///
/// Every method is a single statement or a single transaction; implementations
/// must not cache rows between calls.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Inserts a fresh card with zero points. A duplicate token is `Conflict`.
    async fn insert_card(&self, token: &str, owner: &str) -> Result<Card, StoreError>;

    async fn find_card(&self, token: &str) -> Result<Option<Card>, StoreError>;

    /// All cards, newest first
    async fn list_cards(&self) -> Result<Vec<Card>, StoreError>;

    /// Atomically adds `delta` unless the card is blocked, logging an event
    /// when the balance moved. Returns the card as stored afterwards, or
    /// `None` for an unknown token. A balance that would exceed `i64::MAX` is
    /// `Overflow` and leaves the card untouched.
    async fn add_points(&self, token: &str, delta: i64) -> Result<Option<Card>, StoreError>;

    async fn reset_points(&self, token: &str) -> Result<Option<Card>, StoreError>;

    async fn toggle_blocked(&self, token: &str) -> Result<Option<Card>, StoreError>;

    /// Removes the card and its events. Returns false for an unknown token.
    async fn delete_card(&self, token: &str) -> Result<bool, StoreError>;

    async fn list_events(&self, token: &str) -> Result<Vec<CardEvent>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteCardStore {
    pool: SqlitePool,
}

impl SqliteCardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const CARD_COLUMNS: &str = "token, owner, points, blocked, created_at";

#[async_trait]
impl CardStore for SqliteCardStore {
    async fn insert_card(&self, token: &str, owner: &str) -> Result<Card, StoreError> {
        let result = sqlx::query_as::<_, Card>(&format!(
            r#"
            INSERT INTO cards (token, owner, points, blocked, created_at)
            VALUES (?1, ?2, 0, FALSE, ?3)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(owner)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(card) => Ok(card),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_card(&self, token: &str) -> Result<Option<Card>, StoreError> {
        let card = sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE token = ?1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        let cards = sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn add_points(&self, token: &str, delta: i64) -> Result<Option<Card>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Increment in SQL so concurrent scans cannot lose updates
        let updated = sqlx::query(
            r#"
            UPDATE cards
            SET points = points + ?1
            WHERE token = ?2 AND blocked = FALSE AND points <= ?3 - ?1
            "#,
        )
        .bind(delta)
        .bind(token)
        .bind(i64::MAX)
        .execute(&mut *tx)
        .await?;

        let applied = updated.rows_affected() == 1;
        if applied {
            sqlx::query("INSERT INTO events (token, delta, ts) VALUES (?1, ?2, ?3)")
                .bind(token)
                .bind(delta)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }

        let card = sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE token = ?1"
        ))
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        // An unblocked card that did not move hit the overflow guard
        if !applied && card.as_ref().is_some_and(|card| !card.blocked) {
            return Err(StoreError::Overflow);
        }

        tx.commit().await?;

        Ok(card)
    }

    async fn reset_points(&self, token: &str) -> Result<Option<Card>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<i64> = sqlx::query_scalar("SELECT points FROM cards WHERE token = ?1")
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        let card = sqlx::query_as::<_, Card>(&format!(
            "UPDATE cards SET points = 0 WHERE token = ?1 RETURNING {CARD_COLUMNS}"
        ))
        .bind(token)
        .fetch_one(&mut *tx)
        .await?;

        if previous != 0 {
            sqlx::query("INSERT INTO events (token, delta, ts) VALUES (?1, ?2, ?3)")
                .bind(token)
                .bind(-previous)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(card))
    }

    async fn toggle_blocked(&self, token: &str) -> Result<Option<Card>, StoreError> {
        let card = sqlx::query_as::<_, Card>(&format!(
            "UPDATE cards SET blocked = NOT blocked WHERE token = ?1 RETURNING {CARD_COLUMNS}"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn delete_card(&self, token: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM events WHERE token = ?1")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM cards WHERE token = ?1")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(deleted.rows_affected() == 1)
    }

    async fn list_events(&self, token: &str) -> Result<Vec<CardEvent>, StoreError> {
        let events = sqlx::query_as::<_, CardEvent>(
            r#"
            SELECT id, token, delta, ts FROM events
            WHERE token = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(token)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn store() -> SqliteCardStore {
        SqliteCardStore::new(db::create_memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_token_is_conflict() {
        let store = store().await;
        store.insert_card("AAAA000001", "Ada").await.unwrap();

        let result = store.insert_card("AAAA000001", "Grace").await;

        assert!(matches!(result, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let store = store().await;
        store.insert_card("AbCdEf1234", "Ada").await.unwrap();

        assert!(store.find_card("AbCdEf1234").await.unwrap().is_some());
        assert!(store.find_card("abcdef1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_points_logs_event_only_when_applied() {
        let store = store().await;
        store.insert_card("TOKEN00001", "Ada").await.unwrap();

        store.add_points("TOKEN00001", 2).await.unwrap();
        store.toggle_blocked("TOKEN00001").await.unwrap();
        let card = store.add_points("TOKEN00001", 5).await.unwrap().unwrap();

        assert_eq!(card.points, 2);
        let events = store.list_events("TOKEN00001").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].delta, 2);
    }

    #[tokio::test]
    async fn test_add_points_guards_against_overflow() {
        let store = store().await;
        store.insert_card("TOKEN00001", "Ada").await.unwrap();
        sqlx::query("UPDATE cards SET points = ?1 WHERE token = ?2")
            .bind(i64::MAX - 2)
            .bind("TOKEN00001")
            .execute(&store.pool)
            .await
            .unwrap();

        let result = store.add_points("TOKEN00001", 5).await;
        assert!(matches!(result, Err(StoreError::Overflow)));

        let card = store.add_points("TOKEN00001", 2).await.unwrap().unwrap();
        assert_eq!(card.points, i64::MAX);
        assert_eq!(store.list_events("TOKEN00001").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_records_negative_delta() {
        let store = store().await;
        store.insert_card("TOKEN00001", "Ada").await.unwrap();
        store.add_points("TOKEN00001", 3).await.unwrap();

        let card = store.reset_points("TOKEN00001").await.unwrap().unwrap();

        assert_eq!(card.points, 0);
        let events = store.list_events("TOKEN00001").await.unwrap();
        assert_eq!(events[0].delta, -3);
        assert!(store.reset_points("MISSING000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_events() {
        let store = store().await;
        store.insert_card("TOKEN00001", "Ada").await.unwrap();
        store.add_points("TOKEN00001", 1).await.unwrap();

        assert!(store.delete_card("TOKEN00001").await.unwrap());
        assert!(!store.delete_card("TOKEN00001").await.unwrap());
        assert!(store.list_events("TOKEN00001").await.unwrap().is_empty());
    }
}
