use std::sync::Arc;

use crate::db::{CardStore, StoreError};
use crate::models::card::{Card, CardEvent};
use crate::services::token;

/// How many fresh tokens to try before giving up on a create
const TOKEN_ATTEMPTS: usize = 5;

/// Largest number of points a single increment may add
pub const MAX_INCREMENT: i64 = 1_000_000;

#[derive(thiserror::Error, Debug)]
pub enum CardError {
    #[error("Card not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Could not allocate a unique card token")]
    Conflict,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Random number generator failure")]
    Random,
}

/// Card operations over an injected store
#[derive(Clone)]
pub struct CardService {
    store: Arc<dyn CardStore>,
}

impl CardService {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    /// Creates a card with a fresh token and zero points
    pub async fn create_card(&self, owner: &str) -> Result<Card, CardError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(CardError::Validation("Owner name is required".to_string()));
        }

        for attempt in 1..=TOKEN_ATTEMPTS {
            let token = token::generate().map_err(|_| CardError::Random)?;

            match self.store.insert_card(&token, owner).await {
                Ok(card) => {
                    tracing::info!(token = %card.token, owner = %card.owner, "Created card");
                    return Ok(card);
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(attempt, "Generated card token already exists, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CardError::Conflict)
    }

    pub async fn get_card(&self, token: &str) -> Result<Card, CardError> {
        self.store
            .find_card(token)
            .await?
            .ok_or_else(|| CardError::NotFound(token.to_string()))
    }

    /// Adds points to a card.
    ///
    /// A blocked card is left unchanged and still reported as success.
    pub async fn increment_points(&self, token: &str, delta: i64) -> Result<Card, CardError> {
        if !(1..=MAX_INCREMENT).contains(&delta) {
            return Err(CardError::Validation(format!(
                "Point increment must be between 1 and {MAX_INCREMENT}, got {delta}"
            )));
        }

        let card = match self.store.add_points(token, delta).await {
            Ok(card) => card.ok_or_else(|| CardError::NotFound(token.to_string()))?,
            Err(StoreError::Overflow) => {
                return Err(CardError::Validation(
                    "Point balance is at its maximum".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        if card.blocked {
            tracing::info!(token = %card.token, "Card is blocked, points not added");
        } else {
            tracing::info!(token = %card.token, delta, points = card.points, "Added points");
        }

        Ok(card)
    }

    pub async fn reset_points(&self, token: &str) -> Result<Card, CardError> {
        let card = self
            .store
            .reset_points(token)
            .await?
            .ok_or_else(|| CardError::NotFound(token.to_string()))?;

        tracing::info!(token = %card.token, "Reset points");
        Ok(card)
    }

    pub async fn toggle_blocked(&self, token: &str) -> Result<Card, CardError> {
        let card = self
            .store
            .toggle_blocked(token)
            .await?
            .ok_or_else(|| CardError::NotFound(token.to_string()))?;

        tracing::info!(token = %card.token, blocked = card.blocked, "Toggled card block");
        Ok(card)
    }

    pub async fn delete_card(&self, token: &str) -> Result<(), CardError> {
        if !self.store.delete_card(token).await? {
            return Err(CardError::NotFound(token.to_string()));
        }

        tracing::info!(token = %token, "Deleted card");
        Ok(())
    }

    /// All cards, newest first
    pub async fn list_cards(&self) -> Result<Vec<Card>, CardError> {
        Ok(self.store.list_cards().await?)
    }

    /// Point history of a card, newest first
    pub async fn card_events(&self, token: &str) -> Result<Vec<CardEvent>, CardError> {
        // Events are soft references, so check the card itself
        self.get_card(token).await?;
        Ok(self.store.list_events(token).await?)
    }
}
