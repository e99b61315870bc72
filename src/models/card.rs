use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub token: String,
    pub owner: String,
    pub points: i64,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// One point change applied to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CardEvent {
    pub id: i64,
    pub token: String,
    pub delta: i64,
    pub ts: DateTime<Utc>,
}

/// Public JSON view of a card's balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub name: String,
    pub points: i64,
    pub blocked: bool,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        Self {
            name: card.owner.clone(),
            points: card.points,
            blocked: card.blocked,
        }
    }
}
