//! Hand-history recorder contract.
//!
//! The table snapshots every completed hand and hands it off without
//! awaiting the write: persistence lives behind `HandHistoryStore` and a
//! failed write is logged and dropped, never surfaced to the table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::Card;
use crate::engine::types::{Chips, HandAction, SeatIndex, Winner};

const LOG_TARGET: &str = "plo_server::history";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerHandSnapshot {
    pub seat: SeatIndex,
    pub external_id: String,
    pub display_name: String,
    pub starting_chips: Chips,
    pub hole_cards: Vec<Card>,
    pub finishing_chips: Chips,
    pub profit: i64,
    /// Expected profit frozen at the all-in, when the hand ran out.
    pub all_in_ev_profit: Option<i64>,
}

/// One completed hand, exactly as the recorder receives it. The storage
/// schema behind the trait is opaque to the table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletedHand {
    pub table_id: Uuid,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub dealer_seat: SeatIndex,
    pub actions: Vec<HandAction>,
    pub board: Vec<Card>,
    pub pot: Chips,
    pub rake: Chips,
    pub winners: Vec<Winner>,
    pub players: Vec<PlayerHandSnapshot>,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait HandHistoryStore: Send + Sync {
    async fn record_hand(&self, hand: CompletedHand) -> Result<(), HistoryError>;
}

/// In-memory store for tests and the dev server.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    hands: Mutex<Vec<CompletedHand>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<CompletedHand> {
        self.hands.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.hands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.lock().is_empty()
    }
}

#[async_trait]
impl HandHistoryStore for InMemoryHistoryStore {
    async fn record_hand(&self, hand: CompletedHand) -> Result<(), HistoryError> {
        tracing::debug!(
            target: LOG_TARGET,
            table_id = %hand.table_id,
            pot = hand.pot,
            winners = hand.winners.len(),
            "hand recorded"
        );
        self.hands.lock().push(hand);
        Ok(())
    }
}
