use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::engine::types::{ActionKind, Chips, SeatIndex};

use super::broadcast::MessageLogEntry;
use super::transport::ClientTransport;

/// Inbox message for a table actor. Every mutation of table state goes
/// through one of these, including the actor's own timer callbacks.
pub enum TableCommand {
    SeatPlayer {
        req: SeatPlayerRequest,
        reply: oneshot::Sender<Option<SeatIndex>>,
    },
    /// Separate from `SeatPlayer` so the caller can finish its tracking
    /// first: `table:joined` must reach the client before any
    /// `game:hole_cards` from a starting hand.
    TriggerMaybeStartHand,
    UnseatPlayer {
        external_id: String,
    },
    UnseatForFastFold {
        external_id: String,
        reply: oneshot::Sender<Option<ReseatCandidate>>,
    },
    PlayerAction {
        external_id: String,
        action: ActionKind,
        amount: Chips,
        reply: Option<oneshot::Sender<bool>>,
    },
    EarlyFold {
        external_id: String,
        reply: Option<oneshot::Sender<bool>>,
    },
    SetChips {
        external_id: String,
        chips: Chips,
    },
    AddSpectator {
        id: Uuid,
        transport: Arc<dyn ClientTransport>,
    },
    RemoveSpectator {
        id: Uuid,
    },
    SetPaused {
        paused: bool,
    },
    Status {
        reply: oneshot::Sender<TableStatus>,
    },
    Timer {
        token: u64,
        kind: TimerKind,
    },
    Shutdown,
}

pub struct SeatPlayerRequest {
    pub external_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub transport: Option<Arc<dyn ClientTransport>>,
    pub buy_in: Option<Chips>,
    pub preferred_seat: Option<SeatIndex>,
    /// Router suppresses the join event so it can order it after its own
    /// `table:change` notification.
    pub suppress_joined: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    ActionTimeout { seat: SeatIndex },
    ActionAnimation,
    StreetTransition,
    RunoutReveal,
    Completion { stage: CompletionStage },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionStage {
    SendShowdown,
    SendHandComplete,
    StartNextHand,
}

/// Player handed back to the router when a fast-fold table breaks up or
/// migrates a folder.
pub struct ReseatCandidate {
    pub external_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub chips: Chips,
    pub transport: Option<Arc<dyn ClientTransport>>,
}

/// Read-only snapshot for the status endpoint.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TableStatus {
    pub table_id: Uuid,
    pub is_fast_fold: bool,
    pub is_paused: bool,
    pub is_hand_in_progress: bool,
    pub is_run_out_in_progress: bool,
    pub seats: Vec<SeatSummary>,
    pub spectators: usize,
    pub message_log: Vec<MessageLogEntry>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SeatSummary {
    pub seat: SeatIndex,
    pub external_id: String,
    pub display_name: String,
    pub chips: Chips,
    pub is_connected: bool,
    pub waiting_for_next_hand: bool,
    pub left_for_fast_fold: bool,
}

/// Hooks the fast-fold router registers on its tables.
#[derive(Default)]
pub struct FastFoldHooks {
    /// Fired when a timeout folded a seat, so the router can reseat the
    /// player instead of leaving them here.
    pub on_timeout_fold: Option<Box<dyn Fn(Uuid, &str) + Send + Sync>>,
    /// Fired between hands with the remaining players; when present the
    /// router redistributes them instead of the table dealing again.
    pub on_fast_fold_reassign: Option<Box<dyn Fn(Uuid, Vec<ReseatCandidate>) + Send + Sync>>,
}

/// Cloneable address of a table actor.
#[derive(Clone)]
pub struct TableHandle {
    pub id: Uuid,
    tx: mpsc::Sender<TableCommand>,
}

impl TableHandle {
    pub(crate) fn new(id: Uuid, tx: mpsc::Sender<TableCommand>) -> Self {
        Self { id, tx }
    }

    async fn send(&self, cmd: TableCommand) {
        // A closed inbox just means the table shut down.
        let _ = self.tx.send(cmd).await;
    }

    pub async fn seat_player(&self, req: SeatPlayerRequest) -> Option<SeatIndex> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::SeatPlayer { req, reply }).await;
        rx.await.ok().flatten()
    }

    pub async fn trigger_maybe_start_hand(&self) {
        self.send(TableCommand::TriggerMaybeStartHand).await;
    }

    pub async fn player_action(&self, external_id: &str, action: ActionKind, amount: Chips) -> bool {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::PlayerAction {
            external_id: external_id.to_string(),
            action,
            amount,
            reply: Some(reply),
        })
        .await;
        rx.await.unwrap_or(false)
    }

    pub async fn early_fold(&self, external_id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::EarlyFold {
            external_id: external_id.to_string(),
            reply: Some(reply),
        })
        .await;
        rx.await.unwrap_or(false)
    }

    pub async fn unseat_player(&self, external_id: &str) {
        self.send(TableCommand::UnseatPlayer {
            external_id: external_id.to_string(),
        })
        .await;
    }

    pub async fn unseat_for_fast_fold(&self, external_id: &str) -> Option<ReseatCandidate> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::UnseatForFastFold {
            external_id: external_id.to_string(),
            reply,
        })
        .await;
        rx.await.ok().flatten()
    }

    pub async fn set_chips(&self, external_id: &str, chips: Chips) {
        self.send(TableCommand::SetChips {
            external_id: external_id.to_string(),
            chips,
        })
        .await;
    }

    pub async fn add_spectator(&self, id: Uuid, transport: Arc<dyn ClientTransport>) {
        self.send(TableCommand::AddSpectator { id, transport }).await;
    }

    pub async fn remove_spectator(&self, id: Uuid) {
        self.send(TableCommand::RemoveSpectator { id }).await;
    }

    pub async fn set_paused(&self, paused: bool) {
        self.send(TableCommand::SetPaused { paused }).await;
    }

    pub async fn status(&self) -> Option<TableStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Status { reply }).await;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        self.send(TableCommand::Shutdown).await;
    }
}
