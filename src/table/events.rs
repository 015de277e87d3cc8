//! Typed wire schema: one closed enum per direction. The broadcast log
//! stores the kind tag from `event_name`, so introspection never needs
//! to peek inside payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::Card;
use crate::engine::legals::ValidAction;
use crate::engine::types::{ActionKind, Chips, Position, SeatIndex, SidePot, Street};

/// Client → server, bound to a seat's transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IngressEvent {
    #[serde(rename = "player:action")]
    PlayerAction {
        table_id: Uuid,
        action: ActionKind,
        #[serde(default)]
        amount: Chips,
    },
    #[serde(rename = "player:early_fold")]
    EarlyFold { table_id: Uuid },
    #[serde(rename = "table:leave")]
    LeaveTable { table_id: Uuid },
    /// Admin-only chip override; the transport layer authenticates.
    #[serde(rename = "debug:set_chips")]
    SetChips {
        table_id: Uuid,
        player_id: String,
        chips: Chips,
    },
}

impl IngressEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            IngressEvent::PlayerAction { .. } => "player:action",
            IngressEvent::EarlyFold { .. } => "player:early_fold",
            IngressEvent::LeaveTable { .. } => "table:leave",
            IngressEvent::SetChips { .. } => "debug:set_chips",
        }
    }

    pub fn table_id(&self) -> Uuid {
        match self {
            IngressEvent::PlayerAction { table_id, .. }
            | IngressEvent::EarlyFold { table_id }
            | IngressEvent::LeaveTable { table_id }
            | IngressEvent::SetChips { table_id, .. } => *table_id,
        }
    }
}

/// Server → client.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum EgressEvent {
    #[serde(rename = "table:joined")]
    TableJoined { table_id: Uuid, seat: SeatIndex },
    #[serde(rename = "table:left")]
    TableLeft { table_id: Uuid },
    #[serde(rename = "table:busted")]
    TableBusted { message: String },
    #[serde(rename = "game:hole_cards")]
    HoleCards { cards: Vec<Card> },
    #[serde(rename = "game:state")]
    State { state: ClientGameState },
    #[serde(rename = "game:action_required")]
    ActionRequired {
        player_id: String,
        valid_actions: Vec<ValidAction>,
        timeout_ms: u64,
    },
    #[serde(rename = "game:action_taken")]
    ActionTaken {
        player_id: String,
        action: ActionKind,
        amount: Chips,
    },
    #[serde(rename = "game:showdown")]
    Showdown {
        winners: Vec<ShowdownWinner>,
        players: Vec<ShowdownReveal>,
    },
    #[serde(rename = "game:hand_complete")]
    HandComplete {
        winners: Vec<WinnerSummary>,
        rake: Chips,
    },
}

impl EgressEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            EgressEvent::TableJoined { .. } => "table:joined",
            EgressEvent::TableLeft { .. } => "table:left",
            EgressEvent::TableBusted { .. } => "table:busted",
            EgressEvent::HoleCards { .. } => "game:hole_cards",
            EgressEvent::State { .. } => "game:state",
            EgressEvent::ActionRequired { .. } => "game:action_required",
            EgressEvent::ActionTaken { .. } => "game:action_taken",
            EgressEvent::Showdown { .. } => "game:showdown",
            EgressEvent::HandComplete { .. } => "game:hand_complete",
        }
    }
}

/// Winner line on `game:hand_complete`.
#[derive(Clone, Debug, Serialize)]
pub struct WinnerSummary {
    pub player_id: String,
    pub seat: SeatIndex,
    pub amount: Chips,
    pub hand_name: Option<String>,
}

/// Winner line on `game:showdown`, with the winning five.
#[derive(Clone, Debug, Serialize)]
pub struct ShowdownWinner {
    pub player_id: String,
    pub amount: Chips,
    pub hand_name: Option<String>,
    pub cards: Vec<Card>,
}

/// Face-up hand on `game:showdown`.
#[derive(Clone, Debug, Serialize)]
pub struct ShowdownReveal {
    pub seat_index: SeatIndex,
    pub player_id: String,
    pub cards: Vec<Card>,
    pub hand_name: Option<String>,
}

/// Per-seat view of one player inside `game:state`. Hole cards are only
/// present for the viewer's own seat (spectators see them all).
#[derive(Clone, Debug, Serialize)]
pub struct ProjectedPlayer {
    pub seat: SeatIndex,
    pub player_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub position: Option<Position>,
    pub chips: Chips,
    pub current_bet: Chips,
    pub folded: bool,
    pub is_all_in: bool,
    pub is_connected: bool,
    pub waiting_for_next_hand: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole_cards: Option<Vec<Card>>,
}

/// The authoritative snapshot clients render from.
#[derive(Clone, Debug, Serialize)]
pub struct ClientGameState {
    pub table_id: Uuid,
    pub players: Vec<ProjectedPlayer>,
    pub community_cards: Vec<Card>,
    pub pot: Chips,
    pub side_pots: Vec<SidePot>,
    pub current_street: Street,
    pub dealer_seat: Option<SeatIndex>,
    pub current_player_seat: Option<SeatIndex>,
    pub current_bet: Chips,
    pub min_raise: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub is_hand_in_progress: bool,
    pub is_hand_complete: bool,
    pub winners: Vec<WinnerSummary>,
    pub action_timeout_at: Option<i64>, // unix millis
    pub action_timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingress_events_parse_from_wire_json() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"player:action","table_id":"{id}","action":"raise","amount":40}}"#
        );
        let ev: IngressEvent = serde_json::from_str(&raw).unwrap();
        match ev {
            IngressEvent::PlayerAction {
                table_id,
                action,
                amount,
            } => {
                assert_eq!(table_id, id);
                assert_eq!(action, ActionKind::Raise);
                assert_eq!(amount, 40);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let raw = format!(r#"{{"type":"player:early_fold","table_id":"{id}"}}"#);
        let ev: IngressEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(ev.event_name(), "player:early_fold");
    }

    #[test]
    fn amount_defaults_to_zero() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"player:action","table_id":"{id}","action":"fold"}}"#);
        let ev: IngressEvent = serde_json::from_str(&raw).unwrap();
        match ev {
            IngressEvent::PlayerAction { amount, .. } => assert_eq!(amount, 0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn egress_events_carry_their_wire_tag() {
        let ev = EgressEvent::TableJoined {
            table_id: Uuid::new_v4(),
            seat: 2,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "table:joined");
        assert_eq!(json["seat"], 2);
        assert_eq!(ev.event_name(), "table:joined");
    }
}
