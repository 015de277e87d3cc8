use serde::{Deserialize, Serialize};

use crate::cards::Card;

use super::errors::{EngineError, InvariantCheck};
use super::types::{
    Blinds, Chips, HandAction, HandPlayer, SeatIndex, SidePot, Street, Winner, MAX_PLAYERS,
};

/// Complete state of one hand. Transitions never mutate in place: each
/// operation takes `&GameState` and returns the successor, so a rejected
/// action leaves the caller's state untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub players: Vec<HandPlayer>, // always MAX_PLAYERS entries, seat-indexed
    pub deck: Vec<Card>,          // remaining cards in deal order
    pub community_cards: Vec<Card>, // 0, 3, 4 or 5
    pub pot: Chips,
    pub side_pots: Vec<SidePot>, // populated at showdown
    pub current_street: Street,
    pub dealer_position: SeatIndex,
    pub current_player: Option<SeatIndex>, // None: nobody may act
    pub current_bet: Chips,                // street high water
    pub min_raise: Chips,                  // last full raise increment
    pub last_full_raise_bet: Chips,        // street level of the last full raise
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub last_raiser: Option<SeatIndex>,
    pub hand_history: Vec<HandAction>,
    pub is_hand_complete: bool,
    pub winners: Vec<Winner>,
}

impl GameState {
    /// Fresh table-level state before any hand: six seats, given stack,
    /// empty deck and board. `start_new_hand` does the real work.
    pub fn initial(chips: Chips, blinds: Blinds) -> Self {
        let players = (0..MAX_PLAYERS)
            .map(|seat| HandPlayer::active(seat, format!("seat-{seat}"), chips))
            .collect();
        Self {
            players,
            deck: Vec::new(),
            community_cards: Vec::new(),
            pot: 0,
            side_pots: Vec::new(),
            current_street: Street::Preflop,
            dealer_position: MAX_PLAYERS - 1,
            current_player: None,
            current_bet: 0,
            min_raise: blinds.big_blind,
            last_full_raise_bet: 0,
            small_blind: blinds.small_blind,
            big_blind: blinds.big_blind,
            last_raiser: None,
            hand_history: Vec::new(),
            is_hand_complete: false,
            winners: Vec::new(),
        }
    }

    pub fn player(&self, seat: SeatIndex) -> &HandPlayer {
        &self.players[seat]
    }

    /// Seats eligible to be dealt into a hand.
    pub fn dealable_seats(&self) -> Vec<SeatIndex> {
        self.players
            .iter()
            .filter(|p| !p.is_sitting_out && p.chips > 0)
            .map(|p| p.seat)
            .collect()
    }

    /// Non-folded seats still contesting the pot.
    pub fn contenders(&self) -> Vec<SeatIndex> {
        self.players
            .iter()
            .filter(|p| p.in_hand())
            .map(|p| p.seat)
            .collect()
    }

    /// Seats that may still be asked to act this street.
    pub fn actors(&self) -> Vec<SeatIndex> {
        self.players
            .iter()
            .filter(|p| p.can_act())
            .map(|p| p.seat)
            .collect()
    }

    pub fn to_call(&self, seat: SeatIndex) -> Chips {
        self.current_bet
            .saturating_sub(self.players[seat].current_bet)
    }

    /// Next seat clockwise from `from` that satisfies `pred`.
    pub fn next_seat_where<F>(&self, from: SeatIndex, pred: F) -> Option<SeatIndex>
    where
        F: Fn(&HandPlayer) -> bool,
    {
        (1..=MAX_PLAYERS)
            .map(|step| (from + step) % MAX_PLAYERS)
            .find(|&seat| pred(&self.players[seat]))
    }

    /// Sum of all chips tracked by this state. Constant within a hand
    /// until winnings are paid out (chip conservation).
    pub fn total_chips(&self) -> Chips {
        let stacks: Chips = self.players.iter().map(|p| p.chips).sum();
        let sides: Chips = self.side_pots.iter().map(|sp| sp.amount).sum();
        stacks + self.pot + sides
    }

    /// True when every non-folded, non-all-in player has acted and
    /// matched the street high water: the betting round is closed.
    pub fn betting_round_closed(&self) -> bool {
        self.players
            .iter()
            .filter(|p| p.can_act())
            .all(|p| p.has_acted && p.current_bet == self.current_bet)
    }
}

impl InvariantCheck for GameState {
    fn validate_invariants(&self) -> Result<(), EngineError> {
        if self.players.len() != MAX_PLAYERS {
            return Err(EngineError::InvariantViolation("player array is not 6 seats"));
        }
        for p in &self.players {
            if !matches!(p.hole_cards.len(), 0 | 4) {
                return Err(EngineError::InvariantViolation("hole cards must be 0 or 4"));
            }
        }
        if !matches!(self.community_cards.len(), 0 | 3 | 4 | 5) {
            return Err(EngineError::InvariantViolation("board must hold 0/3/4/5 cards"));
        }
        if let Some(seat) = self.current_player {
            let p = &self.players[seat];
            if p.folded || p.is_all_in || p.is_sitting_out {
                return Err(EngineError::InvariantViolation(
                    "acting player is folded, all-in or sitting out",
                ));
            }
        }
        for sp in &self.side_pots {
            for &seat in &sp.eligible {
                if self.players[seat].folded {
                    return Err(EngineError::InvariantViolation(
                        "folded seat in side pot eligibility",
                    ));
                }
            }
        }
        Ok(())
    }
}
