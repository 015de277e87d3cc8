use serde::{Deserialize, Serialize};

use crate::cards::Card;

pub type Chips = u64;
pub type SeatIndex = usize; // 0..5

pub const MAX_PLAYERS: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    /// Community cards on the board once this street is dealt.
    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River | Street::Showdown => 5,
        }
    }

    pub fn for_board_len(n: usize) -> Street {
        match n {
            0 => Street::Preflop,
            3 => Street::Flop,
            4 => Street::Turn,
            5 => Street::River,
            _ => panic!("no street has a {n}-card board"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "BTN")]
    Button,
    #[serde(rename = "SB")]
    SmallBlind,
    #[serde(rename = "BB")]
    BigBlind,
    #[serde(rename = "UTG")]
    UnderTheGun,
    #[serde(rename = "HJ")]
    Hijack,
    #[serde(rename = "CO")]
    Cutoff,
}

/// Kind of action a client may submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    Allin,
}

/// Per-seat engine state for one hand. Distinct from the table-layer
/// `Seat`: this is the dealt-in view the betting machine operates on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPlayer {
    pub seat: SeatIndex,
    pub display_name: String,
    pub position: Option<Position>,
    pub chips: Chips,
    pub hole_cards: Vec<Card>, // 0 or 4
    pub current_bet: Chips,    // committed this street
    pub total_bet_this_round: Chips, // committed this hand; side-pot math
    pub folded: bool,
    pub is_all_in: bool,
    pub has_acted: bool, // this street
    pub is_sitting_out: bool,
}

impl HandPlayer {
    pub fn sitting_out(seat: SeatIndex) -> Self {
        Self {
            seat,
            display_name: String::new(),
            position: None,
            chips: 0,
            hole_cards: Vec::new(),
            current_bet: 0,
            total_bet_this_round: 0,
            folded: false,
            is_all_in: false,
            has_acted: false,
            is_sitting_out: true,
        }
    }

    pub fn active(seat: SeatIndex, display_name: impl Into<String>, chips: Chips) -> Self {
        Self {
            seat,
            display_name: display_name.into(),
            position: None,
            chips,
            hole_cards: Vec::new(),
            current_bet: 0,
            total_bet_this_round: 0,
            folded: false,
            is_all_in: false,
            has_acted: false,
            is_sitting_out: false,
        }
    }

    /// Dealt into the current hand and still contesting the pot.
    pub fn in_hand(&self) -> bool {
        !self.is_sitting_out && !self.folded && !self.hole_cards.is_empty()
    }

    /// May still be asked to act on the current street.
    pub fn can_act(&self) -> bool {
        self.in_hand() && !self.is_all_in
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePot {
    pub amount: Chips,
    pub eligible: Vec<SeatIndex>, // non-folded seats contesting this layer
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub seat: SeatIndex,
    pub amount: Chips,
    pub hand_name: Option<String>, // None when everyone else folded
    pub cards: Vec<Card>,          // winning five, empty on fold-out
}

/// Engine-normalized form of an applied action, recorded in the hand log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedAction {
    PostSmallBlind { amount: Chips },
    PostBigBlind { amount: Chips },
    Fold,
    Check,
    Call { amount: Chips, full_call: bool },
    Bet { to: Chips },
    Raise { to: Chips, raise_by: Chips, full_raise: bool },
    AllInCall { amount: Chips },
    AllInBet { to: Chips },
    AllInRaise { to: Chips, raise_by: Chips, full_raise: bool },
}

impl NormalizedAction {
    /// Wire form for `game:action_taken`; blind posts are not actions.
    pub fn wire_form(&self) -> Option<(ActionKind, Chips)> {
        match self {
            NormalizedAction::PostSmallBlind { .. } | NormalizedAction::PostBigBlind { .. } => None,
            NormalizedAction::Fold => Some((ActionKind::Fold, 0)),
            NormalizedAction::Check => Some((ActionKind::Check, 0)),
            NormalizedAction::Call { amount, .. } => Some((ActionKind::Call, *amount)),
            NormalizedAction::Bet { to } => Some((ActionKind::Bet, *to)),
            NormalizedAction::Raise { to, .. } => Some((ActionKind::Raise, *to)),
            NormalizedAction::AllInCall { amount } => Some((ActionKind::Allin, *amount)),
            NormalizedAction::AllInBet { to } | NormalizedAction::AllInRaise { to, .. } => {
                Some((ActionKind::Allin, *to))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandAction {
    pub street: Street,
    pub seat: SeatIndex,
    pub action: NormalizedAction,
}

/// Blind sizes for a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blinds {
    pub small_blind: Chips,
    pub big_blind: Chips,
}

impl Blinds {
    pub fn new(small_blind: Chips, big_blind: Chips) -> Self {
        Self {
            small_blind,
            big_blind,
        }
    }
}
