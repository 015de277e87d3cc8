use super::types::{Chips, SeatIndex};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("seat {0} is not the acting player")]
    NotPlayersTurn(SeatIndex),
    #[error("seat {0} cannot act")]
    ActorCannotAct(SeatIndex),
    #[error("hand is already complete")]
    HandComplete,
    #[error("action is not among the valid actions")]
    IllegalAction,
    #[error("cannot check facing a bet")]
    CannotCheckFacingBet,
    #[error("amount {amount} outside bounds {min}..={max}")]
    AmountOutOfBounds {
        amount: Chips,
        min: Chips,
        max: Chips,
    },
    #[error("big blind may not fold before acting preflop")]
    BigBlindEarlyFold,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("not enough players with chips to start a hand")]
    NotEnoughPlayers,
    #[error("invalid state transition: {0}")]
    InvalidTransition(&'static str),
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub trait InvariantCheck {
    fn validate_invariants(&self) -> Result<(), EngineError>;
}
