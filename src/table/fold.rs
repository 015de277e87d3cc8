use tracing::debug;

use crate::engine::apply::{fold_seat, ActionOutcome};
use crate::engine::errors::ActionError;
use crate::engine::state::GameState;
use crate::engine::types::SeatIndex;

const LOG_TARGET: &str = "plo_server::table::fold";

/// Out-of-band fold on behalf of a seat that is not submitting it over
/// its own transport (departed, disconnected, deferred early fold).
pub struct FoldRequest {
    pub seat: SeatIndex,
    pub player_id: String,
    pub was_current_player: bool,
}

/// Apply the fold through the engine. `requires_advance` is true when
/// the fold vacated the acting turn and the caller must drive the game
/// on; observers still see a normal `game:action_taken` fold either way.
pub fn process_fold(
    state: &GameState,
    req: &FoldRequest,
) -> Result<(GameState, ActionOutcome, bool), ActionError> {
    let (next, outcome, was_current) = fold_seat(state, req.seat)?;
    debug!(
        target: LOG_TARGET,
        seat = req.seat,
        player_id = %req.player_id,
        was_current,
        expected_current = req.was_current_player,
        "out-of-band fold applied"
    );
    Ok((next, outcome, was_current))
}

/// Fold for a seat whose player is already gone (no transport); used by
/// the turn controller when the acting seat cannot be reached.
pub fn process_silent_fold(
    state: &GameState,
    seat: SeatIndex,
) -> Result<(GameState, ActionOutcome, bool), ActionError> {
    let (next, outcome, was_current) = fold_seat(state, seat)?;
    debug!(target: LOG_TARGET, seat, "silent fold for absent seat");
    Ok((next, outcome, was_current))
}
