use serde::{Deserialize, Serialize};

use super::state::GameState;
use super::types::{ActionKind, Chips, SeatIndex};

/// One legal action with its pot-limit bounds. For `bet` and `raise` the
/// amounts are the chips the player adds with the action; `call` is the
/// clamped price to call; `allin` is the whole remaining stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidAction {
    pub kind: ActionKind,
    pub min: Chips,
    pub max: Chips,
}

impl ValidAction {
    fn fixed(kind: ActionKind, amount: Chips) -> Self {
        Self {
            kind,
            min: amount,
            max: amount,
        }
    }
}

/// Legal actions for the acting seat under pot-limit rules. Empty for
/// anyone who is not the acting player.
pub fn valid_actions(state: &GameState, seat: SeatIndex) -> Vec<ValidAction> {
    if state.is_hand_complete || state.current_player != Some(seat) {
        return Vec::new();
    }
    let p = state.player(seat);
    if !p.can_act() {
        return Vec::new();
    }

    let to_call = state.to_call(seat);
    let chips = p.chips;
    let mut out = Vec::new();

    out.push(ValidAction::fixed(ActionKind::Fold, 0));

    // Pot-limit ceiling in additional chips: pot-sized open, or
    // call plus the pot after the call.
    let pot_limit = if to_call == 0 {
        state.pot
    } else {
        to_call + (state.pot + to_call)
    };

    if to_call == 0 {
        out.push(ValidAction::fixed(ActionKind::Check, 0));
        let min = state.big_blind.min(chips);
        let max = state.pot.min(chips);
        if max >= min && max > 0 {
            out.push(ValidAction {
                kind: ActionKind::Bet,
                min,
                max,
            });
        }
    } else {
        out.push(ValidAction::fixed(ActionKind::Call, to_call.min(chips)));
        // A raise is only open to players the action has been reopened
        // for; a seat that already acted and faces a short all-in may
        // only call or fold.
        if !p.has_acted && chips > to_call {
            let min = state.current_bet + state.min_raise - p.current_bet;
            let max = pot_limit.min(chips);
            if max >= min {
                out.push(ValidAction {
                    kind: ActionKind::Raise,
                    min,
                    max,
                });
            }
        }
    }

    // An explicit shove is offered whenever the whole stack fits under
    // the pot limit; deeper stacks reach the cap through bet/raise.
    if chips > 0 && chips <= pot_limit {
        let shove_is_reraise = to_call > 0 && chips > to_call && p.has_acted;
        if !shove_is_reraise {
            out.push(ValidAction::fixed(ActionKind::Allin, chips));
        }
    }

    out
}

/// Bounds lookup for one action kind.
pub fn bounds_for(actions: &[ValidAction], kind: ActionKind) -> Option<&ValidAction> {
    actions.iter().find(|a| a.kind == kind)
}
