use crate::cards::Card;

use super::errors::ActionError;
use super::legals::{bounds_for, valid_actions};
use super::showdown::settle;
use super::state::GameState;
use super::types::{ActionKind, Chips, HandAction, NormalizedAction, SeatIndex, Street};

/// What an applied action did to the hand, for the turn controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub applied: HandAction,
    pub street_changed: bool,
    pub board_grew: bool,
    pub hand_complete: bool,
    pub went_to_showdown: bool,
}

/// Apply one action for the acting seat. Returns the successor state and
/// an outcome classification; the input state is never touched, so a
/// rejection is a true no-op for the caller.
pub fn apply_action(
    state: &GameState,
    seat: SeatIndex,
    kind: ActionKind,
    amount: Chips,
) -> Result<(GameState, ActionOutcome), ActionError> {
    if state.is_hand_complete {
        return Err(ActionError::HandComplete);
    }
    if state.current_player != Some(seat) {
        return Err(ActionError::NotPlayersTurn(seat));
    }
    if !state.player(seat).can_act() {
        return Err(ActionError::ActorCannotAct(seat));
    }

    let legal = valid_actions(state, seat);
    let bounds = *bounds_for(&legal, kind).ok_or(ActionError::IllegalAction)?;
    let added = match kind {
        ActionKind::Fold | ActionKind::Check => 0,
        // Call and all-in sizes are fixed by the state, not the client.
        ActionKind::Call | ActionKind::Allin => bounds.max,
        ActionKind::Bet | ActionKind::Raise => {
            if amount < bounds.min || amount > bounds.max {
                return Err(ActionError::AmountOutOfBounds {
                    amount,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
            amount
        }
    };

    let mut st = state.clone();
    let prior_high = st.current_bet;
    let to_call = st.to_call(seat);

    let normalized = match kind {
        ActionKind::Fold => {
            st.players[seat].folded = true;
            st.players[seat].has_acted = true;
            NormalizedAction::Fold
        }
        ActionKind::Check => {
            st.players[seat].has_acted = true;
            NormalizedAction::Check
        }
        _ => {
            commit(&mut st, seat, added);
            let p = &st.players[seat];
            let new_level = p.current_bet;
            let went_all_in = p.is_all_in;
            if new_level > prior_high {
                let raise_by = new_level - prior_high;
                let full_raise = raise_by >= st.min_raise;
                st.current_bet = new_level;
                if full_raise {
                    st.min_raise = raise_by;
                    st.last_full_raise_bet = new_level;
                    st.last_raiser = Some(seat);
                    // A full raise reopens the action for everyone else.
                    for other in &mut st.players {
                        if other.seat != seat && other.can_act() {
                            other.has_acted = false;
                        }
                    }
                }
                match kind {
                    ActionKind::Bet if !went_all_in => NormalizedAction::Bet { to: new_level },
                    ActionKind::Raise if !went_all_in => NormalizedAction::Raise {
                        to: new_level,
                        raise_by,
                        full_raise,
                    },
                    _ if prior_high == 0 => NormalizedAction::AllInBet { to: new_level },
                    _ => NormalizedAction::AllInRaise {
                        to: new_level,
                        raise_by,
                        full_raise,
                    },
                }
            } else if went_all_in {
                NormalizedAction::AllInCall { amount: added }
            } else {
                NormalizedAction::Call {
                    amount: added,
                    full_call: added == to_call,
                }
            }
        }
    };

    let applied = HandAction {
        street: st.current_street,
        seat,
        action: normalized,
    };
    st.hand_history.push(applied.clone());

    let board_before = st.community_cards.len();
    let mut outcome = ActionOutcome {
        applied,
        street_changed: false,
        board_grew: false,
        hand_complete: false,
        went_to_showdown: false,
    };
    resolve_turn(&mut st, seat, &mut outcome);
    outcome.board_grew = st.community_cards.len() > board_before;
    Ok((st, outcome))
}

/// Out-of-band fold for a seat that is not necessarily the acting player
/// (departed or disconnected seats). Same closure semantics as a normal
/// fold; `was_current` reports whether the fold vacated the acting turn.
pub fn fold_seat(
    state: &GameState,
    seat: SeatIndex,
) -> Result<(GameState, ActionOutcome, bool), ActionError> {
    if state.is_hand_complete {
        return Err(ActionError::HandComplete);
    }
    let p = state.player(seat);
    if !p.in_hand() {
        return Err(ActionError::ActorCannotAct(seat));
    }
    let was_current = state.current_player == Some(seat);

    let mut st = state.clone();
    st.players[seat].folded = true;
    st.players[seat].has_acted = true;
    let applied = HandAction {
        street: st.current_street,
        seat,
        action: NormalizedAction::Fold,
    };
    st.hand_history.push(applied.clone());

    let board_before = st.community_cards.len();
    let mut outcome = ActionOutcome {
        applied,
        street_changed: false,
        board_grew: false,
        hand_complete: false,
        went_to_showdown: false,
    };
    if was_current {
        resolve_turn(&mut st, seat, &mut outcome);
    } else if st.contenders().len() <= 1 {
        st.current_player = None;
        settle(&mut st);
        outcome.hand_complete = true;
    }
    outcome.board_grew = st.community_cards.len() > board_before;
    Ok((st, outcome, was_current))
}

fn commit(st: &mut GameState, seat: SeatIndex, added: Chips) {
    let p = &mut st.players[seat];
    debug_assert!(added <= p.chips);
    p.chips -= added;
    p.current_bet += added;
    p.total_bet_this_round += added;
    p.has_acted = true;
    if p.chips == 0 {
        p.is_all_in = true;
    }
    st.pot += added;
}

/// After a seat has acted: hand the turn on, close the street, run the
/// board out, or settle, whichever the state calls for.
fn resolve_turn(st: &mut GameState, seat: SeatIndex, outcome: &mut ActionOutcome) {
    if st.contenders().len() <= 1 {
        st.current_player = None;
        settle(st);
        outcome.hand_complete = true;
        return;
    }

    let high = st.current_bet;
    let next = st.next_seat_where(seat, |p| {
        p.can_act() && (!p.has_acted || p.current_bet < high)
    });
    match next {
        Some(actor) => st.current_player = Some(actor),
        None => advance_street(st, outcome),
    }
}

/// Betting round closed with the pot still contested.
fn advance_street(st: &mut GameState, outcome: &mut ActionOutcome) {
    st.current_player = None;

    if st.current_street == Street::River {
        st.current_street = Street::Showdown;
        settle(st);
        outcome.hand_complete = true;
        outcome.went_to_showdown = true;
        return;
    }

    // Fewer than two seats able to bet: no more betting is possible,
    // deal the remaining board and settle.
    if st.actors().len() < 2 {
        run_out_and_settle(st);
        outcome.hand_complete = true;
        outcome.went_to_showdown = true;
        outcome.street_changed = true;
        return;
    }

    reset_street(st);
    deal_next_street(st);
    outcome.street_changed = true;

    // Post-flop action starts at the first live seat left of the dealer.
    st.current_player = st.next_seat_where(st.dealer_position, |p| p.can_act());
    if st.current_player.is_none() {
        run_out_and_settle(st);
        outcome.hand_complete = true;
        outcome.went_to_showdown = true;
    }
}

fn reset_street(st: &mut GameState) {
    for p in &mut st.players {
        p.current_bet = 0;
        p.has_acted = false;
    }
    st.current_bet = 0;
    st.min_raise = st.big_blind;
    st.last_full_raise_bet = 0;
    st.last_raiser = None;
}

fn deal_next_street(st: &mut GameState) {
    let n = match st.community_cards.len() {
        0 => 3,
        3 | 4 => 1,
        _ => return,
    };
    let cards: Vec<Card> = st.deck.drain(..n).collect();
    st.community_cards.extend(cards);
    st.current_street = Street::for_board_len(st.community_cards.len());
}

/// Deal the board to five and settle at showdown. Used when no further
/// betting is possible (all-in runout) and from hand start when the
/// blinds already put everyone all-in.
pub fn run_out_and_settle(st: &mut GameState) {
    st.current_player = None;
    while st.community_cards.len() < 5 {
        deal_next_street(st);
    }
    st.current_street = Street::Showdown;
    settle(st);
}
