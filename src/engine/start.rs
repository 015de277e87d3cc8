use rand::rngs::StdRng;

use crate::cards::Deck;

use super::apply::run_out_and_settle;
use super::errors::EngineError;
use super::state::GameState;
use super::types::{
    Chips, HandAction, NormalizedAction, Position, SeatIndex, Street,
};

const HOLE_CARDS: usize = 4;

/// Start the next hand from the previous table state. Carries over
/// stacks, names and sitting-out flags; everything per-hand is reset.
///
/// Heads-up follows the BTN = SB rule: the dealer posts the small blind
/// and acts first preflop. If every dealt-in seat is already all-in from
/// the blinds, the board is dealt to five and the hand settles at once.
pub fn start_new_hand(prev: &GameState, rng: &mut StdRng) -> Result<GameState, EngineError> {
    let mut st = prev.clone();

    for p in &mut st.players {
        p.hole_cards.clear();
        p.position = None;
        p.current_bet = 0;
        p.total_bet_this_round = 0;
        p.folded = false;
        p.is_all_in = false;
        p.has_acted = false;
    }
    st.community_cards.clear();
    st.pot = 0;
    st.side_pots.clear();
    st.current_street = Street::Preflop;
    st.current_bet = 0;
    st.min_raise = st.big_blind;
    st.last_full_raise_bet = 0;
    st.last_raiser = None;
    st.hand_history.clear();
    st.is_hand_complete = false;
    st.winners.clear();
    st.current_player = None;

    let dealer = st
        .next_seat_where(prev.dealer_position, |p| !p.is_sitting_out && p.chips > 0)
        .ok_or(EngineError::NotEnoughPlayers)?;
    st.dealer_position = dealer;

    // Dealt-in seats in clockwise order starting from the dealer.
    let mut order: Vec<SeatIndex> = vec![dealer];
    let mut cursor = dealer;
    while let Some(next) = st.next_seat_where(cursor, |p| !p.is_sitting_out && p.chips > 0) {
        if next == dealer {
            break;
        }
        order.push(next);
        cursor = next;
    }
    if order.len() < 2 {
        return Err(EngineError::NotEnoughPlayers);
    }

    let heads_up = order.len() == 2;
    let (sb_seat, bb_seat) = if heads_up {
        (order[0], order[1])
    } else {
        (order[1], order[2])
    };

    assign_positions(&mut st, &order, heads_up);
    let (sb, bb) = (st.small_blind, st.big_blind);
    post_blind(&mut st, sb_seat, sb, false);
    post_blind(&mut st, bb_seat, bb, true);

    // Deal clockwise starting left of the dealer, dealer last.
    let mut deck = Deck::shuffled(rng);
    for step in 1..=order.len() {
        let seat = order[step % order.len()];
        st.players[seat].hole_cards = deck.deal(HOLE_CARDS);
    }
    st.deck = deck.undealt().to_vec();

    st.current_bet = st.big_blind;
    st.min_raise = st.big_blind;
    st.last_full_raise_bet = st.big_blind;
    st.last_raiser = Some(bb_seat);

    // Opening actor: heads-up the dealer (BTN/SB) speaks first, otherwise
    // the first seat able to act clockwise from the big blind.
    let opener = if heads_up && st.players[dealer].can_act() {
        Some(dealer)
    } else {
        let from = if heads_up { dealer } else { bb_seat };
        st.next_seat_where(from, |p| p.can_act())
    };

    match opener {
        Some(seat) => st.current_player = Some(seat),
        None => run_out_and_settle(&mut st),
    }
    Ok(st)
}

fn assign_positions(st: &mut GameState, order: &[SeatIndex], heads_up: bool) {
    if heads_up {
        st.players[order[0]].position = Some(Position::Button);
        st.players[order[1]].position = Some(Position::BigBlind);
        return;
    }
    let names = [
        Position::Button,
        Position::SmallBlind,
        Position::BigBlind,
        Position::UnderTheGun,
        Position::Hijack,
        Position::Cutoff,
    ];
    for (i, &seat) in order.iter().enumerate() {
        st.players[seat].position = Some(names[i]);
    }
}

/// Post a blind clamped to the stack. A short blind puts the seat all-in
/// without counting as a raise.
fn post_blind(st: &mut GameState, seat: SeatIndex, blind: Chips, big: bool) {
    let amount = blind.min(st.players[seat].chips);
    let p = &mut st.players[seat];
    p.chips -= amount;
    p.current_bet += amount;
    p.total_bet_this_round += amount;
    if p.chips == 0 {
        p.is_all_in = true;
    }
    st.pot += amount;
    let action = if big {
        NormalizedAction::PostBigBlind { amount }
    } else {
        NormalizedAction::PostSmallBlind { amount }
    };
    st.hand_history.push(HandAction {
        street: Street::Preflop,
        seat,
        action,
    });
}
