use std::collections::HashMap;

use crate::cards::{best_omaha_hand, EvaluatedHand};

use super::pots::calculate_side_pots;
use super::state::GameState;
use super::types::{Chips, SeatIndex, Winner, MAX_PLAYERS};

/// Settle the hand: award the pot to the last contender, or evaluate the
/// PLO showdown and split every pot layer among the best eligible hands.
/// Pays stacks, fills `winners` and marks the hand complete.
pub fn settle(st: &mut GameState) {
    st.current_player = None;
    let contenders = st.contenders();

    if contenders.len() == 1 {
        let seat = contenders[0];
        let amount = st.pot;
        st.players[seat].chips += amount;
        st.pot = 0;
        st.side_pots.clear();
        st.winners = vec![Winner {
            seat,
            amount,
            hand_name: None,
            cards: Vec::new(),
        }];
        st.is_hand_complete = true;
        return;
    }

    debug_assert_eq!(st.community_cards.len(), 5, "showdown needs a full board");
    let evals: HashMap<SeatIndex, EvaluatedHand> = contenders
        .iter()
        .map(|&seat| {
            (
                seat,
                best_omaha_hand(&st.players[seat].hole_cards, &st.community_cards),
            )
        })
        .collect();

    let pots = calculate_side_pots(&st.players);
    let mut payouts: HashMap<SeatIndex, Chips> = HashMap::new();
    for pot in &pots {
        let best = pot
            .eligible
            .iter()
            .map(|seat| evals[seat].score)
            .max()
            .expect("side pot with no eligible seat");
        // Tied winners in clockwise order from the dealer; the first one
        // collects the odd-chip remainder.
        let mut tied: Vec<SeatIndex> = pot
            .eligible
            .iter()
            .copied()
            .filter(|seat| evals[seat].score == best)
            .collect();
        tied.sort_by_key(|&seat| (seat + MAX_PLAYERS - st.dealer_position - 1) % MAX_PLAYERS);

        let share = pot.amount / tied.len() as Chips;
        let remainder = pot.amount % tied.len() as Chips;
        for (i, &seat) in tied.iter().enumerate() {
            let amount = share + if i == 0 { remainder } else { 0 };
            *payouts.entry(seat).or_default() += amount;
        }
    }

    let mut winners: Vec<Winner> = payouts
        .into_iter()
        .map(|(seat, amount)| {
            let eval = &evals[&seat];
            Winner {
                seat,
                amount,
                hand_name: Some(eval.category.display_name().to_string()),
                cards: eval.cards.to_vec(),
            }
        })
        .collect();
    winners.sort_by_key(|w| w.seat);

    for w in &winners {
        st.players[w.seat].chips += w.amount;
    }
    st.pot = 0;
    st.side_pots.clear();
    st.winners = winners;
    st.is_hand_complete = true;
}
