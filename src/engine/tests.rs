#![cfg(test)]

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cards::Card;

use super::apply::apply_action;
use super::errors::{ActionError, InvariantCheck};
use super::legals::{bounds_for, valid_actions};
use super::showdown::settle;
use super::start::start_new_hand;
use super::state::GameState;
use super::types::*;

fn card(lit: &str) -> Card {
    lit.parse().unwrap()
}

fn cards(lits: &[&str]) -> Vec<Card> {
    lits.iter().map(|l| card(l)).collect()
}

/// Table with `n` live seats (0..n), the rest sitting out, before the
/// first hand. Dealer advance lands on seat 0.
fn table(n: usize, chips: Chips, sb: Chips, bb: Chips) -> GameState {
    let mut st = GameState::initial(chips, Blinds::new(sb, bb));
    for seat in n..MAX_PLAYERS {
        st.players[seat].is_sitting_out = true;
        st.players[seat].chips = 0;
    }
    st
}

fn start(st: &GameState, seed: u64) -> GameState {
    let mut rng = StdRng::seed_from_u64(seed);
    start_new_hand(st, &mut rng).unwrap()
}

fn act(st: &GameState, seat: SeatIndex, kind: ActionKind, amount: Chips) -> GameState {
    let (next, _) = apply_action(st, seat, kind, amount).unwrap();
    next
}

#[test]
fn start_posts_blinds_and_deals_four_cards_each() {
    let st = start(&table(3, 600, 1, 2), 1);
    assert_eq!(st.dealer_position, 0);
    assert_eq!(st.players[1].position, Some(Position::SmallBlind));
    assert_eq!(st.players[2].position, Some(Position::BigBlind));
    assert_eq!(st.players[1].current_bet, 1);
    assert_eq!(st.players[2].current_bet, 2);
    assert_eq!(st.pot, 3);
    assert_eq!(st.current_bet, 2);
    assert_eq!(st.min_raise, 2);
    assert_eq!(st.last_raiser, Some(2));
    for seat in 0..3 {
        assert_eq!(st.players[seat].hole_cards.len(), 4);
    }
    for seat in 3..MAX_PLAYERS {
        assert!(st.players[seat].hole_cards.is_empty());
    }
    // Opening actor is the seat left of the big blind.
    assert_eq!(st.current_player, Some(0));
    st.validate_invariants().unwrap();
}

#[test]
fn walkthrough_fold_to_showdown_conserves_chips() {
    // 3 seats, 600 each, blinds 1/2. UTG folds, SB calls, BB checks,
    // then everyone checks down to showdown.
    let st = start(&table(3, 600, 1, 2), 42);
    let initial_total = st.total_chips();
    assert_eq!(initial_total, 1800);

    let st = act(&st, 0, ActionKind::Fold, 0);
    let st = act(&st, 1, ActionKind::Call, 0);
    assert_eq!(st.pot, 4);
    let st = act(&st, 2, ActionKind::Check, 0);
    assert_eq!(st.current_street, Street::Flop);
    assert_eq!(st.community_cards.len(), 3);
    // Post-flop action starts left of the dealer.
    assert_eq!(st.current_player, Some(1));

    let st = act(&st, 1, ActionKind::Check, 0);
    let st = act(&st, 2, ActionKind::Check, 0);
    assert_eq!(st.current_street, Street::Turn);
    let st = act(&st, 1, ActionKind::Check, 0);
    let st = act(&st, 2, ActionKind::Check, 0);
    assert_eq!(st.current_street, Street::River);
    let st = act(&st, 1, ActionKind::Check, 0);
    let st = act(&st, 2, ActionKind::Check, 0);

    assert!(st.is_hand_complete);
    assert_eq!(st.current_street, Street::Showdown);
    let paid: Chips = st.winners.iter().map(|w| w.amount).sum();
    assert_eq!(paid, 4);
    assert_eq!(st.total_chips(), initial_total);
    assert_eq!(st.pot, 0);
}

#[test]
fn pot_limit_raise_tree_matches_formula() {
    // UTG raise bounds 4..=7 (pot 3, to-call 2); after a raise of 7,
    // SB faces call 6 with raise bounds 11..=22 in additional chips
    // (min-raise is now 5).
    let st = start(&table(3, 600, 1, 2), 7);
    let utg = valid_actions(&st, 0);
    let raise = bounds_for(&utg, ActionKind::Raise).unwrap();
    assert_eq!((raise.min, raise.max), (4, 7));
    let call = bounds_for(&utg, ActionKind::Call).unwrap();
    assert_eq!((call.min, call.max), (2, 2));

    let st = act(&st, 0, ActionKind::Raise, 7);
    assert_eq!(st.pot, 10);
    assert_eq!(st.current_bet, 7);
    assert_eq!(st.min_raise, 5);
    assert_eq!(st.last_raiser, Some(0));

    let sb = valid_actions(&st, 1);
    let call = bounds_for(&sb, ActionKind::Call).unwrap();
    assert_eq!((call.min, call.max), (6, 6));
    let raise = bounds_for(&sb, ActionKind::Raise).unwrap();
    assert_eq!(raise.min, 11); // raise-to 12
    assert_eq!(raise.max, 22); // call 6 plus pot-after-call 16

    let st = act(&st, 1, ActionKind::Raise, 22);
    assert_eq!(st.players[1].current_bet, 23);
    assert_eq!(st.pot, 32);
    assert_eq!(st.min_raise, 16);
}

#[test]
fn unopened_bet_is_pot_capped() {
    let st = start(&table(3, 600, 1, 2), 9);
    let st = act(&st, 0, ActionKind::Call, 0);
    let st = act(&st, 1, ActionKind::Call, 0);
    let st = act(&st, 2, ActionKind::Check, 0);
    assert_eq!(st.current_street, Street::Flop);
    assert_eq!(st.pot, 6);

    let first = valid_actions(&st, 1);
    assert!(bounds_for(&first, ActionKind::Check).is_some());
    let bet = bounds_for(&first, ActionKind::Bet).unwrap();
    assert_eq!((bet.min, bet.max), (2, 6));
}

#[test]
fn short_all_in_does_not_reopen_action() {
    // Seat 0 bets the pot on the flop; seat 1 shoves 10, short of the
    // full raise to 12. Seat 0 already acted and may only call or fold;
    // seat 2 has not acted since the bet and may still raise.
    let st = start(&table(3, 600, 1, 2), 3);
    let st = act(&st, 0, ActionKind::Call, 0);
    let st = act(&st, 1, ActionKind::Call, 0);
    let st = act(&st, 2, ActionKind::Check, 0);
    assert_eq!(st.current_street, Street::Flop);
    assert_eq!(st.pot, 6);

    let st = act(&st, 1, ActionKind::Check, 0);
    let st = act(&st, 2, ActionKind::Check, 0);
    let st = act(&st, 0, ActionKind::Bet, 6);
    assert_eq!(st.min_raise, 6);

    // Shrink seat 1's stack so the shove cannot make a full raise.
    let mut st = st;
    st.players[1].chips = 10;
    let shove = bounds_for(&valid_actions(&st, 1), ActionKind::Allin)
        .copied()
        .unwrap();
    assert_eq!(shove.max, 10);
    let st = act(&st, 1, ActionKind::Allin, 0);
    assert_eq!(st.current_bet, 10);
    assert!(st.players[1].is_all_in);
    assert_eq!(st.min_raise, 6, "short shove must not move the min-raise");
    assert_eq!(st.last_raiser, Some(0));

    // Seat 2 has not acted since the bet: raising is open.
    let seat2 = valid_actions(&st, 2);
    assert!(bounds_for(&seat2, ActionKind::Raise).is_some());
    let st = act(&st, 2, ActionKind::Call, 0);

    // Back on seat 0, who already acted: call or fold only.
    assert_eq!(st.current_player, Some(0));
    let seat0 = valid_actions(&st, 0);
    let call = bounds_for(&seat0, ActionKind::Call).unwrap();
    assert_eq!(call.max, 4);
    assert!(bounds_for(&seat0, ActionKind::Raise).is_none());
    assert!(bounds_for(&seat0, ActionKind::Allin).is_none());
    assert!(bounds_for(&seat0, ActionKind::Fold).is_some());
}

#[test]
fn full_raise_reopens_action() {
    let st = start(&table(3, 600, 1, 2), 3);
    let st = act(&st, 0, ActionKind::Raise, 7);
    let st = act(&st, 1, ActionKind::Raise, 22);
    // Seat 0's action was reopened by the full raise.
    let st = act(&st, 2, ActionKind::Fold, 0);
    assert_eq!(st.current_player, Some(0));
    let seat0 = valid_actions(&st, 0);
    assert!(bounds_for(&seat0, ActionKind::Raise).is_some());
}

#[test]
fn heads_up_button_acts_first_preflop_big_blind_first_postflop() {
    let st = start(&table(2, 600, 1, 2), 5);
    assert_eq!(st.dealer_position, 0);
    assert_eq!(st.players[0].position, Some(Position::Button));
    assert_eq!(st.players[0].current_bet, 1, "button posts the small blind");
    assert_eq!(st.players[1].current_bet, 2);
    assert_eq!(st.current_player, Some(0));

    let st = act(&st, 0, ActionKind::Call, 0);
    let st = act(&st, 1, ActionKind::Check, 0);
    assert_eq!(st.current_street, Street::Flop);
    assert_eq!(st.current_player, Some(1), "big blind first postflop");
}

#[test]
fn short_blind_posts_all_in_and_hand_still_plays() {
    let mut base = table(3, 600, 5, 10);
    base.players[2].chips = 4; // big blind seat cannot cover the blind
    let st = start(&base, 8);
    assert!(st.players[2].is_all_in);
    assert_eq!(st.players[2].current_bet, 4);
    assert_eq!(st.current_bet, 10, "high water stays at the full big blind");
    assert_eq!(st.current_player, Some(0));
    st.validate_invariants().unwrap();
}

#[test]
fn blinds_all_in_runs_board_out_immediately() {
    let mut base = table(2, 600, 1, 2);
    base.players[0].chips = 1;
    base.players[1].chips = 2;
    let st = start(&base, 13);
    assert!(st.is_hand_complete);
    assert_eq!(st.community_cards.len(), 5);
    assert_eq!(st.current_street, Street::Showdown);
    assert_eq!(st.total_chips(), 3);
    let paid: Chips = st.winners.iter().map(|w| w.amount).sum();
    assert_eq!(paid, 3);
}

#[test]
fn three_way_all_in_preflop_builds_side_pots() {
    let mut base = table(3, 600, 1, 2);
    base.players[0].chips = 300;
    base.players[1].chips = 100;
    base.players[2].chips = 600;
    let total = 1000;
    // Pot-limit keeps the opening sizes small, so drive the pot up with
    // successive maximum raises until every stack is in.
    let mut st = start(&base, 21);
    for _ in 0..50 {
        if st.is_hand_complete {
            break;
        }
        let seat = st.current_player.unwrap();
        let legal = valid_actions(&st, seat);
        if let Some(a) = bounds_for(&legal, ActionKind::Allin).copied() {
            st = act(&st, seat, ActionKind::Allin, a.max);
        } else if let Some(r) = bounds_for(&legal, ActionKind::Raise).copied() {
            st = act(&st, seat, ActionKind::Raise, r.max);
        } else if let Some(c) = bounds_for(&legal, ActionKind::Call).copied() {
            st = act(&st, seat, ActionKind::Call, c.max);
        } else {
            st = act(&st, seat, ActionKind::Check, 0);
        }
    }
    assert!(st.is_hand_complete);
    assert_eq!(st.total_chips(), total);
    let paid: Chips = st.winners.iter().map(|w| w.amount).sum();
    let stacks: Chips = st.players.iter().map(|p| p.chips).sum();
    assert_eq!(stacks, total);
    assert!(paid > 0);
}

#[test]
fn apply_action_is_deterministic() {
    let st = start(&table(3, 600, 1, 2), 99);
    let a = act(&st, 0, ActionKind::Raise, 7);
    let b = act(&st, 0, ActionKind::Raise, 7);
    assert_eq!(a, b);
}

#[test]
fn rejected_action_leaves_state_untouched() {
    let st = start(&table(3, 600, 1, 2), 99);
    let before = st.clone();
    assert_eq!(
        apply_action(&st, 1, ActionKind::Call, 0).unwrap_err(),
        ActionError::NotPlayersTurn(1)
    );
    assert_eq!(
        apply_action(&st, 0, ActionKind::Check, 0).unwrap_err(),
        ActionError::IllegalAction
    );
    assert_eq!(
        apply_action(&st, 0, ActionKind::Raise, 99).unwrap_err(),
        ActionError::AmountOutOfBounds {
            amount: 99,
            min: 4,
            max: 7
        }
    );
    assert_eq!(st, before);
}

#[test]
fn acting_player_is_always_live() {
    let mut st = start(&table(4, 600, 1, 2), 17);
    for _ in 0..40 {
        if st.is_hand_complete {
            break;
        }
        let seat = st.current_player.unwrap();
        let p = st.player(seat);
        assert!(!p.folded && !p.is_all_in && !p.is_sitting_out);
        st.validate_invariants().unwrap();
        let legal = valid_actions(&st, seat);
        let kind = if bounds_for(&legal, ActionKind::Check).is_some() {
            ActionKind::Check
        } else {
            ActionKind::Call
        };
        st = act(&st, seat, kind, 0);
    }
    assert!(st.is_hand_complete);
}

#[test]
fn fold_out_awards_pot_without_showdown() {
    let st = start(&table(3, 600, 1, 2), 31);
    let st = act(&st, 0, ActionKind::Fold, 0);
    let st = act(&st, 1, ActionKind::Fold, 0);
    assert!(st.is_hand_complete);
    assert_eq!(st.winners.len(), 1);
    assert_eq!(st.winners[0].seat, 2);
    assert_eq!(st.winners[0].amount, 3);
    assert!(st.winners[0].hand_name.is_none());
    assert_eq!(st.community_cards.len(), 0, "no board on a fold-out");
}

#[test]
fn odd_chip_goes_to_first_tied_winner_left_of_dealer() {
    // Seats 1 and 2 tie with the same ace-high straight; seat 3's folded
    // chip makes the first layer odd. Dealer is seat 0, so seat 1 is
    // first in the clockwise scan and collects the remainder.
    let mut st = GameState::initial(0, Blinds::new(1, 2));
    st.dealer_position = 0;
    st.current_street = Street::Showdown;
    st.community_cards = cards(&["Qs", "Jd", "Th", "9c", "8d"]);
    for seat in [1, 2] {
        st.players[seat].total_bet_this_round = 2;
    }
    st.players[1].hole_cards = cards(&["Ah", "Kd", "2c", "3c"]);
    st.players[2].hole_cards = cards(&["Ad", "Ks", "2d", "3d"]);
    st.players[3].hole_cards = cards(&["7h", "6h", "2s", "3s"]);
    st.players[3].total_bet_this_round = 1;
    st.players[3].folded = true;
    for seat in [0, 4, 5] {
        st.players[seat].is_sitting_out = true;
    }
    st.pot = 5;

    settle(&mut st);
    assert!(st.is_hand_complete);
    let by_seat: Vec<(SeatIndex, Chips)> =
        st.winners.iter().map(|w| (w.seat, w.amount)).collect();
    assert_eq!(by_seat, vec![(1, 3), (2, 2)]);
    assert_eq!(st.winners[0].hand_name.as_deref(), Some("Straight"));
}

#[test]
fn odd_chip_scan_starts_left_of_the_dealer() {
    // Same tie, dealer moved to seat 1: now seat 2 is scanned first.
    let mut st = GameState::initial(0, Blinds::new(1, 2));
    st.dealer_position = 1;
    st.current_street = Street::Showdown;
    st.community_cards = cards(&["Qs", "Jd", "Th", "9c", "8d"]);
    for seat in [1, 2] {
        st.players[seat].total_bet_this_round = 2;
    }
    st.players[1].hole_cards = cards(&["Ah", "Kd", "2c", "3c"]);
    st.players[2].hole_cards = cards(&["Ad", "Ks", "2d", "3d"]);
    st.players[3].hole_cards = cards(&["7h", "6h", "2s", "3s"]);
    st.players[3].total_bet_this_round = 1;
    st.players[3].folded = true;
    for seat in [0, 4, 5] {
        st.players[seat].is_sitting_out = true;
    }
    st.pot = 5;

    settle(&mut st);
    let by_seat: Vec<(SeatIndex, Chips)> =
        st.winners.iter().map(|w| (w.seat, w.amount)).collect();
    assert_eq!(by_seat, vec![(1, 2), (2, 3)]);
}

#[test]
fn total_bet_never_decreases_within_a_hand() {
    let mut st = start(&table(3, 600, 1, 2), 55);
    let mut floor: Vec<Chips> = st.players.iter().map(|p| p.total_bet_this_round).collect();
    for _ in 0..40 {
        if st.is_hand_complete {
            break;
        }
        let seat = st.current_player.unwrap();
        let legal = valid_actions(&st, seat);
        let next = if let Some(r) = bounds_for(&legal, ActionKind::Raise).copied() {
            act(&st, seat, ActionKind::Raise, r.min)
        } else if bounds_for(&legal, ActionKind::Check).is_some() {
            act(&st, seat, ActionKind::Check, 0)
        } else {
            act(&st, seat, ActionKind::Call, 0)
        };
        for (seat, p) in next.players.iter().enumerate() {
            assert!(p.total_bet_this_round >= floor[seat]);
            floor[seat] = p.total_bet_this_round;
        }
        st = next;
    }
}
