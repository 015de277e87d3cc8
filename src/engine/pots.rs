use super::types::{Chips, HandPlayer, SidePot};

/// Layer the pot by stack depth. Distinct non-zero street contributions
/// (folded seats included) form the tiers; each tier's amount counts
/// every seat that contributed at least that deep. Folded chips stay in
/// the layers but folded seats are never eligible.
///
/// Invariant: the layer amounts sum to the total contributed, and every
/// eligibility list is a subset of the non-folded seats.
pub fn calculate_side_pots(players: &[HandPlayer]) -> Vec<SidePot> {
    let mut levels: Vec<Chips> = players
        .iter()
        .map(|p| p.total_bet_this_round)
        .filter(|&c| c > 0)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let mut pots = Vec::with_capacity(levels.len());
    let mut prev: Chips = 0;
    for level in levels {
        let tier = level - prev;
        let contributors = players
            .iter()
            .filter(|p| p.total_bet_this_round >= level)
            .count() as Chips;
        let eligible: Vec<usize> = players
            .iter()
            .filter(|p| p.total_bet_this_round >= level && p.in_hand())
            .map(|p| p.seat)
            .collect();
        pots.push(SidePot {
            amount: tier * contributors,
            eligible,
        });
        prev = level;
    }
    pots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use crate::engine::types::HandPlayer;

    fn contender(seat: usize, total: Chips) -> HandPlayer {
        let mut p = HandPlayer::active(seat, format!("p{seat}"), 0);
        p.total_bet_this_round = total;
        p.hole_cards = hole();
        p
    }

    fn folded(seat: usize, total: Chips) -> HandPlayer {
        let mut p = contender(seat, total);
        p.folded = true;
        p
    }

    fn hole() -> Vec<Card> {
        ["Ah", "Kh", "Qh", "Jh"].iter().map(|c| c.parse().unwrap()).collect()
    }

    #[test]
    fn three_way_all_in_layers() {
        let players = vec![contender(0, 100), contender(1, 50), contender(2, 100)];
        let pots = calculate_side_pots(&players);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 150);
        assert_eq!(pots[0].eligible, vec![0, 1, 2]);
        assert_eq!(pots[1].amount, 100);
        assert_eq!(pots[1].eligible, vec![0, 2]);
    }

    #[test]
    fn amounts_sum_to_total_contributions() {
        let players = vec![
            contender(0, 75),
            contender(1, 200),
            folded(2, 30),
            contender(3, 200),
        ];
        let pots = calculate_side_pots(&players);
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 75 + 200 + 30 + 200);
    }

    #[test]
    fn folded_chips_confer_no_eligibility() {
        let players = vec![contender(0, 100), folded(1, 100), contender(2, 100)];
        let pots = calculate_side_pots(&players);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 300);
        assert_eq!(pots[0].eligible, vec![0, 2]);
    }

    #[test]
    fn uncalled_overbet_forms_a_private_layer() {
        // Seat 0 bet past seat 1's stack; the excess comes back to seat 0
        // as a layer only it is eligible for.
        let players = vec![contender(0, 120), contender(1, 80)];
        let pots = calculate_side_pots(&players);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[1].amount, 40);
        assert_eq!(pots[1].eligible, vec![0]);
    }
}
