//! All-in expected-value collaborator.
//!
//! When betting closes with cards still to come, the table snapshots each
//! contender's expectation over the unrevealed board. The estimate rides
//! along on the hand history; a failure here must never block the hand.

use std::collections::HashMap;

use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::cards::{best_omaha_hand, Card, Deck};
use crate::engine::types::{Chips, SeatIndex};
use crate::engine::MAX_PLAYERS;

const LOG_TARGET: &str = "plo_server::equity";

/// One seat's cards as the all-in froze the action. Folded seats are
/// carried so their known cards can be removed from the sample space.
#[derive(Clone, Debug)]
pub struct EquityContender {
    pub seat: SeatIndex,
    pub hole_cards: Vec<Card>,
    pub folded: bool,
    /// Chips contributed this hand; determines pot layering.
    pub total_bet: Chips,
}

#[derive(Clone, Debug)]
pub struct EquityRequest {
    pub prior_board: Vec<Card>,
    pub players: Vec<EquityContender>,
}

/// Seat → expected chip profit (winnings minus contribution).
pub type EvProfits = HashMap<SeatIndex, i64>;

pub trait EquityEstimator: Send + Sync {
    fn all_in_ev_profits(&self, req: &EquityRequest) -> Result<EvProfits>;
}

/// Monte-Carlo estimator over the unseen deck. Every known card is
/// removed from the sample space: the prior board and all dealt hole
/// cards, folded ones included. Pots are split per sample exactly as
/// the showdown path splits them.
pub struct MonteCarloEquity {
    samples: u32,
    seed: Option<u64>,
}

impl MonteCarloEquity {
    pub fn new(samples: u32) -> Self {
        Self {
            samples,
            seed: None,
        }
    }

    pub fn with_seed(samples: u32, seed: u64) -> Self {
        Self {
            samples,
            seed: Some(seed),
        }
    }
}

impl Default for MonteCarloEquity {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl EquityEstimator for MonteCarloEquity {
    fn all_in_ev_profits(&self, req: &EquityRequest) -> Result<EvProfits> {
        let contenders: Vec<&EquityContender> =
            req.players.iter().filter(|p| !p.folded).collect();
        ensure!(contenders.len() >= 2, "equity needs at least two contenders");
        ensure!(req.prior_board.len() <= 5, "board already complete");
        for p in &contenders {
            ensure!(p.hole_cards.len() == 4, "contender without four hole cards");
        }

        let mut known: Vec<Card> = req.prior_board.clone();
        for p in &req.players {
            known.extend(p.hole_cards.iter().copied());
        }
        let mut unseen: Vec<Card> = Deck::new()
            .undealt()
            .iter()
            .copied()
            .filter(|c| !known.contains(c))
            .collect();

        let layers = pot_layers(&req.players);
        let missing = 5 - req.prior_board.len();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut winnings: HashMap<SeatIndex, u128> = HashMap::new();
        for _ in 0..self.samples {
            unseen.partial_shuffle(&mut rng, missing);
            let mut board = req.prior_board.clone();
            board.extend(unseen[..missing].iter().copied());

            let scores: HashMap<SeatIndex, _> = contenders
                .iter()
                .map(|p| (p.seat, best_omaha_hand(&p.hole_cards, &board).score))
                .collect();
            for (amount, eligible) in &layers {
                let best = eligible.iter().map(|s| scores[s]).max().unwrap();
                let tied: Vec<SeatIndex> = eligible
                    .iter()
                    .copied()
                    .filter(|s| scores[s] == best)
                    .collect();
                let share = amount / tied.len() as Chips;
                for seat in tied {
                    *winnings.entry(seat).or_default() += share as u128;
                }
            }
        }

        let mut out = EvProfits::new();
        for p in &contenders {
            let expected = (winnings.get(&p.seat).copied().unwrap_or(0)
                / self.samples as u128) as i64;
            out.insert(p.seat, expected - p.total_bet as i64);
        }
        tracing::debug!(
            target: LOG_TARGET,
            samples = self.samples,
            contenders = contenders.len(),
            "all-in EV estimated"
        );
        Ok(out)
    }
}

/// Pot layering by contribution depth, mirroring the side-pot rule:
/// folded chips count toward the layer amounts but not the eligibility.
fn pot_layers(players: &[EquityContender]) -> Vec<(Chips, Vec<SeatIndex>)> {
    let mut levels: Vec<Chips> = players
        .iter()
        .map(|p| p.total_bet)
        .filter(|&c| c > 0)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let mut layers = Vec::with_capacity(levels.len());
    let mut prev: Chips = 0;
    for level in levels {
        let tier = level - prev;
        let contributors = players.iter().filter(|p| p.total_bet >= level).count() as Chips;
        let eligible: Vec<SeatIndex> = players
            .iter()
            .filter(|p| p.total_bet >= level && !p.folded)
            .map(|p| p.seat)
            .collect();
        if !eligible.is_empty() {
            layers.push((tier * contributors, eligible));
        }
        prev = level;
    }
    debug_assert!(layers.len() <= MAX_PLAYERS);
    layers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(lits: &[&str]) -> Vec<Card> {
        lits.iter().map(|l| l.parse().unwrap()).collect()
    }

    fn contender(seat: SeatIndex, hole: &[&str], total_bet: Chips) -> EquityContender {
        EquityContender {
            seat,
            hole_cards: cards(hole),
            folded: false,
            total_bet,
        }
    }

    #[test]
    fn profits_sum_to_at_most_zero() {
        // Integer truncation can only lose chips, never mint them.
        let req = EquityRequest {
            prior_board: cards(&["Qs", "Jd", "4h"]),
            players: vec![
                contender(0, &["Ah", "Kd", "7c", "6c"], 100),
                contender(1, &["Qd", "Qc", "8h", "9h"], 100),
            ],
        };
        let est = MonteCarloEquity::with_seed(500, 12);
        let profits = est.all_in_ev_profits(&req).unwrap();
        let sum: i64 = profits.values().sum();
        assert!(sum <= 0);
        assert!(sum > -(2 * 500));
    }

    #[test]
    fn dominating_hand_shows_positive_expectation() {
        // Top set against a bare underpair on a dry board.
        let req = EquityRequest {
            prior_board: cards(&["Qs", "Jd", "4h"]),
            players: vec![
                contender(0, &["Qd", "Qc", "8h", "9h"], 100),
                contender(1, &["2h", "2c", "7s", "6d"], 100),
            ],
        };
        let est = MonteCarloEquity::with_seed(500, 5);
        let profits = est.all_in_ev_profits(&req).unwrap();
        assert!(profits[&0] > 0, "set should be a big favourite: {profits:?}");
        assert!(profits[&1] < 0);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let req = EquityRequest {
            prior_board: vec![],
            players: vec![
                contender(0, &["Ah", "Kd", "7c", "6c"], 50),
                contender(1, &["Qd", "Qc", "8h", "9h"], 50),
            ],
        };
        let a = MonteCarloEquity::with_seed(200, 77)
            .all_in_ev_profits(&req)
            .unwrap();
        let b = MonteCarloEquity::with_seed(200, 77)
            .all_in_ev_profits(&req)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_contender_is_rejected() {
        let req = EquityRequest {
            prior_board: vec![],
            players: vec![contender(0, &["Ah", "Kd", "7c", "6c"], 50)],
        };
        assert!(MonteCarloEquity::default().all_in_ev_profits(&req).is_err());
    }
}
