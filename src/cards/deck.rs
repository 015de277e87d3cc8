use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{Card, Suit};

/// 52-card deck with a deal cursor. Shuffling is Fisher–Yates over the
/// full order; `deal` hands out cards from the front and never reuses one.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    cursor: usize,
}

impl Deck {
    /// Fresh unshuffled deck in suit-major order.
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in 0..4u8 {
            for rank in 2..=14u8 {
                cards.push(Card::new(rank, Suit::from_u8(suit)));
            }
        }
        Self { cards, cursor: 0 }
    }

    /// New deck shuffled with the caller's RNG. The table owns the RNG so
    /// tests can seed it and replay exact deals.
    pub fn shuffled(rng: &mut StdRng) -> Self {
        let mut deck = Self::new();
        deck.cards.shuffle(rng);
        deck
    }

    /// Deal the next `n` cards, advancing the cursor.
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        assert!(
            self.cursor + n <= self.cards.len(),
            "deck exhausted: asked for {n}, {} left",
            self.remaining()
        );
        let out = self.cards[self.cursor..self.cursor + n].to_vec();
        self.cursor += n;
        out
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.cursor
    }

    /// Undealt cards in deal order.
    pub fn undealt(&self) -> &[Card] {
        &self.cards[self.cursor..]
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn deck_has_52_distinct_cards() {
        let deck = Deck::new();
        let distinct: HashSet<_> = deck.undealt().iter().copied().collect();
        assert_eq!(distinct.len(), 52);
    }

    #[test]
    fn same_seed_same_order() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let da = Deck::shuffled(&mut a);
        let db = Deck::shuffled(&mut b);
        assert_eq!(da.undealt(), db.undealt());
    }

    #[test]
    fn deal_advances_cursor_without_reuse() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut deck = Deck::shuffled(&mut rng);
        let first = deck.deal(4);
        let second = deck.deal(4);
        assert_eq!(deck.remaining(), 44);
        let mut seen: HashSet<_> = first.into_iter().collect();
        for c in second {
            assert!(seen.insert(c), "card dealt twice");
        }
    }
}
