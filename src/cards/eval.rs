use super::{
    is_run_desc_ranks, is_wheel_ranks, sort_desc, Card, HandCategory, Rank, Suit, M0, M1, M2, M3,
    M4, M5,
};

/// Packed comparable score: base-16 digits (category, c1..c5). Higher wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandScore(pub u32);

/// Best 5-card hand with category, canonical layout and tie-break digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvaluatedHand {
    pub cards: [Card; 5],
    pub category: HandCategory,
    pub tiebreak: [u8; 5],
    pub score: HandScore,
}

#[inline]
fn pack_score(cat: HandCategory, c: [u8; 5]) -> HandScore {
    HandScore(
        (cat.as_u8() as u32) * M5
            + (c[0] as u32) * M4
            + (c[1] as u32) * M3
            + (c[2] as u32) * M2
            + (c[3] as u32) * M1
            + (c[4] as u32) * M0,
    )
}

/// Category-specific tie-break vector from a canonical 5-card hand.
pub fn tiebreak_vector(cat: HandCategory, h: &[Card; 5]) -> [u8; 5] {
    let r = [h[0].rank, h[1].rank, h[2].rank, h[3].rank, h[4].rank];
    match cat {
        HandCategory::StraightFlush | HandCategory::Straight => {
            let high = if is_wheel_ranks(&r) { 5 } else { r[0] };
            [high, 0, 0, 0, 0]
        }
        HandCategory::FourOfAKind => [r[0], r[4], 0, 0, 0],
        HandCategory::FullHouse => [r[0], r[3], 0, 0, 0],
        HandCategory::Flush => [r[0], r[1], r[2], r[3], r[4]],
        HandCategory::ThreeOfAKind => [r[0], r[3], r[4], 0, 0],
        HandCategory::TwoPair => [r[0], r[2], r[4], 0, 0],
        HandCategory::OnePair => [r[0], r[2], r[3], r[4], 0],
        HandCategory::HighCard => [r[0], r[1], r[2], r[3], r[4]],
    }
}

/// Classify any 5 cards and return (category, canonical 5).
pub fn classify_five(h5: [Card; 5]) -> (HandCategory, [Card; 5]) {
    let mut s = h5;
    sort_desc(&mut s);

    // Hist counts by rank
    let mut cnt = [0u8; 15]; // 0..14
    for c in s.iter() {
        cnt[c.rank as usize] += 1;
    }

    let same_suit = s.iter().all(|c| c.suit == s[0].suit);

    // Distinct ranks in desc order (input already sorted)
    let mut uniq: Vec<Rank> = s.iter().map(|c| c.rank).collect();
    uniq.dedup();

    // Straight detection (only if 5 distinct ranks)
    let (has_straight, straight_ranks): (bool, [Rank; 5]) = if uniq.len() == 5 {
        let r = [uniq[0], uniq[1], uniq[2], uniq[3], uniq[4]];
        if is_run_desc_ranks(&r) {
            (true, r)
        } else {
            let mut set = r;
            set.sort_unstable(); // asc
            if set == [2, 3, 4, 5, 14] {
                (true, [5, 4, 3, 2, 14])
            } else {
                (false, [0; 5])
            }
        }
    } else {
        (false, [0; 5])
    };

    // Straight Flush
    if has_straight && same_suit {
        let suit = s[0].suit;
        let k: [Card; 5] = std::array::from_fn(|i| {
            *s.iter()
                .find(|c| c.rank == straight_ranks[i] && c.suit == suit)
                .unwrap()
        });
        return (HandCategory::StraightFlush, k);
    }
    // Four of a kind
    if let Some((x_rank, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c == 4)
    {
        let quads: Vec<Card> = s.iter().filter(|c| c.rank == x_rank).cloned().collect();
        let kicker = s.iter().cloned().find(|c| c.rank != x_rank).unwrap();
        return (
            HandCategory::FourOfAKind,
            [quads[0], quads[1], quads[2], quads[3], kicker],
        );
    }
    // Full House
    let trips_ranks: Vec<Rank> = (2..=14).rev().filter(|&r| cnt[r as usize] >= 3).collect();
    if !trips_ranks.is_empty() {
        let t = trips_ranks[0];
        let pair_cands: Vec<Rank> = (2..=14)
            .rev()
            .filter(|&r| r != t && cnt[r as usize] >= 2)
            .collect();
        if !pair_cands.is_empty() {
            let p = pair_cands[0];
            let trips: Vec<Card> = s.iter().filter(|c| c.rank == t).take(3).cloned().collect();
            let pair: Vec<Card> = s.iter().filter(|c| c.rank == p).take(2).cloned().collect();
            return (
                HandCategory::FullHouse,
                [trips[0], trips[1], trips[2], pair[0], pair[1]],
            );
        }
    }
    // Flush (not straight flush)
    if same_suit {
        return (HandCategory::Flush, s);
    }
    // Straight (not flush)
    if has_straight {
        // choose any suit per rank, deterministically prefer higher suit id
        let k: [Card; 5] = std::array::from_fn(|i| {
            s.iter()
                .filter(|c| c.rank == straight_ranks[i])
                .max_by_key(|c| c.suit)
                .cloned()
                .unwrap()
        });
        return (HandCategory::Straight, k);
    }
    // Trips
    if let Some((t, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c >= 3)
    {
        let trips: Vec<Card> = s.iter().filter(|c| c.rank == t).take(3).cloned().collect();
        let mut kickers: Vec<Card> = s.iter().filter(|c| c.rank != t).cloned().collect();
        sort_desc(&mut kickers);
        return (
            HandCategory::ThreeOfAKind,
            [trips[0], trips[1], trips[2], kickers[0], kickers[1]],
        );
    }
    // Two Pair
    let pairs: Vec<Rank> = (2..=14).rev().filter(|&r| cnt[r as usize] >= 2).collect();
    if pairs.len() >= 2 {
        let hi = pairs[0];
        let lo = pairs[1];
        let hi_pair: Vec<Card> = s.iter().filter(|c| c.rank == hi).take(2).cloned().collect();
        let lo_pair: Vec<Card> = s.iter().filter(|c| c.rank == lo).take(2).cloned().collect();
        let kicker = s
            .iter()
            .cloned()
            .find(|c| c.rank != hi && c.rank != lo)
            .unwrap();
        return (
            HandCategory::TwoPair,
            [hi_pair[0], hi_pair[1], lo_pair[0], lo_pair[1], kicker],
        );
    }
    // One Pair
    if let Some((p, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c >= 2)
    {
        let pair: Vec<Card> = s.iter().filter(|c| c.rank == p).take(2).cloned().collect();
        let mut kickers: Vec<Card> = s.iter().filter(|c| c.rank != p).cloned().collect();
        sort_desc(&mut kickers);
        return (
            HandCategory::OnePair,
            [pair[0], pair[1], kickers[0], kickers[1], kickers[2]],
        );
    }
    // High Card
    (HandCategory::HighCard, s)
}

/// Score any 5 cards.
pub fn evaluate_five(h5: [Card; 5]) -> EvaluatedHand {
    let (cat, k5) = classify_five(h5);
    let c = tiebreak_vector(cat, &k5);
    EvaluatedHand {
        cards: k5,
        category: cat,
        tiebreak: c,
        score: pack_score(cat, c),
    }
}

const HOLE_PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
const BOARD_TRIPLES: [(usize, usize, usize); 10] = [
    (0, 1, 2),
    (0, 1, 3),
    (0, 1, 4),
    (0, 2, 3),
    (0, 2, 4),
    (0, 3, 4),
    (1, 2, 3),
    (1, 2, 4),
    (1, 3, 4),
    (2, 3, 4),
];

/// Omaha evaluation: exactly 2 of the 4 hole cards with exactly 3 of the
/// 5 board cards, C(4,2)·C(5,3)=60 combinations, maximum by packed score.
pub fn best_omaha_hand(hole: &[Card], board: &[Card]) -> EvaluatedHand {
    assert_eq!(hole.len(), 4, "omaha hand needs 4 hole cards");
    assert_eq!(board.len(), 5, "omaha showdown needs a full board");

    let mut best: Option<EvaluatedHand> = None;
    for &(a, b) in HOLE_PAIRS.iter() {
        for &(x, y, z) in BOARD_TRIPLES.iter() {
            let hand5 = [hole[a], hole[b], board[x], board[y], board[z]];
            let eval = evaluate_five(hand5);
            if best.map_or(true, |cur| eval.score > cur.score) {
                best = Some(eval);
            }
        }
    }
    best.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lit: &str) -> Card {
        lit.parse().unwrap()
    }

    fn cards(lits: &[&str]) -> Vec<Card> {
        lits.iter().map(|l| c(l)).collect()
    }

    #[test]
    fn must_use_exactly_two_hole_cards() {
        // Board is a made flush; hole has only one spade, so the flush
        // cannot be played in Omaha.
        let hole = cards(&["As", "Kd", "Qd", "Jh"]);
        let board = cards(&["2s", "5s", "8s", "9s", "3c"]);
        let best = best_omaha_hand(&hole, &board);
        assert_ne!(best.category, HandCategory::Flush);
    }

    #[test]
    fn must_use_exactly_three_board_cards() {
        // Four hearts in the hole plus one on the board do not make a
        // flush either: only two hole cards may play.
        let hole = cards(&["Ah", "Kh", "Qh", "Jh"]);
        let board = cards(&["2h", "5c", "8d", "9s", "3c"]);
        let best = best_omaha_hand(&hole, &board);
        assert_ne!(best.category, HandCategory::Flush);
    }

    #[test]
    fn finds_the_nut_combination() {
        // AdKd with two diamonds on board: ace-high flush.
        let hole = cards(&["Ad", "Kd", "2c", "7s"]);
        let board = cards(&["3d", "9d", "Jd", "4c", "8h"]);
        let best = best_omaha_hand(&hole, &board);
        assert_eq!(best.category, HandCategory::Flush);
        assert_eq!(best.tiebreak[0], 14);
    }

    #[test]
    fn wheel_straight_scores_below_six_high() {
        let wheel = evaluate_five([c("Ah"), c("2c"), c("3d"), c("4s"), c("5h")]);
        let six_high = evaluate_five([c("2h"), c("3c"), c("4d"), c("5s"), c("6h")]);
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(six_high.category, HandCategory::Straight);
        assert!(six_high.score > wheel.score);
    }

    #[test]
    fn category_ordering_is_total() {
        let hands = [
            evaluate_five([c("Ah"), c("Kd"), c("9s"), c("7c"), c("3h")]), // high card
            evaluate_five([c("Ah"), c("Ad"), c("9s"), c("7c"), c("3h")]), // pair
            evaluate_five([c("Ah"), c("Ad"), c("9s"), c("9c"), c("3h")]), // two pair
            evaluate_five([c("Ah"), c("Ad"), c("As"), c("9c"), c("3h")]), // trips
            evaluate_five([c("Th"), c("9d"), c("8s"), c("7c"), c("6h")]), // straight
            evaluate_five([c("Ah"), c("Jh"), c("9h"), c("7h"), c("3h")]), // flush
            evaluate_five([c("Ah"), c("Ad"), c("As"), c("9c"), c("9h")]), // full house
            evaluate_five([c("Ah"), c("Ad"), c("As"), c("Ac"), c("3h")]), // quads
            evaluate_five([c("Th"), c("9h"), c("8h"), c("7h"), c("6h")]), // straight flush
        ];
        for pair in hands.windows(2) {
            assert!(pair[1].score > pair[0].score);
        }
    }

    #[test]
    fn same_hand_evaluates_identically() {
        let hole = cards(&["Ad", "Kd", "2c", "7s"]);
        let board = cards(&["3d", "9d", "Jd", "4c", "8h"]);
        let a = best_omaha_hand(&hole, &board);
        let b = best_omaha_hand(&hole, &board);
        assert_eq!(a, b);
    }

    #[test]
    fn kicker_breaks_pair_ties() {
        let ak = evaluate_five([c("Qh"), c("Qd"), c("As"), c("Kc"), c("3h")]);
        let aj = evaluate_five([c("Qs"), c("Qc"), c("Ad"), c("Jc"), c("3d")]);
        assert!(ak.score > aj.score);
    }
}
