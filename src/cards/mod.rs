//! cards: card model, deck, PLO hand evaluation

use core::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub mod deck;
pub mod eval;

pub use deck::Deck;
pub use eval::{best_omaha_hand, classify_five, tiebreak_vector, EvaluatedHand, HandScore};

pub type Rank = u8; // 2..14 (A=14)

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs = 0,    // c
    Diamonds = 1, // d
    Hearts = 2,   // h
    Spades = 3,   // s
}

impl Suit {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Suit::Clubs,
            1 => Suit::Diamonds,
            2 => Suit::Hearts,
            3 => Suit::Spades,
            _ => panic!("Invalid suit value: {value}"),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Suit::Clubs => 'c',
            Suit::Diamonds => 'd',
            Suit::Hearts => 'h',
            Suit::Spades => 's',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank, // 2..14
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        debug_assert!((2..=14).contains(&rank));
        Self { rank, suit }
    }
}

fn rank_letter(rank: Rank) -> char {
    match rank {
        2..=9 => (b'0' + rank) as char,
        10 => 'T',
        11 => 'J',
        12 => 'Q',
        13 => 'K',
        14 => 'A',
        _ => '?',
    }
}

fn rank_from_letter(c: char) -> Option<Rank> {
    match c {
        '2'..='9' => Some(c as u8 - b'0'),
        'T' | 't' => Some(10),
        'J' | 'j' => Some(11),
        'Q' | 'q' => Some(12),
        'K' | 'k' => Some(13),
        'A' | 'a' => Some(14),
        _ => None,
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", rank_letter(self.rank), self.suit.letter())
    }
}

impl FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (r, su) = match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(su), None) => (r, su),
            _ => return Err(format!("bad card literal: {s:?}")),
        };
        let rank = rank_from_letter(r).ok_or_else(|| format!("bad rank in card: {s:?}"))?;
        let suit = match su {
            'c' | 'C' => Suit::Clubs,
            'd' | 'D' => Suit::Diamonds,
            'h' | 'H' => Suit::Hearts,
            's' | 'S' => Suit::Spades,
            _ => return Err(format!("bad suit in card: {s:?}")),
        };
        Ok(Card { rank, suit })
    }
}

// Wire form is the two-character literal ("Ah", "Td").
impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8, // Royal is SF with high=14
}

impl HandCategory {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
        }
    }
}

/// Base-16 multipliers (no shifting) for packing (cat,c1..c5)
pub const M5: u32 = 1_048_576; // 16^5
pub const M4: u32 = 65_536; // 16^4
pub const M3: u32 = 4_096; // 16^3
pub const M2: u32 = 256; // 16^2
pub const M1: u32 = 16; // 16^1
pub const M0: u32 = 1; // 16^0

/// Deterministic sort-by-rank-desc, then suit-desc
pub fn sort_desc(cards: &mut [Card]) {
    cards.sort_by(|a, b| match b.rank.cmp(&a.rank) {
        Ordering::Equal => b.suit.cmp(&a.suit),
        o => o,
    });
}

#[inline]
pub fn is_wheel_ranks(r: &[Rank; 5]) -> bool {
    r[0] == 5 && r[1] == 4 && r[2] == 3 && r[3] == 2 && r[4] == 14
}

#[inline]
pub fn is_run_desc_ranks(r: &[Rank; 5]) -> bool {
    r[0] == r[1] + 1 && r[1] == r[2] + 1 && r[2] == r[3] + 1 && r[3] == r[4] + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_literals_round_trip() {
        for lit in ["Ah", "Td", "2c", "9s", "Kh", "Qd", "Jc"] {
            let card: Card = lit.parse().unwrap();
            assert_eq!(card.to_string(), lit);
            let json = serde_json::to_string(&card).unwrap();
            assert_eq!(json, format!("\"{lit}\""));
            let back: Card = serde_json::from_str(&json).unwrap();
            assert_eq!(back, card);
        }
    }

    #[test]
    fn bad_literals_rejected() {
        for lit in ["", "A", "1h", "Ax", "10h", "hh"] {
            assert!(lit.parse::<Card>().is_err(), "{lit:?} should not parse");
        }
    }
}
