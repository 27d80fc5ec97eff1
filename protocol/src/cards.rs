use serde::{Deserialize, Serialize};
use std::fmt;

/// ---- Cards ----
///
/// On the wire a card is a bare index in `1..=52`, laid out in four 13-card
/// rank-ordered suit blocks: 1-13 Diamonds 2..A, 14-26 Clubs, 27-39 Hearts,
/// 40-52 Spades. The index layout is part of the deck-seeding contract and
/// must never change.
pub const DECK_SIZE: usize = 52;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Suit {
    Diamonds,
    Clubs,
    Hearts,
    Spades,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Rank {
    Two = 2,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(v: u8) -> Option<Rank> {
        use Rank::*;
        Some(match v {
            2 => Two,
            3 => Three,
            4 => Four,
            5 => Five,
            6 => Six,
            7 => Seven,
            8 => Eight,
            9 => Nine,
            10 => Ten,
            11 => Jack,
            12 => Queen,
            13 => King,
            14 => Ace,
            _ => return None,
        })
    }

    pub fn short(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::King => "K",
            Rank::Queen => "Q",
            Rank::Jack => "J",
            Rank::Ten => "10",
            Rank::Nine => "9",
            Rank::Eight => "8",
            Rank::Seven => "7",
            Rank::Six => "6",
            Rank::Five => "5",
            Rank::Four => "4",
            Rank::Three => "3",
            Rank::Two => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

/// Fixed bijection from card index `1..=52` to (rank, suit).
pub fn card_from_index(index: u8) -> Card {
    debug_assert!((1..=52).contains(&index));
    let idx = (index - 1) as usize;
    let suit = match idx / 13 {
        0 => Suit::Diamonds,
        1 => Suit::Clubs,
        2 => Suit::Hearts,
        _ => Suit::Spades,
    };
    let rank = Rank::from_value(2 + (idx % 13) as u8).unwrap_or(Rank::Two);
    Card { rank, suit }
}

/// Inverse of [`card_from_index`].
pub fn index_from_card(card: Card) -> u8 {
    let block = match card.suit {
        Suit::Diamonds => 0u8,
        Suit::Clubs => 1,
        Suit::Hearts => 2,
        Suit::Spades => 3,
    };
    block * 13 + (card.rank.value() - 2) + 1
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self.suit {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        };
        write!(f, "{}{}", self.rank.short(), s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_card_roundtrip_covers_all_52() {
        for i in 1..=52u8 {
            assert_eq!(index_from_card(card_from_index(i)), i);
        }
    }

    #[test]
    fn suit_blocks_match_wire_layout() {
        assert_eq!(
            card_from_index(1),
            Card { rank: Rank::Two, suit: Suit::Diamonds }
        );
        assert_eq!(
            card_from_index(13),
            Card { rank: Rank::Ace, suit: Suit::Diamonds }
        );
        assert_eq!(
            card_from_index(14),
            Card { rank: Rank::Two, suit: Suit::Clubs }
        );
        assert_eq!(
            card_from_index(27),
            Card { rank: Rank::Two, suit: Suit::Hearts }
        );
        assert_eq!(
            card_from_index(52),
            Card { rank: Rank::Ace, suit: Suit::Spades }
        );
    }

    #[test]
    fn card_display_matches_table_style() {
        assert_eq!(card_from_index(13).to_string(), "A♦");
        assert_eq!(card_from_index(48).to_string(), "10♠");
    }
}
