use crate::cards::{card_from_index, Card, Rank, Suit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ---- Hand evaluation ----
///
/// Ranks a 5-card poker hand into a category plus a descending-kicker
/// tie-break key, so two hands compare with the derived `(category, key)`
/// ordering. Within one category every key has the same shape, which keeps
/// the lexicographic comparison honest.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum HandCategory {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandValue {
    pub category: HandCategory,
    /// Rank values (2..=14), most significant first.
    pub key: Vec<u8>,
}

fn rank_name(v: u8) -> &'static str {
    Rank::from_value(v).map(Rank::short).unwrap_or("?")
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ks: &[u8]| {
            ks.iter().map(|&r| rank_name(r)).collect::<Vec<_>>().join("-")
        };
        match self.category {
            HandCategory::StraightFlush => {
                write!(f, "Straight Flush ({} high)", rank_name(self.key[0]))
            }
            HandCategory::FourOfAKind => {
                write!(f, "Four of a Kind ({})", rank_name(self.key[0]))
            }
            HandCategory::FullHouse => write!(
                f,
                "Full House ({} over {})",
                rank_name(self.key[0]),
                rank_name(self.key[1])
            ),
            HandCategory::Flush => write!(f, "Flush ({})", join(&self.key)),
            HandCategory::Straight => {
                write!(f, "Straight ({} high)", rank_name(self.key[0]))
            }
            HandCategory::ThreeOfAKind => {
                write!(f, "Three of a Kind ({})", rank_name(self.key[0]))
            }
            HandCategory::TwoPair => write!(
                f,
                "Two Pair ({} & {})",
                rank_name(self.key[0]),
                rank_name(self.key[1])
            ),
            HandCategory::Pair => write!(f, "Pair ({})", rank_name(self.key[0])),
            HandCategory::HighCard => {
                write!(f, "High Card ({})", rank_name(self.key[0]))
            }
        }
    }
}

/// Evaluate exactly five cards given as deck indices.
pub fn eval5(indices: &[u8]) -> HandValue {
    debug_assert_eq!(indices.len(), 5);
    let cards: Vec<Card> = indices.iter().map(|&i| card_from_index(i)).collect();
    let mut ranks: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    // (rank, count) sorted by count desc then rank desc.
    let mut counts: Vec<(u8, u8)> = Vec::with_capacity(5);
    for &r in &ranks {
        match counts.iter_mut().find(|(cr, _)| *cr == r) {
            Some((_, c)) => *c += 1,
            None => counts.push((r, 1)),
        }
    }
    counts.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let first_suit: Suit = cards[0].suit;
    let is_flush = cards.iter().all(|c| c.suit == first_suit);

    let unique: Vec<u8> = {
        let mut u = ranks.clone();
        u.dedup();
        u
    };
    let mut straight_high: Option<u8> = None;
    if unique.len() == 5 {
        if unique[0] - unique[4] == 4 {
            straight_high = Some(unique[0]);
        } else if unique == [14, 5, 4, 3, 2] {
            // Ace-low wheel plays as a five-high straight.
            straight_high = Some(5);
        }
    }

    let kickers = |skip: usize| -> Vec<u8> {
        counts.iter().skip(skip).map(|&(r, _)| r).collect()
    };

    match (straight_high, is_flush) {
        (Some(high), true) => HandValue { category: HandCategory::StraightFlush, key: vec![high] },
        _ if counts[0].1 == 4 => HandValue {
            category: HandCategory::FourOfAKind,
            key: vec![counts[0].0, counts[1].0],
        },
        _ if counts[0].1 == 3 && counts[1].1 == 2 => HandValue {
            category: HandCategory::FullHouse,
            key: vec![counts[0].0, counts[1].0],
        },
        (_, true) => HandValue { category: HandCategory::Flush, key: ranks },
        (Some(high), false) => {
            HandValue { category: HandCategory::Straight, key: vec![high] }
        }
        _ if counts[0].1 == 3 => {
            let mut key = vec![counts[0].0];
            key.extend(kickers(1));
            HandValue { category: HandCategory::ThreeOfAKind, key }
        }
        _ if counts[0].1 == 2 && counts[1].1 == 2 => HandValue {
            category: HandCategory::TwoPair,
            key: vec![counts[0].0, counts[1].0, counts[2].0],
        },
        _ if counts[0].1 == 2 => {
            let mut key = vec![counts[0].0];
            key.extend(kickers(1));
            HandValue { category: HandCategory::Pair, key }
        }
        _ => HandValue { category: HandCategory::HighCard, key: ranks },
    }
}

/// Texas Hold'em: best of all 21 five-card subsets of 2 hole + 5 board cards.
pub fn eval_holdem7(hole: &[u8], board: &[u8]) -> HandValue {
    debug_assert_eq!(hole.len(), 2);
    debug_assert_eq!(board.len(), 5);
    let cards: Vec<u8> = hole.iter().chain(board.iter()).copied().collect();
    let mut best: Option<HandValue> = None;
    for i in 0..7 {
        for j in (i + 1)..7 {
            let subset: Vec<u8> = (0..7)
                .filter(|&k| k != i && k != j)
                .map(|k| cards[k])
                .collect();
            let v = eval5(&subset);
            if best.as_ref().map_or(true, |b| v > *b) {
                best = Some(v);
            }
        }
    }
    best.unwrap_or(HandValue { category: HandCategory::HighCard, key: vec![] })
}

/// Omaha: exactly two of the four hole cards and exactly three of the five
/// board cards (60 combinations).
pub fn eval_omaha(hole: &[u8], board: &[u8]) -> HandValue {
    debug_assert_eq!(hole.len(), 4);
    debug_assert_eq!(board.len(), 5);
    let mut best: Option<HandValue> = None;
    for h1 in 0..4 {
        for h2 in (h1 + 1)..4 {
            for b1 in 0..5 {
                for b2 in (b1 + 1)..5 {
                    for b3 in (b2 + 1)..5 {
                        let five = [hole[h1], hole[h2], board[b1], board[b2], board[b3]];
                        let v = eval5(&five);
                        if best.as_ref().map_or(true, |b| v > *b) {
                            best = Some(v);
                        }
                    }
                }
            }
        }
    }
    best.unwrap_or(HandValue { category: HandCategory::HighCard, key: vec![] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{index_from_card, Card, Rank, Suit};

    fn idx(rank: Rank, suit: Suit) -> u8 {
        index_from_card(Card { rank, suit })
    }

    #[test]
    fn royal_straight_flush_outranks_quads() {
        use Rank::*;
        use Suit::*;
        let hole = [idx(Ace, Hearts), idx(King, Hearts)];
        let board = [
            idx(Queen, Hearts),
            idx(Jack, Hearts),
            idx(Ten, Hearts),
            idx(Two, Clubs),
            idx(Three, Diamonds),
        ];
        let sf = eval_holdem7(&hole, &board);
        assert_eq!(sf.category, HandCategory::StraightFlush);
        assert_eq!(sf.key, vec![14]);

        let quads = eval5(&[
            idx(Nine, Clubs),
            idx(Nine, Diamonds),
            idx(Nine, Hearts),
            idx(Nine, Spades),
            idx(Ace, Clubs),
        ]);
        assert_eq!(quads.category, HandCategory::FourOfAKind);
        assert!(sf > quads);
    }

    #[test]
    fn wheel_straight_is_five_high() {
        use Rank::*;
        use Suit::*;
        let wheel = eval5(&[
            idx(Ace, Clubs),
            idx(Two, Diamonds),
            idx(Three, Hearts),
            idx(Four, Spades),
            idx(Five, Clubs),
        ]);
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.key, vec![5]);
        let six_high = eval5(&[
            idx(Two, Diamonds),
            idx(Three, Hearts),
            idx(Four, Spades),
            idx(Five, Clubs),
            idx(Six, Clubs),
        ]);
        assert!(six_high > wheel);
    }

    #[test]
    fn kicker_breaks_pair_tie() {
        use Rank::*;
        use Suit::*;
        let pair_ace_king = eval5(&[
            idx(Ten, Clubs),
            idx(Ten, Diamonds),
            idx(Ace, Hearts),
            idx(King, Spades),
            idx(Four, Clubs),
        ]);
        let pair_ace_queen = eval5(&[
            idx(Ten, Hearts),
            idx(Ten, Spades),
            idx(Ace, Clubs),
            idx(Queen, Diamonds),
            idx(Four, Hearts),
        ]);
        assert_eq!(pair_ace_king.category, HandCategory::Pair);
        assert!(pair_ace_king > pair_ace_queen);
    }

    #[test]
    fn omaha_requires_exactly_two_hole_cards() {
        use Rank::*;
        use Suit::*;
        // Four hearts on the board, one in hand: no flush in Omaha because
        // only two hole cards may be used and only one is a heart.
        let hole = [
            idx(Ace, Hearts),
            idx(King, Clubs),
            idx(Queen, Diamonds),
            idx(Two, Spades),
        ];
        let board = [
            idx(Three, Hearts),
            idx(Six, Hearts),
            idx(Nine, Hearts),
            idx(Jack, Hearts),
            idx(King, Spades),
        ];
        let v = eval_omaha(&hole, &board);
        assert_ne!(v.category, HandCategory::Flush);
        // Hold'em evaluation of the same cards would find the flush.
        let he = eval_holdem7(&[hole[0], hole[1]], &board);
        assert_eq!(he.category, HandCategory::Flush);
    }

    #[test]
    fn full_house_label_reads_over() {
        use Rank::*;
        use Suit::*;
        let v = eval5(&[
            idx(King, Clubs),
            idx(King, Diamonds),
            idx(King, Hearts),
            idx(Seven, Spades),
            idx(Seven, Clubs),
        ]);
        assert_eq!(v.to_string(), "Full House (K over 7)");
    }
}
