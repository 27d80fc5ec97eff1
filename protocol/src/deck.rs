use crate::cards::DECK_SIZE;
use uuid::Uuid;

/// Deterministic seeded shuffle.
///
/// The whole table agrees on the deck for a hand without a trusted dealer:
/// every party recomputes `shuffled_deck("{room_code}:{hand_id}")` locally.
/// The seed hash is a 32-bit FNV-1a accumulator and the PRNG a 32-bit
/// xorshift (shifts 13/17/5); both are frozen wire contracts, so identical
/// input always reproduces a byte-identical permutation across
/// implementations.
pub fn seed_from_string(s: &str) -> u32 {
    let mut h: u32 = 2166136261;
    for b in s.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    h
}

struct Xorshift32 {
    x: u32,
}

impl Xorshift32 {
    fn new(seed: u32) -> Self {
        Xorshift32 { x: seed }
    }

    /// Uniform in [0, 1), 32 bits of state.
    fn next_f64(&mut self) -> f64 {
        self.x ^= self.x << 13;
        self.x ^= self.x >> 17;
        self.x ^= self.x << 5;
        self.x as f64 / 4294967296.0
    }
}

/// Fisher-Yates over the 52 card indices, driven by the seeded PRNG.
pub fn shuffled_deck(seed: &str) -> Vec<u8> {
    let mut rng = Xorshift32::new(seed_from_string(seed));
    let mut deck: Vec<u8> = (1..=DECK_SIZE as u8).collect();
    for i in (1..DECK_SIZE).rev() {
        let j = (rng.next_f64() * (i as f64 + 1.0)) as usize;
        deck.swap(i, j);
    }
    deck
}

pub fn deck_seed(room_code: &str, hand_id: &str) -> String {
    format!("{}:{}", room_code, hand_id)
}

/// Clockwise dealing order starting left of the dealer, restricted to hand
/// participants. Seats without a participant are skipped.
pub fn deal_order(
    dealer_seat: usize,
    seats: &[Option<Uuid>],
    participants: &[Uuid],
) -> Vec<Uuid> {
    let n = seats.len();
    let mut order = Vec::with_capacity(participants.len());
    for k in 1..=n {
        let idx = (dealer_seat + k) % n;
        if let Some(pid) = seats[idx] {
            if participants.contains(&pid) && !order.contains(&pid) {
                order.push(pid);
            }
        }
    }
    order
}

/// Round-robin hole cards from the top of the deck: one card per participant
/// per round, `hole_count` rounds, starting left of the dealer.
pub fn hole_cards(deck: &[u8], order: &[Uuid], hole_count: usize) -> Vec<(Uuid, Vec<u8>)> {
    let mut dealt: Vec<(Uuid, Vec<u8>)> =
        order.iter().map(|pid| (*pid, Vec::with_capacity(hole_count))).collect();
    let mut ptr = 0usize;
    for _ in 0..hole_count {
        for slot in dealt.iter_mut() {
            slot.1.push(deck[ptr]);
            ptr += 1;
        }
    }
    dealt
}

/// The community tranches that follow the hole cards: burn, three-card flop,
/// burn, turn, burn, river.
pub struct BoardTranches {
    pub flop: [u8; 3],
    pub turn: u8,
    pub river: u8,
}

pub fn board_tranches(deck: &[u8], n_participants: usize, hole_count: usize) -> BoardTranches {
    let mut cp = n_participants * hole_count;
    cp += 1; // burn
    let flop = [deck[cp], deck[cp + 1], deck[cp + 2]];
    cp += 3;
    cp += 1; // burn
    let turn = deck[cp];
    cp += 1;
    cp += 1; // burn
    let river = deck[cp];
    BoardTranches { flop, turn, river }
}
