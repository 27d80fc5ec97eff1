use crate::rotation::next_occupied_left_of;
use cardroom_protocol::{
    build_side_pots, deck_seed, eval_holdem7, eval_omaha, hole_cards, shuffled_deck, ErrorCode,
    HandResult, HandStatus, HandValue, LastResult, Pot, PotWinner, ResolvedPot, Room, RoomState,
    SettleReason, Variant,
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled(LastResult),
    /// No hand is running; settlement clears the hand in its commit, so a
    /// retry is answered without touching anything.
    Idempotent,
}

/// Split each pot among its best-ranked eligible players. Floor division
/// sets the base share; leftover chips go one at a time to winners in seat
/// order clockwise from the dealer.
pub fn resolve_pots(
    pots: &[Pot],
    ranks: &HashMap<Uuid, HandValue>,
    seats: &[Option<Uuid>],
    dealer_seat: usize,
) -> (Vec<ResolvedPot>, HashMap<Uuid, u64>) {
    let mut resolved = Vec::with_capacity(pots.len());
    let mut payout: HashMap<Uuid, u64> = HashMap::new();
    for pot in pots {
        let mut best: Option<&HandValue> = None;
        let mut winners: Vec<Uuid> = Vec::new();
        for pid in &pot.eligible {
            let hv = match ranks.get(pid) {
                Some(hv) => hv,
                None => continue,
            };
            match best {
                Some(b) if hv < b => {}
                Some(b) if hv == b => winners.push(*pid),
                _ => {
                    best = Some(hv);
                    winners = vec![*pid];
                }
            }
        }
        if winners.is_empty() {
            continue;
        }
        let base = pot.amount / winners.len() as u64;
        let remainder = pot.amount % winners.len() as u64;
        let mut shares: HashMap<Uuid, u64> = winners.iter().map(|w| (*w, base)).collect();
        if remainder > 0 {
            let mut clockwise = Vec::new();
            for i in 1..=seats.len() {
                let s = (dealer_seat + i) % seats.len();
                if let Some(pid) = seats[s] {
                    if winners.contains(&pid) {
                        clockwise.push(pid);
                    }
                }
            }
            if clockwise.is_empty() {
                clockwise = winners.clone();
            }
            for i in 0..remainder {
                let pid = clockwise[i as usize % clockwise.len()];
                *shares.entry(pid).or_insert(0) += 1;
            }
        }
        for (pid, share) in &shares {
            *payout.entry(*pid).or_insert(0) += share;
        }
        resolved.push(ResolvedPot {
            amount: pot.amount,
            winners: winners
                .iter()
                .map(|pid| PotWinner { pid: *pid, share: shares[pid] })
                .collect(),
            eligible: pot.eligible.len(),
            tie: winners.len() > 1,
        });
    }
    (resolved, payout)
}

fn rank_all(
    room_code: &str,
    hand: &cardroom_protocol::Hand,
) -> HashMap<Uuid, HandValue> {
    let deck = shuffled_deck(&deck_seed(room_code, &hand.id));
    let dealt = hole_cards(&deck, &hand.participants, hand.hole_count);
    dealt
        .into_iter()
        .map(|(pid, cards)| {
            let hv = match hand.variant {
                Variant::Holdem => eval_holdem7(&cards, &hand.board),
                Variant::Omaha => eval_omaha(&cards, &hand.board),
            };
            (pid, hv)
        })
        .collect()
}

/// Pay the hand out and return the room to idle: stacks credited, dealer
/// button rotated one occupied seat clockwise, variant lock cleared, the
/// result published as `last_result`. Dealer-only, one transaction,
/// idempotent under retries.
pub fn settle(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<SettleOutcome, ErrorCode> {
    if room.state != RoomState::Hand || room.hand.is_none() {
        return Ok(SettleOutcome::Idempotent);
    }
    let caller_seat = room.seat_of(&pid);
    let (payout, pots_resolved, rank_labels, reason, hand_meta) = {
        let hand = room.hand.as_ref().ok_or(ErrorCode::NotInHand)?;
        if caller_seat != Some(hand.dealer_seat) {
            return Err(ErrorCode::NotDealer);
        }
        let bet = hand.betting.as_ref().ok_or(ErrorCode::PreconditionFailed)?;
        match &hand.result {
            Some(HandResult::Pending { reason }) => {
                let winner = bet
                    .live
                    .iter()
                    .find(|(_, &l)| l)
                    .map(|(pid, _)| *pid)
                    .ok_or(ErrorCode::PreconditionFailed)?;
                let amount = bet.pot;
                let pots = vec![ResolvedPot {
                    amount,
                    winners: vec![PotWinner { pid: winner, share: amount }],
                    eligible: 1,
                    tie: false,
                }];
                (
                    HashMap::from([(winner, amount)]),
                    pots,
                    HashMap::new(),
                    *reason,
                    (hand.id.clone(), hand.board.clone(), hand.variant, hand.dealer_seat),
                )
            }
            _ => {
                if hand.status != HandStatus::River
                    || (!bet.round_closed && !bet.all_live_all_in())
                {
                    return Err(ErrorCode::PreconditionFailed);
                }
                let ranks = rank_all(&room.code, hand);
                let labels: HashMap<Uuid, String> =
                    ranks.iter().map(|(pid, hv)| (*pid, hv.to_string())).collect();
                // Folded players fund the pots but cannot win them.
                let live_ranks: HashMap<Uuid, HandValue> = ranks
                    .into_iter()
                    .filter(|(pid, _)| bet.is_live(pid))
                    .collect();
                let pots = build_side_pots(&bet.contrib, &bet.live);
                let (resolved, payout) =
                    resolve_pots(&pots, &live_ranks, &room.seats, hand.dealer_seat);
                (
                    payout,
                    resolved,
                    labels,
                    SettleReason::Showdown,
                    (hand.id.clone(), hand.board.clone(), hand.variant, hand.dealer_seat),
                )
            }
        }
    };
    let (hand_id, board, variant, dealer_seat) = hand_meta;

    // Commit: final stacks back onto the players, room to idle.
    let stacks: Vec<(Uuid, u64)> = room
        .hand
        .as_ref()
        .and_then(|h| h.betting.as_ref())
        .map(|b| b.stacks.iter().map(|(p, s)| (*p, *s)).collect())
        .unwrap_or_default();
    for (p, stack) in stacks {
        if let Some(player) = room.players.get_mut(&p) {
            player.stack = stack + payout.get(&p).copied().unwrap_or(0);
        }
    }
    let last = LastResult {
        id: hand_id.clone(),
        board,
        variant,
        dealer_seat,
        result: HandResult::Settled {
            hand_id,
            pots: pots_resolved,
            payout,
            rank_labels,
            reason,
            paid_at: now_ms,
        },
    };
    room.last_result = Some(last.clone());
    room.state = RoomState::Idle;
    room.hand = None;
    room.next_variant = None;
    if let Some(next) = next_occupied_left_of(room, dealer_seat) {
        room.dealer_seat = Some(next);
    }
    Ok(SettleOutcome::Settled(last))
}
