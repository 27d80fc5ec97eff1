use crate::betting;
use crate::lease::LEASE_TTL_MS;
use crate::presence;
use crate::store::Store;
use cardroom_protocol::{
    deal_order, deck_seed, hole_cards, shuffled_deck, ErrorCode, HandStatus, PrivateHandRecord,
    Room, RoomState,
};
use uuid::Uuid;

/// Lease extension while hole cards are being written out. Generous compared
/// with the pre-deal TTL so a slow private-hand fan-out is not swept mid-way.
pub const DEALING_TTL_MS: i64 = 15_000;

/// Transaction one of the deal flow: freeze the participant list and move
/// the hand to `Dealing`. Re-running as the lease holder is a no-op.
pub fn begin_dealing(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<(), ErrorCode> {
    let seats = room.seats.clone();
    // Present, seated and funded; a player stale past the presence window
    // is left out of the hand even before the sweeper frees the seat.
    let actives: Vec<Uuid> = room
        .seats
        .iter()
        .flatten()
        .filter(|pid| presence::is_active(room, pid, now_ms))
        .filter(|pid| room.players.get(pid).map(|p| p.stack > 0).unwrap_or(false))
        .copied()
        .collect();
    let hand = room.hand.as_mut().ok_or(ErrorCode::PreconditionFailed)?;
    if hand.locked_by != pid {
        return Err(ErrorCode::PreconditionFailed);
    }
    match hand.status {
        HandStatus::Locked => {}
        HandStatus::Dealing => return Ok(()),
        _ => return Err(ErrorCode::PreconditionFailed),
    }
    let order = deal_order(hand.dealer_seat, &seats, &actives);
    if order.len() < 2 {
        return Err(ErrorCode::PlayersLt2);
    }
    hand.participants = order;
    hand.status = HandStatus::Dealing;
    hand.locked_at = now_ms;
    hand.lock_ttl_ms = DEALING_TTL_MS.max(LEASE_TTL_MS);
    Ok(())
}

/// Recompute every participant's hole cards from the seeded deck. Pure: any
/// party holding the room code and hand id derives the same answer.
pub fn dealt_cards(
    room_code: &str,
    hand: &cardroom_protocol::Hand,
    now_ms: i64,
) -> Vec<(Uuid, PrivateHandRecord)> {
    let deck = shuffled_deck(&deck_seed(room_code, &hand.id));
    hole_cards(&deck, &hand.participants, hand.hole_count)
        .into_iter()
        .map(|(pid, cards)| {
            (
                pid,
                PrivateHandRecord {
                    hand_id: hand.id.clone(),
                    variant: hand.variant,
                    cards,
                    created_at: now_ms,
                },
            )
        })
        .collect()
}

/// Final transaction of the deal flow: open preflop betting. Idempotent when
/// re-run by the lease holder after the hand already opened.
pub fn open_hand(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<(), ErrorCode> {
    {
        let hand = room.hand.as_ref().ok_or(ErrorCode::PreconditionFailed)?;
        if hand.locked_by != pid {
            return Err(ErrorCode::PreconditionFailed);
        }
        match hand.status {
            HandStatus::Dealing => {}
            HandStatus::Preflop => return Ok(()),
            _ => return Err(ErrorCode::PreconditionFailed),
        }
    }
    betting::init_preflop(room, now_ms)?;
    if let Some(hand) = room.hand.as_mut() {
        hand.status = HandStatus::Preflop;
        hand.board.clear();
    }
    room.state = RoomState::Hand;
    Ok(())
}

/// The whole deal flow against the store: three conditional transactions
/// with the private-hand fan-out in between. Returns the records so the
/// caller can push each player their cards.
pub fn run_deal_flow(
    store: &Store,
    code: &str,
    pid: Uuid,
    now_ms: i64,
) -> Result<Vec<(Uuid, PrivateHandRecord)>, ErrorCode> {
    let records = store.transact(code, |room| {
        begin_dealing(room, pid, now_ms)?;
        let hand = room.hand.as_ref().ok_or(ErrorCode::PreconditionFailed)?;
        Ok(dealt_cards(&room.code, hand, now_ms))
    })?;
    for (owner, record) in &records {
        // Write-once: a retried flow never overwrites cards already out.
        store.write_private_hand_if_absent(code, *owner, record.clone());
    }
    store.transact(code, |room| open_hand(room, pid, now_ms))?;
    Ok(records)
}
