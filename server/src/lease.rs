use crate::presence;
use crate::rotation;
use cardroom_protocol::{ErrorCode, Hand, HandStatus, Room, RoomState};
use uuid::Uuid;

/// Deal lease TTL. Short on purpose: it only needs to cover the window
/// between acquiring the lock and the dealing transaction, which extends it.
pub const LEASE_TTL_MS: i64 = 5_000;
pub const SWEEP_INTERVAL_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquire {
    /// Fresh lease; the caller owns the deal flow for this hand id.
    Locked { hand_id: String },
    /// The caller already holds an unexpired lease (a retried press).
    Idempotent { hand_id: String },
}

impl Acquire {
    pub fn hand_id(&self) -> &str {
        match self {
            Acquire::Locked { hand_id } | Acquire::Idempotent { hand_id } => hand_id,
        }
    }
}

fn new_hand_id(pid: Uuid, now_ms: i64) -> String {
    let pid_str = pid.simple().to_string();
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", now_ms, &pid_str[..8], &nonce[..6])
}

/// Try to take the deal lease for the next hand. Exactly one dealer press
/// wins; a retry by the holder is answered idempotently with the same hand
/// id, and an expired lease is swept inline so the press falls through to a
/// fresh acquisition.
pub fn acquire(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<Acquire, ErrorCode> {
    if let Some(hand) = &room.hand {
        if hand.status == HandStatus::Locked || hand.status == HandStatus::Dealing {
            if !hand.lock_expired(now_ms) {
                if hand.locked_by == pid {
                    return Ok(Acquire::Idempotent { hand_id: hand.id.clone() });
                }
                return Err(ErrorCode::LockHeld);
            }
            // Expired lease: clear it and fall through to re-acquire.
            room.hand = None;
            room.state = RoomState::Idle;
        } else {
            return Err(ErrorCode::NotIdle);
        }
    }
    if room.state != RoomState::Idle {
        return Err(ErrorCode::NotIdle);
    }
    let lock = room.next_variant.as_ref().ok_or(ErrorCode::NoVariantLocked)?;
    if lock.dealer_pid != pid {
        return Err(ErrorCode::NotDealer);
    }
    let dealer_seat = rotation::derive_dealer_seat(room).ok_or(ErrorCode::PlayersLt2)?;
    if presence::count_active_seated(room, now_ms) < 2 {
        return Err(ErrorCode::PlayersLt2);
    }
    let variant = lock.value;
    let hand_id = new_hand_id(pid, now_ms);
    room.hand = Some(Hand {
        id: hand_id.clone(),
        status: HandStatus::Locked,
        variant,
        dealer_seat,
        dealer_pid: pid,
        locked_by: pid,
        locked_at: now_ms,
        lock_ttl_ms: LEASE_TTL_MS,
        hole_count: variant.hole_cards(),
        participants: vec![],
        board: vec![],
        turn: None,
        betting: None,
        result: None,
    });
    room.state = RoomState::DealLocked;
    Ok(Acquire::Locked { hand_id })
}

/// Clear an expired pre-deal lease; the sweeper runs this every few seconds
/// so an abandoned press cannot wedge the room. Returns true when a lease
/// was cleared.
pub fn sweep(room: &mut Room, now_ms: i64) -> Result<bool, ErrorCode> {
    let expired = matches!(
        &room.hand,
        Some(hand)
            if (hand.status == HandStatus::Locked || hand.status == HandStatus::Dealing)
                && hand.lock_expired(now_ms)
    );
    if !expired {
        return Ok(false);
    }
    room.hand = None;
    room.state = RoomState::Idle;
    Ok(true)
}
