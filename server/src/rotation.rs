use cardroom_protocol::{ErrorCode, Room, RoomState, Variant, VariantLock, SEAT_COUNT};
use uuid::Uuid;

/// The dealer seat for the coming hand: the explicit rotation pointer when
/// set, otherwise the seat of the earliest-joined seated player (seat index
/// breaks ties).
pub fn derive_dealer_seat(room: &Room) -> Option<usize> {
    if let Some(seat) = room.dealer_seat {
        if room.seats.get(seat).map(|s| s.is_some()).unwrap_or(false) {
            return Some(seat);
        }
    }
    room.seats
        .iter()
        .enumerate()
        .filter_map(|(seat, pid)| {
            let pid = pid.as_ref()?;
            let p = room.players.get(pid)?;
            Some((p.joined_at, seat))
        })
        .min()
        .map(|(_, seat)| seat)
}

/// Next occupied seat clockwise from `seat`, wrapping. Returns `seat` itself
/// only if it is the lone occupied seat.
pub fn next_occupied_left_of(room: &Room, seat: usize) -> Option<usize> {
    for k in 1..=SEAT_COUNT {
        let idx = (seat + k) % SEAT_COUNT;
        if room.seats[idx].is_some() {
            return Some(idx);
        }
    }
    None
}

/// Lock the next hand's variant to the upcoming dealer's preference. A clean
/// no-op (`Ok(None)`) when the room is mid-hand, already locked, or the
/// dealer has no preference yet; the sweeper calls this opportunistically.
pub fn lock_next_variant(room: &mut Room, now_ms: i64) -> Result<Option<Variant>, ErrorCode> {
    if room.state != RoomState::Idle || room.next_variant.is_some() {
        return Ok(None);
    }
    let dealer_seat = match derive_dealer_seat(room) {
        Some(s) => s,
        None => return Ok(None),
    };
    let dealer_pid: Uuid = match room.seats[dealer_seat] {
        Some(pid) => pid,
        None => return Ok(None),
    };
    let pref = room
        .players
        .get(&dealer_pid)
        .and_then(|p| p.variant_pref)
        .unwrap_or_default();
    room.dealer_seat = Some(dealer_seat);
    room.next_variant = Some(VariantLock {
        value: pref,
        dealer_pid,
        locked_at: now_ms,
    });
    Ok(Some(pref))
}
