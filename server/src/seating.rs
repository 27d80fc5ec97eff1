use cardroom_protocol::{ErrorCode, PlayerState, Room, RoomState, Variant, SEAT_COUNT};
use std::collections::HashSet;
use uuid::Uuid;

/// Lowest-numbered `Player {n}` not already in use in this room.
fn next_free_player_name(room: &Room) -> String {
    let used: HashSet<usize> = room
        .players
        .values()
        .filter_map(|p| p.display_name.strip_prefix("Player "))
        .filter_map(|n| n.parse().ok())
        .collect();
    let mut n = 1;
    while used.contains(&n) {
        n += 1;
    }
    format!("Player {}", n)
}

/// Register a player in the room document. Re-joining refreshes presence
/// and the display name; an existing seat and stack are kept. A blank name,
/// or one another player already wears, is replaced with the lowest free
/// `Player {n}`.
pub fn join_room(room: &mut Room, pid: Uuid, name: &str, now_ms: i64) {
    let requested = name.trim();
    let taken = requested.is_empty()
        || room
            .players
            .iter()
            .any(|(other, p)| *other != pid && p.display_name == requested);
    let name = if taken {
        next_free_player_name(room)
    } else {
        requested.to_string()
    };
    match room.players.get_mut(&pid) {
        Some(p) => {
            p.display_name = name;
            p.active = true;
            p.last_seen = now_ms;
        }
        None => {
            room.players.insert(
                pid,
                PlayerState {
                    display_name: name,
                    seat: None,
                    active: true,
                    last_seen: now_ms,
                    joined_at: now_ms,
                    variant_pref: None,
                    stack: 0,
                },
            );
        }
    }
}

/// Take a seat, buying in for the table minimum out of the wallet. One seat
/// per player; the seat change and the wallet debit commit together.
pub fn claim_seat(
    room: &mut Room,
    wallet: &mut u64,
    pid: Uuid,
    seat: usize,
) -> Result<(), ErrorCode> {
    if seat >= SEAT_COUNT {
        return Err(ErrorCode::SeatTaken);
    }
    if !room.players.contains_key(&pid) {
        return Err(ErrorCode::PreconditionFailed);
    }
    if room.seat_of(&pid).is_some() {
        return Err(ErrorCode::SeatTaken);
    }
    if room.seated_count() >= SEAT_COUNT {
        return Err(ErrorCode::RoomFull);
    }
    if room.seats[seat].is_some() {
        return Err(ErrorCode::SeatTaken);
    }
    let buy_in = room.config.min_buy_in;
    if *wallet < buy_in {
        return Err(ErrorCode::Insufficient);
    }
    *wallet -= buy_in;
    room.seats[seat] = Some(pid);
    if let Some(p) = room.players.get_mut(&pid) {
        p.seat = Some(seat);
        p.stack += buy_in;
    }
    Ok(())
}

/// Stand up and cash the stack back to the wallet. Refused mid-hand; a
/// seated player leaves between hands, never out from under a live pot.
pub fn leave_seat(room: &mut Room, wallet: &mut u64, pid: Uuid) -> Result<(), ErrorCode> {
    let seat = room.seat_of(&pid).ok_or(ErrorCode::PreconditionFailed)?;
    if room.state != RoomState::Idle {
        return Err(ErrorCode::InHand);
    }
    room.seats[seat] = None;
    if let Some(p) = room.players.get_mut(&pid) {
        p.seat = None;
        *wallet += p.stack;
        p.stack = 0;
    }
    Ok(())
}

/// Record the variant this player wants when the button reaches them. Takes
/// effect at the next variant lock, never mid-hand.
pub fn set_variant_pref(room: &mut Room, pid: Uuid, variant: Variant) -> Result<(), ErrorCode> {
    let p = room.players.get_mut(&pid).ok_or(ErrorCode::PreconditionFailed)?;
    p.variant_pref = Some(variant);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_debits_the_wallet_into_the_stack() {
        let mut room = Room::new("R");
        let pid = Uuid::new_v4();
        join_room(&mut room, pid, "Ada", 0);
        let mut wallet = 5_000;
        claim_seat(&mut room, &mut wallet, pid, 3).unwrap();
        assert_eq!(wallet, 4_500);
        assert_eq!(room.seats[3], Some(pid));
        assert_eq!(room.players[&pid].stack, 500);
    }

    #[test]
    fn occupied_seat_and_double_seating_are_rejected() {
        let mut room = Room::new("R");
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        join_room(&mut room, a, "A", 0);
        join_room(&mut room, b, "B", 0);
        let mut wa = 5_000;
        let mut wb = 5_000;
        claim_seat(&mut room, &mut wa, a, 0).unwrap();
        assert_eq!(claim_seat(&mut room, &mut wb, b, 0), Err(ErrorCode::SeatTaken));
        assert_eq!(claim_seat(&mut room, &mut wa, a, 1), Err(ErrorCode::SeatTaken));
        assert_eq!(wb, 5_000);
    }

    #[test]
    fn broke_wallet_cannot_buy_in() {
        let mut room = Room::new("R");
        let pid = Uuid::new_v4();
        join_room(&mut room, pid, "A", 0);
        let mut wallet = 499;
        assert_eq!(claim_seat(&mut room, &mut wallet, pid, 0), Err(ErrorCode::Insufficient));
        assert_eq!(wallet, 499);
        assert_eq!(room.seats[0], None);
    }

    #[test]
    fn leave_cashes_out_only_between_hands() {
        let mut room = Room::new("R");
        let pid = Uuid::new_v4();
        join_room(&mut room, pid, "A", 0);
        let mut wallet = 5_000;
        claim_seat(&mut room, &mut wallet, pid, 0).unwrap();
        room.state = RoomState::Hand;
        assert_eq!(leave_seat(&mut room, &mut wallet, pid), Err(ErrorCode::InHand));
        room.state = RoomState::Idle;
        leave_seat(&mut room, &mut wallet, pid).unwrap();
        assert_eq!(wallet, 5_000);
        assert_eq!(room.seats[0], None);
        assert_eq!(room.players[&pid].stack, 0);
    }

    #[test]
    fn blank_names_get_a_fallback() {
        let mut room = Room::new("R");
        let pid = Uuid::new_v4();
        join_room(&mut room, pid, "   ", 0);
        assert_eq!(room.players[&pid].display_name, "Player 1");
    }

    #[test]
    fn duplicate_names_get_the_lowest_free_number() {
        let mut room = Room::new("R");
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        join_room(&mut room, a, "Alice", 0);
        join_room(&mut room, b, "Alice", 1);
        assert_eq!(room.players[&b].display_name, "Player 1");
        join_room(&mut room, c, "", 2);
        assert_eq!(room.players[&c].display_name, "Player 2");
        // Re-joining under your own name is not a collision.
        join_room(&mut room, a, "Alice", 3);
        assert_eq!(room.players[&a].display_name, "Alice");
    }
}
