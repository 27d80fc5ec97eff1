use cardroom_protocol::{ErrorCode, EvictionLock, Room};
use uuid::Uuid;

pub const HEARTBEAT_MS: i64 = 10_000;
pub const STALE_AFTER_MS: i64 = 45_000;
pub const SWEEP_INTERVAL_MS: u64 = 15_000;
pub const LOCK_TTL_MS: i64 = 20_000;

/// Refresh a player's liveness; every connected client ticks this on its
/// heartbeat interval.
pub fn heartbeat(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<(), ErrorCode> {
    let p = room.players.get_mut(&pid).ok_or(ErrorCode::PreconditionFailed)?;
    p.last_seen = now_ms;
    p.active = true;
    Ok(())
}

/// Best-effort deactivation on disconnect.
pub fn mark_inactive(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<(), ErrorCode> {
    let p = room.players.get_mut(&pid).ok_or(ErrorCode::PreconditionFailed)?;
    p.last_seen = now_ms;
    p.active = false;
    Ok(())
}

pub fn is_active(room: &Room, pid: &Uuid, now_ms: i64) -> bool {
    room.players
        .get(pid)
        .map(|p| p.active && now_ms - p.last_seen <= STALE_AFTER_MS)
        .unwrap_or(false)
}

/// Seated players currently considered present.
pub fn count_active_seated(room: &Room, now_ms: i64) -> usize {
    room.seats
        .iter()
        .flatten()
        .filter(|pid| is_active(room, pid, now_ms))
        .count()
}

#[derive(Debug, PartialEq, Eq)]
pub enum EvictOutcome {
    /// Another sweeper holds a fresh eviction lock.
    Skipped,
    /// Seats freed this sweep, (pid, seat).
    Freed(Vec<(Uuid, usize)>),
}

/// Evict stale players: free their seats and deactivate them. Guarded by a
/// TTL lock so concurrent sweepers don't double-run; the loser skips
/// cleanly.
pub fn evict_stale(room: &mut Room, by: Uuid, now_ms: i64) -> Result<EvictOutcome, ErrorCode> {
    if let Some(lock) = &room.eviction_lock {
        if now_ms - lock.at < LOCK_TTL_MS && lock.by != by {
            return Ok(EvictOutcome::Skipped);
        }
    }
    let mut freed = Vec::new();
    let stale: Vec<Uuid> = room
        .players
        .iter()
        .filter(|(_, p)| !p.active || now_ms - p.last_seen > STALE_AFTER_MS)
        .map(|(pid, _)| *pid)
        .collect();
    for pid in stale {
        if let Some(p) = room.players.get_mut(&pid) {
            if let Some(seat) = p.seat {
                if room.seats[seat] == Some(pid) {
                    room.seats[seat] = None;
                    p.seat = None;
                    freed.push((pid, seat));
                }
            }
            p.active = false;
        }
    }
    room.eviction_lock = Some(EvictionLock { by, at: now_ms });
    Ok(EvictOutcome::Freed(freed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardroom_protocol::PlayerState;

    fn seat_player(room: &mut Room, pid: Uuid, seat: usize, last_seen: i64) {
        room.players.insert(
            pid,
            PlayerState {
                display_name: "p".into(),
                seat: Some(seat),
                active: true,
                last_seen,
                joined_at: last_seen,
                variant_pref: None,
                stack: 1000,
            },
        );
        room.seats[seat] = Some(pid);
    }

    #[test]
    fn stale_players_lose_their_seats() {
        let mut room = Room::new("R");
        let fresh = Uuid::new_v4();
        let stale = Uuid::new_v4();
        seat_player(&mut room, fresh, 0, 100_000);
        seat_player(&mut room, stale, 1, 100_000 - STALE_AFTER_MS - 1);
        let sweeper = Uuid::new_v4();
        let out = evict_stale(&mut room, sweeper, 100_000).unwrap();
        assert_eq!(out, EvictOutcome::Freed(vec![(stale, 1)]));
        assert_eq!(room.seats[1], None);
        assert!(!room.players[&stale].active);
        assert_eq!(room.seats[0], Some(fresh));
        assert_eq!(count_active_seated(&room, 100_000), 1);
    }

    #[test]
    fn fresh_eviction_lock_skips_other_sweepers() {
        let mut room = Room::new("R");
        let stale = Uuid::new_v4();
        seat_player(&mut room, stale, 0, 0);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        evict_stale(&mut room, first, 100_000).unwrap();
        assert_eq!(
            evict_stale(&mut room, second, 100_000 + 1).unwrap(),
            EvictOutcome::Skipped
        );
        // After the lock TTL the next sweeper runs again.
        assert_eq!(
            evict_stale(&mut room, second, 100_000 + LOCK_TTL_MS).unwrap(),
            EvictOutcome::Freed(vec![])
        );
    }

    #[test]
    fn heartbeat_reactivates() {
        let mut room = Room::new("R");
        let pid = Uuid::new_v4();
        seat_player(&mut room, pid, 0, 0);
        room.players.get_mut(&pid).unwrap().active = false;
        heartbeat(&mut room, pid, 50_000).unwrap();
        assert!(is_active(&room, &pid, 50_000));
        assert!(!is_active(&room, &pid, 50_000 + STALE_AFTER_MS + 1));
    }
}
