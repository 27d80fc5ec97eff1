use cardroom_protocol::{ErrorCode, PrivateHandRecord, Room};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Default wallet balance seeded for a first-time player: ten minimum
/// buy-ins.
pub const DEFAULT_WALLET: u64 = 5_000;

struct Versioned {
    version: u64,
    doc: Room,
}

/// The conditional-transaction store. One versioned Room document per room
/// code is the only shared mutable resource; every gated operation runs as a
/// closure over a working copy and commits all-or-nothing. The mutex
/// serializes writers per map, which realizes the same semantics as an
/// optimistic compare-and-swap: a precondition violated inside the closure
/// aborts the whole transaction with no partial effect.
pub struct Store {
    rooms: Mutex<HashMap<String, Versioned>>,
    wallets: Mutex<HashMap<Uuid, u64>>,
    /// Write-once hole cards keyed by (room, pid, hand id).
    private_hands: Mutex<HashMap<(String, Uuid, String), PrivateHandRecord>>,
}

impl Store {
    pub fn new() -> Self {
        Store {
            rooms: Mutex::new(HashMap::new()),
            wallets: Mutex::new(HashMap::new()),
            private_hands: Mutex::new(HashMap::new()),
        }
    }

    pub fn create_room_if_absent(&self, code: &str) -> bool {
        let mut rooms = self.rooms.lock();
        if rooms.contains_key(code) {
            return false;
        }
        rooms.insert(
            code.to_string(),
            Versioned { version: 0, doc: Room::new(code) },
        );
        true
    }

    pub fn snapshot(&self, code: &str) -> Result<Room, ErrorCode> {
        self.rooms
            .lock()
            .get(code)
            .map(|v| v.doc.clone())
            .ok_or(ErrorCode::RoomMissing)
    }

    pub fn room_version(&self, code: &str) -> Option<u64> {
        self.rooms.lock().get(code).map(|v| v.version)
    }

    pub fn room_codes(&self) -> Vec<String> {
        self.rooms.lock().keys().cloned().collect()
    }

    /// Run one atomic conditional transaction against a room document.
    pub fn transact<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut Room) -> Result<T, ErrorCode>,
    ) -> Result<T, ErrorCode> {
        let mut rooms = self.rooms.lock();
        let entry = rooms.get_mut(code).ok_or(ErrorCode::RoomMissing)?;
        let mut working = entry.doc.clone();
        let out = f(&mut working)?;
        entry.doc = working;
        entry.version += 1;
        Ok(out)
    }

    /// Like [`transact`], additionally covering the caller's wallet balance
    /// so buy-in debit/credit commits in the same transaction as the seat
    /// change.
    pub fn transact_with_wallet<T>(
        &self,
        code: &str,
        pid: Uuid,
        f: impl FnOnce(&mut Room, &mut u64) -> Result<T, ErrorCode>,
    ) -> Result<T, ErrorCode> {
        let mut rooms = self.rooms.lock();
        let mut wallets = self.wallets.lock();
        let entry = rooms.get_mut(code).ok_or(ErrorCode::RoomMissing)?;
        let mut working = entry.doc.clone();
        let mut balance = *wallets.entry(pid).or_insert(DEFAULT_WALLET);
        let out = f(&mut working, &mut balance)?;
        entry.doc = working;
        entry.version += 1;
        wallets.insert(pid, balance);
        Ok(out)
    }

    pub fn ensure_wallet(&self, pid: Uuid) -> u64 {
        *self.wallets.lock().entry(pid).or_insert(DEFAULT_WALLET)
    }

    pub fn wallet(&self, pid: Uuid) -> u64 {
        self.wallets.lock().get(&pid).copied().unwrap_or(0)
    }

    /// Create-if-absent private hand write; idempotent under retry. Returns
    /// true when this call created the record.
    pub fn write_private_hand_if_absent(
        &self,
        room: &str,
        pid: Uuid,
        record: PrivateHandRecord,
    ) -> bool {
        let mut hands = self.private_hands.lock();
        let key = (room.to_string(), pid, record.hand_id.clone());
        if hands.contains_key(&key) {
            return false;
        }
        hands.insert(key, record);
        true
    }

    pub fn private_hand(
        &self,
        room: &str,
        pid: Uuid,
        hand_id: &str,
    ) -> Option<PrivateHandRecord> {
        self.private_hands
            .lock()
            .get(&(room.to_string(), pid, hand_id.to_string()))
            .cloned()
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardroom_protocol::RoomState;

    #[test]
    fn failed_transaction_leaves_no_partial_effect() {
        let store = Store::new();
        store.create_room_if_absent("ROOM1");
        let v0 = store.room_version("ROOM1").unwrap();
        let res: Result<(), ErrorCode> = store.transact("ROOM1", |room| {
            room.state = RoomState::DealLocked;
            Err(ErrorCode::PreconditionFailed)
        });
        assert_eq!(res, Err(ErrorCode::PreconditionFailed));
        assert_eq!(store.room_version("ROOM1").unwrap(), v0);
        assert_eq!(store.snapshot("ROOM1").unwrap().state, RoomState::Idle);
    }

    #[test]
    fn commit_bumps_version() {
        let store = Store::new();
        store.create_room_if_absent("ROOM1");
        store
            .transact("ROOM1", |room| {
                room.dealer_seat = Some(3);
                Ok(())
            })
            .unwrap();
        assert_eq!(store.room_version("ROOM1"), Some(1));
        assert_eq!(store.snapshot("ROOM1").unwrap().dealer_seat, Some(3));
    }

    #[test]
    fn private_hand_writes_are_write_once() {
        let store = Store::new();
        let pid = Uuid::new_v4();
        let rec = PrivateHandRecord {
            hand_id: "h1".into(),
            variant: Default::default(),
            cards: vec![1, 2],
            created_at: 0,
        };
        assert!(store.write_private_hand_if_absent("R", pid, rec.clone()));
        let mut other = rec.clone();
        other.cards = vec![3, 4];
        assert!(!store.write_private_hand_if_absent("R", pid, other));
        assert_eq!(store.private_hand("R", pid, "h1").unwrap().cards, vec![1, 2]);
    }

    #[test]
    fn missing_room_is_a_typed_error() {
        let store = Store::new();
        let res: Result<(), ErrorCode> = store.transact("NOPE", |_| Ok(()));
        assert_eq!(res, Err(ErrorCode::RoomMissing));
    }
}
