use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

pub const SEAT_COUNT: usize = 9;

/// ---- Game variants ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Variant {
    Holdem,
    Omaha,
}

impl Variant {
    /// Number of hole cards dealt to each participant.
    pub fn hole_cards(self) -> usize {
        match self {
            Variant::Holdem => 2,
            Variant::Omaha => 4,
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Holdem
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Holdem => write!(f, "Texas Hold'em"),
            Variant::Omaha => write!(f, "Omaha"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomState {
    Idle,
    DealLocked,
    Hand,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HandStatus {
    Locked,
    Dealing,
    Preflop,
    Flop,
    Turn,
    River,
}

impl HandStatus {
    pub fn street(self) -> Option<Street> {
        match self {
            HandStatus::Preflop => Some(Street::Preflop),
            HandStatus::Flop => Some(Street::Flop),
            HandStatus::Turn => Some(Street::Turn),
            HandStatus::River => Some(Street::River),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomConfig {
    pub min_buy_in: u64,
    pub max_buy_in: u64,
    pub sb: u64,
    pub bb: u64,
    pub starting_stack: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        RoomConfig {
            min_buy_in: 500,
            max_buy_in: 20_000,
            sb: 25,
            bb: 50,
            starting_stack: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub display_name: String,
    pub seat: Option<usize>,
    pub active: bool,
    /// Milliseconds since the epoch, refreshed by heartbeats.
    pub last_seen: i64,
    pub joined_at: i64,
    pub variant_pref: Option<Variant>,
    /// Chips bought in at the table; wallet balance lives outside the room.
    pub stack: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantLock {
    pub value: Variant,
    pub dealer_pid: Uuid,
    pub locked_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionLock {
    pub by: Uuid,
    pub at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub street: Street,
    /// Fixed player list for the street; the pointer walks this.
    pub order: Vec<Uuid>,
    pub index: usize,
    pub round_complete: bool,
    /// Pointer value at which action closes if nobody re-opens it.
    pub until_pid: Option<Uuid>,
    /// Monotonic; rejects stale turn writes.
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingState {
    pub street: Street,
    pub pot: u64,
    pub current_bet: u64,
    pub last_raise_size: u64,
    pub min_raise_to: u64,
    /// Chips committed on the current street.
    pub committed: HashMap<Uuid, u64>,
    pub stacks: HashMap<Uuid, u64>,
    /// Cumulative contribution across all streets; side pots read this
    /// verbatim.
    pub contrib: HashMap<Uuid, u64>,
    pub live: HashMap<Uuid, bool>,
    pub all_in: HashMap<Uuid, bool>,
    pub round_closed: bool,
    pub sb_pid: Option<Uuid>,
    pub bb_pid: Option<Uuid>,
}

impl BettingState {
    pub fn live_count(&self) -> usize {
        self.live.values().filter(|&&v| v).count()
    }

    pub fn is_live(&self, pid: &Uuid) -> bool {
        self.live.get(pid).copied().unwrap_or(false)
    }

    pub fn is_all_in(&self, pid: &Uuid) -> bool {
        self.all_in.get(pid).copied().unwrap_or(false)
    }

    /// Canonical round-closure rule: every live, non-all-in player's
    /// committed equals the current bet, or at most one live player remains.
    pub fn is_round_closed(&self) -> bool {
        let actionable = self
            .live
            .iter()
            .filter(|(pid, &l)| l && !self.is_all_in(pid))
            .count();
        if self.live_count() <= 1 || actionable == 0 {
            return true;
        }
        self.live.iter().all(|(pid, &l)| {
            !l || self.is_all_in(pid)
                || self.committed.get(pid).copied().unwrap_or(0) == self.current_bet
        })
    }

    /// True when every player still in the hand is all-in, which also ends
    /// the action for the street.
    pub fn all_live_all_in(&self) -> bool {
        self.live
            .iter()
            .filter(|(_, &l)| l)
            .all(|(pid, _)| self.is_all_in(pid))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PotWinner {
    pub pid: Uuid,
    pub share: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPot {
    pub amount: u64,
    pub winners: Vec<PotWinner>,
    pub eligible: usize,
    pub tie: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SettleReason {
    Showdown,
    EveryoneFolded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum HandResult {
    /// Fold-award marker: the hand ended before showdown and awaits payout.
    Pending { reason: SettleReason },
    Settled {
        hand_id: String,
        pots: Vec<ResolvedPot>,
        payout: HashMap<Uuid, u64>,
        rank_labels: HashMap<Uuid, String>,
        reason: SettleReason,
        paid_at: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastResult {
    pub id: String,
    pub board: Vec<u8>,
    pub variant: Variant,
    pub dealer_seat: usize,
    pub result: HandResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hand {
    pub id: String,
    pub status: HandStatus,
    pub variant: Variant,
    pub dealer_seat: usize,
    pub dealer_pid: Uuid,
    pub locked_by: Uuid,
    pub locked_at: i64,
    pub lock_ttl_ms: i64,
    pub hole_count: usize,
    /// Clockwise from the dealer's left, fixed at deal time.
    pub participants: Vec<Uuid>,
    pub board: Vec<u8>,
    pub turn: Option<TurnState>,
    pub betting: Option<BettingState>,
    pub result: Option<HandResult>,
}

impl Hand {
    pub fn lock_expired(&self, now_ms: i64) -> bool {
        now_ms - self.locked_at > self.lock_ttl_ms
    }
}

/// The single authoritative room document. Every mutation is an
/// all-or-nothing conditional transaction over one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: String,
    pub state: RoomState,
    pub seats: Vec<Option<Uuid>>,
    pub players: HashMap<Uuid, PlayerState>,
    pub dealer_seat: Option<usize>,
    pub next_variant: Option<VariantLock>,
    pub hand: Option<Hand>,
    pub last_result: Option<LastResult>,
    pub config: RoomConfig,
    pub eviction_lock: Option<EvictionLock>,
}

impl Room {
    pub fn new(code: impl Into<String>) -> Self {
        Room {
            code: code.into(),
            state: RoomState::Idle,
            seats: vec![None; SEAT_COUNT],
            players: HashMap::new(),
            dealer_seat: None,
            next_variant: None,
            hand: None,
            last_result: None,
            config: RoomConfig::default(),
            eviction_lock: None,
        }
    }

    pub fn seat_of(&self, pid: &Uuid) -> Option<usize> {
        self.players.get(pid).and_then(|p| p.seat)
    }

    pub fn seated_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }
}

/// Per-player private hole cards, written once at deal time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateHandRecord {
    pub hand_id: String,
    pub variant: Variant,
    pub cards: Vec<u8>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
}

/// Append-only action audit row; informational, never read back by the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    pub pid: Uuid,
    pub street: Street,
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<u64>,
    pub ts: i64,
}
