pub mod cards;
pub mod deck;
pub mod error;
pub mod eval;
pub mod pots;
pub mod room;

pub use cards::{card_from_index, index_from_card, Card, Rank, Suit, DECK_SIZE};
pub use deck::{board_tranches, deal_order, deck_seed, hole_cards, shuffled_deck};
pub use error::ErrorCode;
pub use eval::{eval5, eval_holdem7, eval_omaha, HandCategory, HandValue};
pub use pots::{build_side_pots, Pot};
pub use room::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ---- Wire messages ----
///
/// The room snapshot in `UpdateState` is the full authoritative document.
/// Hole cards travel only on the private `YourHand` channel, although a
/// client willing to recompute the seeded deck can reconstruct them; that is
/// the documented trust model of this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientToServer {
    Join { room: String, name: String },
    Leave,
    ClaimSeat { seat: usize },
    LeaveSeat,
    SetVariantPref { variant: Variant },
    Heartbeat,

    // Hand lifecycle (dealer-gated on the server)
    Deal,
    NextStreet,
    Settle,

    // Betting actions
    Fold,
    Check,
    Call,
    Raise { to: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerToClient {
    Hello {
        your_id: Uuid,
    },
    Joined {
        snapshot: Room,
        wallet: u64,
    },
    UpdateState {
        snapshot: Room,
    },
    YourHand {
        record: PrivateHandRecord,
    },
    HandSettled {
        result: LastResult,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    Info {
        message: String,
    },
}
