use crate::lease;
use crate::presence::{self, EvictOutcome};
use crate::rotation;
use crate::store::Store;
use cardroom_protocol::ErrorCode;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Called after a sweep changed the room so connected clients get a fresh
/// snapshot.
pub type Notify = Arc<dyn Fn(&str) + Send + Sync>;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-room janitor: clears expired deal leases (and opportunistically locks
/// the next variant) every few seconds, and evicts stale players on a slower
/// cadence. Stops on shutdown or when the room disappears.
pub fn spawn_room_sweeper(
    store: Arc<Store>,
    code: String,
    notify: Notify,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sweeper_id = Uuid::new_v4();
        let mut lease_tick =
            tokio::time::interval(std::time::Duration::from_millis(lease::SWEEP_INTERVAL_MS));
        let mut evict_tick =
            tokio::time::interval(std::time::Duration::from_millis(presence::SWEEP_INTERVAL_MS));
        loop {
            tokio::select! {
                _ = lease_tick.tick() => {
                    let now = now_ms();
                    let res = store.transact(&code, |room| {
                        let swept = lease::sweep(room, now)?;
                        let locked = rotation::lock_next_variant(room, now)?;
                        Ok((swept, locked))
                    });
                    match res {
                        Ok((swept, locked)) => {
                            if swept {
                                info!(room = %code, "[SWEEP] cleared expired deal lease");
                            }
                            if let Some(v) = locked {
                                info!(room = %code, variant = %v, "[SWEEP] locked next variant");
                            }
                            if swept || locked.is_some() {
                                notify(&code);
                            }
                        }
                        Err(ErrorCode::RoomMissing) => break,
                        Err(e) => warn!(room = %code, error = %e, "[SWEEP] lease sweep failed"),
                    }
                }
                _ = evict_tick.tick() => {
                    let now = now_ms();
                    let res = store.transact(&code, |room| {
                        presence::evict_stale(room, sweeper_id, now)
                    });
                    match res {
                        Ok(EvictOutcome::Freed(freed)) if !freed.is_empty() => {
                            for (pid, seat) in &freed {
                                info!(room = %code, %pid, seat, "[EVICT] freed stale seat");
                            }
                            notify(&code);
                        }
                        Ok(_) => {}
                        Err(ErrorCode::RoomMissing) => break,
                        Err(e) => warn!(room = %code, error = %e, "[EVICT] sweep failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
