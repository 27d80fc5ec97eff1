use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use cardroom_protocol::*;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};
use uuid::Uuid;

mod audit;
mod betting;
mod deal;
mod lease;
mod presence;
mod rotation;
mod seating;
mod settle;
mod store;
mod street;
mod sweeper;

use audit::ActionLog;
use store::Store;

type Conns = Mutex<HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<ServerToClient>>>>;

#[derive(Clone)]
struct AppState {
    store: Arc<Store>,
    log: Arc<ActionLog>,
    conns: Arc<Conns>,
    shutdown: watch::Sender<bool>,
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Room codes are short, upper-case and alphanumeric on the wire.
fn normalize_room_code(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data_dir =
        std::env::var("CARDROOM_DATA_DIR").unwrap_or_else(|_| "./action_data".to_string());
    let log = Arc::new(ActionLog::new(&data_dir)?);
    let (shutdown_tx, _) = watch::channel(false);
    let state = AppState {
        store: Arc::new(Store::new()),
        log,
        conns: Arc::new(Mutex::new(HashMap::new())),
        shutdown: shutdown_tx.clone(),
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let addr = std::env::var("CARDROOM_ADDR").unwrap_or_else(|_| "0.0.0.0:9001".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on ws://{addr}/ws");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx_out, mut rx_out) = mpsc::unbounded_channel::<ServerToClient>();

    tokio::spawn(async move {
        while let Some(msg) = rx_out.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let my_id = Uuid::new_v4();
    let _ = tx_out.send(ServerToClient::Hello { your_id: my_id });

    let mut joined_room: Option<String> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(t) => {
                if let Ok(cmd) = serde_json::from_str::<ClientToServer>(&t) {
                    route_cmd(cmd, &state, &mut joined_room, my_id, &tx_out).await;
                } else {
                    let _ = tx_out.send(ServerToClient::Error {
                        code: ErrorCode::PreconditionFailed,
                        message: "bad json".into(),
                    });
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(room) = joined_room {
        disconnect(&state, &room, my_id);
    }
}

fn disconnect(state: &AppState, room: &str, pid: Uuid) {
    {
        let mut conns = state.conns.lock();
        if let Some(per_room) = conns.get_mut(room) {
            per_room.remove(&pid);
        }
    }
    let _ = state
        .store
        .transact(room, |r| presence::mark_inactive(r, pid, now_ms()));
    debug!(%room, %pid, "[WS] disconnected");
    broadcast_room(&state.store, &state.conns, room);
}

/// Push the authoritative snapshot to every connection in the room.
fn broadcast_room(store: &Store, conns: &Conns, room: &str) {
    let snapshot = match store.snapshot(room) {
        Ok(s) => s,
        Err(_) => return,
    };
    let conns = conns.lock();
    if let Some(per_room) = conns.get(room) {
        for tx in per_room.values() {
            let _ = tx.send(ServerToClient::UpdateState { snapshot: snapshot.clone() });
        }
    }
}

fn send_to(conns: &Conns, room: &str, pid: Uuid, msg: ServerToClient) {
    let conns = conns.lock();
    if let Some(tx) = conns.get(room).and_then(|m| m.get(&pid)) {
        let _ = tx.send(msg);
    }
}

/// Transient codes are absorbed: the caller just gets a fresh snapshot and
/// resolves the race from it. Terminal codes go back as typed errors.
fn reply_error(
    state: &AppState,
    room: &str,
    code: ErrorCode,
    tx_out: &mpsc::UnboundedSender<ServerToClient>,
) {
    if code.is_transient() {
        debug!(%room, %code, "[TX] transient reject");
        if let Ok(snapshot) = state.store.snapshot(room) {
            let _ = tx_out.send(ServerToClient::UpdateState { snapshot });
        }
    } else {
        let _ = tx_out.send(ServerToClient::Error { code, message: code.to_string() });
    }
}

async fn route_cmd(
    cmd: ClientToServer,
    state: &AppState,
    joined_room: &mut Option<String>,
    my_id: Uuid,
    tx_out: &mpsc::UnboundedSender<ServerToClient>,
) {
    match cmd {
        ClientToServer::Join { room, name } => {
            let code = normalize_room_code(&room);
            if code.is_empty() {
                let _ = tx_out.send(ServerToClient::Error {
                    code: ErrorCode::RoomMissing,
                    message: "empty room code".into(),
                });
                return;
            }
            if state.store.create_room_if_absent(&code) {
                info!(room = %code, "[ROOM] created");
                let store = state.store.clone();
                let conns = state.conns.clone();
                let notify: sweeper::Notify = {
                    let store = store.clone();
                    Arc::new(move |c: &str| broadcast_room(&store, &conns, c))
                };
                sweeper::spawn_room_sweeper(
                    state.store.clone(),
                    code.clone(),
                    notify,
                    state.shutdown.subscribe(),
                );
            }
            let res = state
                .store
                .transact(&code, |r| {
                    seating::join_room(r, my_id, &name, now_ms());
                    Ok(())
                });
            match res {
                Ok(()) => {
                    state
                        .conns
                        .lock()
                        .entry(code.clone())
                        .or_default()
                        .insert(my_id, tx_out.clone());
                    *joined_room = Some(code.clone());
                    let wallet = state.store.ensure_wallet(my_id);
                    if let Ok(snapshot) = state.store.snapshot(&code) {
                        let _ = tx_out.send(ServerToClient::Joined { snapshot, wallet });
                    }
                    info!(room = %code, pid = %my_id, "[JOIN] player joined");
                    broadcast_room(&state.store, &state.conns, &code);
                }
                Err(code_err) => reply_error(state, &code, code_err, tx_out),
            }
        }
        ClientToServer::Leave => {
            if let Some(room) = joined_room.take() {
                disconnect(state, &room, my_id);
            }
        }
        ClientToServer::ClaimSeat { seat } => {
            let Some(room) = joined_room.as_deref() else { return };
            let res = state
                .store
                .transact_with_wallet(room, my_id, |r, w| seating::claim_seat(r, w, my_id, seat));
            match res {
                Ok(()) => {
                    info!(%room, pid = %my_id, seat, "[SEAT] claimed");
                    broadcast_room(&state.store, &state.conns, room);
                }
                Err(e) => reply_error(state, room, e, tx_out),
            }
        }
        ClientToServer::LeaveSeat => {
            let Some(room) = joined_room.as_deref() else { return };
            let res = state
                .store
                .transact_with_wallet(room, my_id, |r, w| seating::leave_seat(r, w, my_id));
            match res {
                Ok(()) => {
                    info!(%room, pid = %my_id, "[SEAT] left");
                    broadcast_room(&state.store, &state.conns, room);
                }
                Err(e) => reply_error(state, room, e, tx_out),
            }
        }
        ClientToServer::SetVariantPref { variant } => {
            let Some(room) = joined_room.as_deref() else { return };
            let res = state
                .store
                .transact(room, |r| seating::set_variant_pref(r, my_id, variant));
            match res {
                Ok(()) => broadcast_room(&state.store, &state.conns, room),
                Err(e) => reply_error(state, room, e, tx_out),
            }
        }
        ClientToServer::Heartbeat => {
            let Some(room) = joined_room.as_deref() else { return };
            let _ = state
                .store
                .transact(room, |r| presence::heartbeat(r, my_id, now_ms()));
        }
        ClientToServer::Deal => {
            let Some(room) = joined_room.as_deref() else { return };
            let now = now_ms();
            let acquired = state.store.transact(room, |r| lease::acquire(r, my_id, now));
            match acquired {
                Ok(acq) => {
                    info!(%room, hand = %acq.hand_id(), "[LEASE] deal lock held");
                    broadcast_room(&state.store, &state.conns, room);
                    match deal::run_deal_flow(&state.store, room, my_id, now_ms()) {
                        Ok(records) => {
                            info!(%room, hand = %acq.hand_id(), players = records.len(), "[DEAL] hand opened");
                            for (pid, record) in records {
                                send_to(
                                    &state.conns,
                                    room,
                                    pid,
                                    ServerToClient::YourHand { record },
                                );
                            }
                            broadcast_room(&state.store, &state.conns, room);
                        }
                        Err(e) => reply_error(state, room, e, tx_out),
                    }
                }
                Err(e) => reply_error(state, room, e, tx_out),
            }
        }
        ClientToServer::NextStreet => {
            let Some(room) = joined_room.as_deref() else { return };
            let res = state
                .store
                .transact(room, |r| street::advance_street(r, my_id, now_ms()));
            match res {
                Ok(street::Advance::Advanced { street, board_len }) => {
                    info!(%room, ?street, board_len, "[STREET] advanced");
                    broadcast_room(&state.store, &state.conns, room);
                }
                Ok(street::Advance::AlreadyComplete) => {
                    debug!(%room, "[STREET] board already complete");
                }
                Err(e) => reply_error(state, room, e, tx_out),
            }
        }
        ClientToServer::Settle => {
            let Some(room) = joined_room.as_deref() else { return };
            let res = state
                .store
                .transact(room, |r| settle::settle(r, my_id, now_ms()));
            match res {
                Ok(settle::SettleOutcome::Settled(last)) => {
                    info!(%room, hand = %last.id, "[SETTLE] hand paid");
                    let conns = state.conns.lock();
                    if let Some(per_room) = conns.get(room) {
                        for tx in per_room.values() {
                            let _ = tx.send(ServerToClient::HandSettled { result: last.clone() });
                        }
                    }
                    drop(conns);
                    broadcast_room(&state.store, &state.conns, room);
                }
                Ok(settle::SettleOutcome::Idempotent) => {
                    debug!(%room, "[SETTLE] idempotent retry");
                }
                Err(e) => reply_error(state, room, e, tx_out),
            }
        }
        ClientToServer::Fold => {
            betting_action(state, joined_room, my_id, tx_out, |r, pid, now| {
                betting::apply_fold(r, pid, now)
            })
            .await;
        }
        ClientToServer::Check | ClientToServer::Call => {
            betting_action(state, joined_room, my_id, tx_out, |r, pid, now| {
                betting::apply_check_call(r, pid, now)
            })
            .await;
        }
        ClientToServer::Raise { to } => {
            betting_action(state, joined_room, my_id, tx_out, move |r, pid, now| {
                betting::apply_raise(r, pid, to, now)
            })
            .await;
        }
    }
}

async fn betting_action(
    state: &AppState,
    joined_room: &Option<String>,
    my_id: Uuid,
    tx_out: &mpsc::UnboundedSender<ServerToClient>,
    f: impl FnOnce(&mut Room, Uuid, i64) -> Result<ActionRecord, ErrorCode>,
) {
    let Some(room) = joined_room.as_deref() else { return };
    let now = now_ms();
    let res = state.store.transact(room, |r| {
        let rec = f(r, my_id, now)?;
        let hand_id = r
            .hand
            .as_ref()
            .map(|h| h.id.clone())
            .ok_or(ErrorCode::NotInHand)?;
        Ok((rec, hand_id))
    });
    match res {
        Ok((rec, hand_id)) => {
            debug!(%room, pid = %my_id, kind = ?rec.kind, "[ACTION] applied");
            if let Err(e) = state.log.append(room, &hand_id, &rec).await {
                error!(%room, error = %e, "[AUDIT] append failed");
            }
            broadcast_room(&state.store, &state.conns, room);
        }
        Err(e) => reply_error(state, room, e, tx_out),
    }
}
