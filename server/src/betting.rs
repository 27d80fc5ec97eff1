use cardroom_protocol::{
    ActionKind, ActionRecord, BettingState, ErrorCode, Room, RoomState, Street, TurnState,
    SEAT_COUNT,
};
use std::collections::HashMap;
use uuid::Uuid;

fn next_occupied_participant(room: &Room, participants: &[Uuid], start: usize) -> Option<usize> {
    for k in 1..=SEAT_COUNT {
        let s = (start + k) % SEAT_COUNT;
        if let Some(pid) = room.seats[s] {
            if participants.contains(&pid) {
                return Some(s);
            }
        }
    }
    None
}

/// Acting order for a street, clockwise by seat. Preflop starts left of the
/// big blind (heads-up: at the dealer, who posted the big blind and acts
/// first); later streets start left of the dealer. Folded players are
/// skipped once betting state exists.
pub fn compute_order(room: &Room, street: Street) -> Vec<Uuid> {
    let hand = match &room.hand {
        Some(h) => h,
        None => return vec![],
    };
    let participants = &hand.participants;
    let in_order = |pid: &Uuid| -> bool {
        participants.contains(pid)
            && hand.betting.as_ref().map(|b| b.is_live(pid)).unwrap_or(true)
    };
    let dealer = hand.dealer_seat;
    let start = if street == Street::Preflop {
        if participants.len() == 2 {
            Some(dealer)
        } else {
            let sb = next_occupied_participant(room, participants, dealer);
            let bb = sb.and_then(|s| next_occupied_participant(room, participants, s));
            bb.and_then(|s| next_occupied_participant(room, participants, s))
        }
    } else {
        next_occupied_participant(room, participants, dealer)
    };
    let start = match start {
        Some(s) => s,
        None => return vec![],
    };
    let mut order = Vec::new();
    let mut s = start;
    for _ in 0..SEAT_COUNT {
        if let Some(pid) = room.seats[s] {
            if in_order(&pid) {
                order.push(pid);
            }
        }
        s = (s + 1) % SEAT_COUNT;
        if s == start && !order.is_empty() {
            break;
        }
    }
    order
}

/// Post the blinds and open preflop action. Short stacks post what they
/// have and are all-in; the table bet stays at the full big blind.
pub fn init_preflop(room: &mut Room, _now_ms: i64) -> Result<(), ErrorCode> {
    let (sb, bb) = (room.config.sb, room.config.bb);
    let participants = match &room.hand {
        Some(h) => h.participants.clone(),
        None => return Err(ErrorCode::PreconditionFailed),
    };
    let dealer = room.hand.as_ref().map(|h| h.dealer_seat).unwrap_or(0);
    let sb_seat =
        next_occupied_participant(room, &participants, dealer).ok_or(ErrorCode::PlayersLt2)?;
    let bb_seat =
        next_occupied_participant(room, &participants, sb_seat).ok_or(ErrorCode::PlayersLt2)?;
    let sb_pid = room.seats[sb_seat].ok_or(ErrorCode::PreconditionFailed)?;
    let bb_pid = room.seats[bb_seat].ok_or(ErrorCode::PreconditionFailed)?;

    let mut stacks = HashMap::new();
    let mut committed = HashMap::new();
    let mut contrib = HashMap::new();
    let mut live = HashMap::new();
    let mut all_in = HashMap::new();
    for pid in &participants {
        let stack = room
            .players
            .get(pid)
            .map(|p| p.stack)
            .unwrap_or(room.config.starting_stack);
        stacks.insert(*pid, stack);
        committed.insert(*pid, 0);
        contrib.insert(*pid, 0);
        live.insert(*pid, true);
        all_in.insert(*pid, false);
    }
    let mut post = |pid: Uuid, blind: u64| -> u64 {
        let stack = stacks.get(&pid).copied().unwrap_or(0);
        let pay = blind.min(stack);
        committed.insert(pid, pay);
        contrib.insert(pid, pay);
        stacks.insert(pid, stack - pay);
        if stack == pay {
            all_in.insert(pid, true);
        }
        pay
    };
    let pot = post(sb_pid, sb) + post(bb_pid, bb);

    let betting = BettingState {
        street: Street::Preflop,
        pot,
        current_bet: bb,
        last_raise_size: bb,
        min_raise_to: bb * 2,
        committed,
        stacks,
        contrib,
        live,
        all_in,
        round_closed: false,
        sb_pid: Some(sb_pid),
        bb_pid: Some(bb_pid),
    };
    let hand = room.hand.as_mut().ok_or(ErrorCode::PreconditionFailed)?;
    hand.betting = Some(betting);
    let order = compute_order(room, Street::Preflop);
    let hand = room.hand.as_mut().ok_or(ErrorCode::PreconditionFailed)?;
    hand.turn = Some(TurnState {
        street: Street::Preflop,
        order,
        index: 0,
        round_complete: false,
        until_pid: Some(bb_pid),
        version: 1,
    });
    Ok(())
}

fn next_active_index(order: &[Uuid], start: usize, bet: &BettingState) -> usize {
    let len = order.len();
    for i in 1..=len {
        let idx = (start + i) % len;
        let pid = &order[idx];
        if bet.is_live(pid) && !bet.is_all_in(pid) {
            return idx;
        }
    }
    start
}

/// Round-closure bookkeeping run after every action, once the pointer has
/// moved. The round closes when the pointer lands back on `until_pid` with
/// every live non-all-in player matched. Because the pointer skips players
/// who cannot act, a closure point that folds or goes all-in would never be
/// reached again; it moves to wherever the pointer now stands so the
/// remaining players still get their action. With nobody left able to act
/// the round closes outright.
fn maybe_close_round(turn: &mut TurnState, bet: &mut BettingState) {
    if bet.round_closed {
        turn.round_complete = true;
        return;
    }
    let anyone_can_act = turn
        .order
        .iter()
        .any(|p| bet.is_live(p) && !bet.is_all_in(p));
    if !anyone_can_act {
        bet.round_closed = true;
        turn.round_complete = true;
        return;
    }
    let until_gone = match turn.until_pid.as_ref() {
        Some(u) => !bet.is_live(u) || bet.is_all_in(u),
        None => true,
    };
    if until_gone {
        turn.until_pid = turn.order.get(turn.index).copied();
        return;
    }
    if turn.order.get(turn.index) == turn.until_pid.as_ref() && bet.is_round_closed() {
        bet.round_closed = true;
        turn.round_complete = true;
    }
}

struct ActionCtx {
    street: Street,
}

/// Common turn gate: in a hand, on the right street, the pointer is on the
/// caller, and the caller can still act.
fn gate(room: &Room, pid: Uuid) -> Result<ActionCtx, ErrorCode> {
    if room.state != RoomState::Hand {
        return Err(ErrorCode::NotInHand);
    }
    let hand = room.hand.as_ref().ok_or(ErrorCode::NotInHand)?;
    let turn = hand.turn.as_ref().ok_or(ErrorCode::TurnMismatch)?;
    let bet = hand.betting.as_ref().ok_or(ErrorCode::TurnMismatch)?;
    if hand.status.street() != Some(turn.street) {
        return Err(ErrorCode::TurnMismatch);
    }
    if bet.round_closed {
        return Err(ErrorCode::CannotAct);
    }
    if turn.order.get(turn.index) != Some(&pid) {
        return Err(ErrorCode::TurnMismatch);
    }
    if !bet.is_live(&pid) || bet.is_all_in(&pid) {
        return Err(ErrorCode::CannotAct);
    }
    Ok(ActionCtx { street: turn.street })
}

/// Fold. When at most one live player remains the hand is marked pending a
/// fold award; settlement pays it out.
pub fn apply_fold(room: &mut Room, pid: Uuid, now_ms: i64) -> Result<ActionRecord, ErrorCode> {
    let ctx = gate(room, pid)?;
    let hand = room.hand.as_mut().ok_or(ErrorCode::NotInHand)?;
    let bet = hand.betting.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    let turn = hand.turn.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    bet.live.insert(pid, false);
    turn.index = next_active_index(&turn.order, turn.index, bet);
    if bet.live_count() <= 1 {
        bet.round_closed = true;
        turn.round_complete = true;
        hand.result = Some(cardroom_protocol::HandResult::Pending {
            reason: cardroom_protocol::SettleReason::EveryoneFolded,
        });
    } else {
        maybe_close_round(turn, bet);
    }
    Ok(ActionRecord {
        pid,
        street: ctx.street,
        kind: ActionKind::Fold,
        amount: None,
        to: None,
        delta: None,
        ts: now_ms,
    })
}

/// Check when nothing is owed, otherwise call `min(to_call, stack)`. The
/// round closes when the pointer comes back around to `until_pid` with every
/// live non-all-in player matched.
pub fn apply_check_call(
    room: &mut Room,
    pid: Uuid,
    now_ms: i64,
) -> Result<ActionRecord, ErrorCode> {
    let ctx = gate(room, pid)?;
    let hand = room.hand.as_mut().ok_or(ErrorCode::NotInHand)?;
    let bet = hand.betting.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    let committed = bet.committed.get(&pid).copied().unwrap_or(0);
    let to_call = bet.current_bet.saturating_sub(committed);
    let stack = bet.stacks.get(&pid).copied().unwrap_or(0);
    let pay = to_call.min(stack);
    if pay > 0 {
        bet.committed.insert(pid, committed + pay);
        bet.stacks.insert(pid, stack - pay);
        bet.pot += pay;
        *bet.contrib.entry(pid).or_insert(0) += pay;
        if stack == pay {
            bet.all_in.insert(pid, true);
        }
    }
    let turn = hand.turn.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    let bet = hand.betting.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    turn.index = next_active_index(&turn.order, turn.index, bet);
    maybe_close_round(turn, bet);
    Ok(ActionRecord {
        pid,
        street: ctx.street,
        kind: if pay > 0 { ActionKind::Call } else { ActionKind::Check },
        amount: if pay > 0 { Some(pay) } else { None },
        to: None,
        delta: None,
        ts: now_ms,
    })
}

/// Bet or raise to `desired`, clamped to the legal window. A raise of at
/// least the last full raise re-opens action around to the raiser and
/// lifts the minimum; a short all-in does neither.
pub fn apply_raise(
    room: &mut Room,
    pid: Uuid,
    desired: u64,
    now_ms: i64,
) -> Result<ActionRecord, ErrorCode> {
    let ctx = gate(room, pid)?;
    let bb = room.config.bb;
    let hand = room.hand.as_mut().ok_or(ErrorCode::NotInHand)?;
    let bet = hand.betting.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    let committed = bet.committed.get(&pid).copied().unwrap_or(0);
    let stack = bet.stacks.get(&pid).copied().unwrap_or(0);
    let min_to = if bet.current_bet == 0 { bb } else { bet.min_raise_to };
    let max_to = committed + stack;
    let desired_to = desired.clamp(min_to.min(max_to), max_to);
    let delta = desired_to.saturating_sub(committed);
    if delta == 0 {
        return Err(ErrorCode::InvalidBet);
    }
    bet.committed.insert(pid, desired_to);
    bet.stacks.insert(pid, stack - delta);
    bet.pot += delta;
    *bet.contrib.entry(pid).or_insert(0) += delta;
    if stack == delta {
        bet.all_in.insert(pid, true);
    }
    let prev_bet = bet.current_bet;
    bet.current_bet = prev_bet.max(desired_to);
    let effective = bet.current_bet - prev_bet;
    let reopened = effective >= bet.last_raise_size;
    if reopened {
        bet.last_raise_size = effective;
        bet.min_raise_to = bet.current_bet + bet.last_raise_size;
    }
    let turn = hand.turn.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    if reopened {
        turn.until_pid = Some(pid);
    }
    let bet = hand.betting.as_mut().ok_or(ErrorCode::TurnMismatch)?;
    turn.index = next_active_index(&turn.order, turn.index, bet);
    maybe_close_round(turn, bet);
    Ok(ActionRecord {
        pid,
        street: ctx.street,
        kind: if prev_bet == 0 { ActionKind::Bet } else { ActionKind::Raise },
        amount: None,
        to: Some(desired_to),
        delta: Some(delta),
        ts: now_ms,
    })
}
