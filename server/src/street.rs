use crate::betting::compute_order;
use cardroom_protocol::{
    board_tranches, deck_seed, shuffled_deck, ErrorCode, HandStatus, Room, RoomState, Street,
    TurnState,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Advanced { street: Street, board_len: usize },
    /// The board is already complete; a retried press changes nothing.
    AlreadyComplete,
}

/// Reveal the next community tranche and open the next betting round.
/// Dealer-only; the current round must be closed (or everyone left in the
/// hand all-in). The tranche is recomputed from the seeded deck, so the
/// reveal is pure bookkeeping.
pub fn advance_street(room: &mut Room, pid: Uuid, _now_ms: i64) -> Result<Advance, ErrorCode> {
    if room.state != RoomState::Hand {
        return Err(ErrorCode::NotInHand);
    }
    let code = room.code.clone();
    let bb = room.config.bb;
    let caller_seat = room.seat_of(&pid);
    {
        let hand = room.hand.as_ref().ok_or(ErrorCode::NotInHand)?;
        if caller_seat != Some(hand.dealer_seat) {
            return Err(ErrorCode::NotDealer);
        }
        match hand.status {
            HandStatus::Preflop | HandStatus::Flop | HandStatus::Turn => {}
            HandStatus::River => return Ok(Advance::AlreadyComplete),
            _ => return Err(ErrorCode::AlreadyCompleteOrInvalid),
        }
        let bet = hand.betting.as_ref().ok_or(ErrorCode::PreconditionFailed)?;
        if !bet.round_closed && !bet.all_live_all_in() {
            return Err(ErrorCode::PreconditionFailed);
        }
    }

    let (next_status, next_street) = {
        let hand = room.hand.as_mut().ok_or(ErrorCode::NotInHand)?;
        let deck = shuffled_deck(&deck_seed(&code, &hand.id));
        let tranches = board_tranches(&deck, hand.participants.len(), hand.hole_count);
        let (status, street) = match hand.board.len() {
            0 => {
                hand.board.extend_from_slice(&tranches.flop);
                (HandStatus::Flop, Street::Flop)
            }
            3 => {
                hand.board.push(tranches.turn);
                (HandStatus::Turn, Street::Turn)
            }
            4 => {
                hand.board.push(tranches.river);
                (HandStatus::River, Street::River)
            }
            _ => return Ok(Advance::AlreadyComplete),
        };
        hand.status = status;
        if let Some(bet) = hand.betting.as_mut() {
            bet.street = street;
            bet.current_bet = 0;
            bet.last_raise_size = bb;
            bet.min_raise_to = bb;
            for v in bet.committed.values_mut() {
                *v = 0;
            }
            bet.round_closed = false;
        }
        (status, street)
    };

    let order = compute_order(room, next_street);
    let hand = room.hand.as_mut().ok_or(ErrorCode::NotInHand)?;
    let version = hand.turn.as_ref().map(|t| t.version).unwrap_or(0) + 1;
    // First to act is the first player with chips behind; all-in players
    // stay in the order but cannot open the action. With everyone all-in
    // the street opens already closed.
    let start = hand
        .betting
        .as_ref()
        .and_then(|b| order.iter().position(|p| b.is_live(p) && !b.is_all_in(p)));
    let (index, until_pid) = match start {
        Some(i) => (i, Some(order[i])),
        None => (0, None),
    };
    if start.is_none() {
        if let Some(bet) = hand.betting.as_mut() {
            bet.round_closed = true;
        }
    }
    hand.turn = Some(TurnState {
        street: next_street,
        order: order.clone(),
        index,
        round_complete: start.is_none(),
        until_pid,
        version,
    });
    let board_len = hand.board.len();
    debug_assert_eq!(hand.status, next_status);
    Ok(Advance::Advanced { street: next_street, board_len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::betting::{apply_check_call, init_preflop};
    use cardroom_protocol::{Hand, PlayerState, Variant};

    fn make_room_stacks(stacks: &[u64]) -> (Room, Vec<Uuid>) {
        let n = stacks.len();
        let mut room = Room::new("ROOM1");
        let mut pids = Vec::new();
        for (i, &stack) in stacks.iter().enumerate() {
            let pid = Uuid::new_v4();
            room.players.insert(
                pid,
                PlayerState {
                    display_name: format!("p{}", i),
                    seat: Some(i),
                    active: true,
                    last_seen: 0,
                    joined_at: i as i64,
                    variant_pref: None,
                    stack,
                },
            );
            room.seats[i] = Some(pid);
            pids.push(pid);
        }
        let participants: Vec<Uuid> = (1..n).chain(0..1).map(|i| pids[i]).collect();
        room.hand = Some(Hand {
            id: "h1".into(),
            status: HandStatus::Preflop,
            variant: Variant::Holdem,
            dealer_seat: 0,
            dealer_pid: pids[0],
            locked_by: pids[0],
            locked_at: 0,
            lock_ttl_ms: 15_000,
            hole_count: 2,
            participants,
            board: vec![],
            turn: None,
            betting: None,
            result: None,
        });
        room.state = RoomState::Hand;
        init_preflop(&mut room, 0).unwrap();
        (room, pids)
    }

    fn make_room(n: usize) -> (Room, Vec<Uuid>) {
        make_room_stacks(&vec![10_000; n])
    }

    fn close_round(room: &mut Room, pids: &[Uuid]) {
        // Everyone checks or calls until the round closes.
        for _ in 0..pids.len() * 2 {
            let (done, actor) = {
                let hand = room.hand.as_ref().unwrap();
                let bet = hand.betting.as_ref().unwrap();
                let turn = hand.turn.as_ref().unwrap();
                (bet.round_closed, turn.order[turn.index])
            };
            if done {
                return;
            }
            apply_check_call(room, actor, 0).unwrap();
        }
    }

    #[test]
    fn tranches_follow_the_seeded_deck() {
        let (mut room, pids) = make_room(3);
        close_round(&mut room, &pids);
        let adv = advance_street(&mut room, pids[0], 0).unwrap();
        assert_eq!(adv, Advance::Advanced { street: Street::Flop, board_len: 3 });

        let hand = room.hand.as_ref().unwrap();
        let deck = shuffled_deck(&deck_seed("ROOM1", "h1"));
        let t = board_tranches(&deck, 3, 2);
        assert_eq!(hand.board, t.flop.to_vec());
        let bet = hand.betting.as_ref().unwrap();
        assert_eq!(bet.current_bet, 0);
        assert!(bet.committed.values().all(|&v| v == 0));
        assert_eq!(bet.min_raise_to, 50);
        let turn = hand.turn.as_ref().unwrap();
        assert_eq!(turn.street, Street::Flop);
        assert_eq!(turn.version, 2);
        // Postflop action starts left of the dealer.
        assert_eq!(turn.order[0], pids[1]);
        assert_eq!(turn.until_pid, Some(pids[1]));
    }

    #[test]
    fn full_run_reaches_the_river() {
        let (mut room, pids) = make_room(2);
        for expect in [3usize, 4, 5] {
            close_round(&mut room, &pids);
            let adv = advance_street(&mut room, pids[0], 0).unwrap();
            match adv {
                Advance::Advanced { board_len, .. } => assert_eq!(board_len, expect),
                other => panic!("unexpected: {:?}", other),
            }
        }
        assert_eq!(room.hand.as_ref().unwrap().status, HandStatus::River);
        close_round(&mut room, &pids);
        assert_eq!(
            advance_street(&mut room, pids[0], 0).unwrap(),
            Advance::AlreadyComplete
        );
    }

    #[test]
    fn all_in_blind_does_not_stall_the_next_street() {
        let (mut room, pids) = make_room_stacks(&[10_000, 25, 10_000]);
        // Sb is all-in from posting its short blind; the dealer's call ends
        // the preflop action.
        apply_check_call(&mut room, pids[0], 0).unwrap();
        assert!(room.hand.as_ref().unwrap().betting.as_ref().unwrap().round_closed);
        advance_street(&mut room, pids[0], 0).unwrap();

        // Postflop the action opens on the bb, never the all-in sb.
        {
            let turn = room.hand.as_ref().unwrap().turn.as_ref().unwrap();
            assert_eq!(turn.order[turn.index], pids[2]);
            assert_eq!(turn.until_pid, Some(pids[2]));
        }
        apply_check_call(&mut room, pids[2], 1).unwrap();
        apply_check_call(&mut room, pids[0], 2).unwrap();
        assert!(room.hand.as_ref().unwrap().betting.as_ref().unwrap().round_closed);
        assert_eq!(
            advance_street(&mut room, pids[0], 3).unwrap(),
            Advance::Advanced { street: Street::Turn, board_len: 4 }
        );
    }

    #[test]
    fn everyone_all_in_runs_out_the_board() {
        // Heads-up both blinds put the players all-in; every street opens
        // with no action left to take.
        let (mut room, pids) = make_room_stacks(&[50, 25]);
        for expect in [3usize, 4, 5] {
            match advance_street(&mut room, pids[0], 0).unwrap() {
                Advance::Advanced { board_len, .. } => assert_eq!(board_len, expect),
                other => panic!("unexpected: {:?}", other),
            }
            let turn = room.hand.as_ref().unwrap().turn.as_ref().unwrap();
            assert!(turn.round_complete);
            assert_eq!(turn.until_pid, None);
        }
        assert_eq!(
            advance_street(&mut room, pids[0], 0).unwrap(),
            Advance::AlreadyComplete
        );
    }

    #[test]
    fn open_round_blocks_the_reveal() {
        let (mut room, pids) = make_room(3);
        assert_eq!(
            advance_street(&mut room, pids[0], 0),
            Err(ErrorCode::PreconditionFailed)
        );
    }

    #[test]
    fn only_the_dealer_reveals() {
        let (mut room, pids) = make_room(3);
        close_round(&mut room, &pids);
        assert_eq!(advance_street(&mut room, pids[1], 0), Err(ErrorCode::NotDealer));
    }
}
