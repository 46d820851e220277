//! Checkers move validation, transition, and terminal detection
//! (`spec.md` §4.4).

use super::tables::geometry;
use super::{colour, is_king, Move, State, KING_FLAG};
use crate::error::{ArbiterError, Result};
use crate::rules::Rules;

/// Neighbour squares (1-based, 0 = none) a piece of the given colour may
/// move to from `idx` (0-based). Kings see both colours' slots.
fn move_slots(idx: usize, player_colour: u8, king: bool) -> Vec<u8> {
    let g = geometry();
    let mut slots = Vec::with_capacity(4);
    if player_colour == 1 || king {
        slots.extend_from_slice(&g.moves[2 * idx..2 * idx + 2]);
    }
    if player_colour == 2 || king {
        slots.extend_from_slice(&g.rmovs[2 * idx..2 * idx + 2]);
    }
    slots
}

/// Jump landings and their captured squares a piece of the given colour may
/// use from `idx`. Kings see both colours' slots.
fn jump_slots(idx: usize, player_colour: u8, king: bool) -> Vec<(u8, u8)> {
    let g = geometry();
    let mut slots = Vec::with_capacity(4);
    if player_colour == 1 || king {
        for slot in 0..2 {
            slots.push((g.jumps[2 * idx + slot], g.jumps_captured[2 * idx + slot]));
        }
    }
    if player_colour == 2 || king {
        for slot in 0..2 {
            slots.push((g.rjump[2 * idx + slot], g.rjump_captured[2 * idx + slot]));
        }
    }
    slots
}

pub fn can_move(cells: &[u8; 32], idx: usize) -> bool {
    let piece = cells[idx];
    if piece == 0 {
        return false;
    }
    move_slots(idx, colour(piece), is_king(piece))
        .into_iter()
        .any(|to| to != 0 && cells[to as usize - 1] == 0)
}

pub fn can_jump(cells: &[u8; 32], idx: usize) -> bool {
    let piece = cells[idx];
    if piece == 0 {
        return false;
    }
    let own_colour = colour(piece);
    jump_slots(idx, own_colour, is_king(piece))
        .into_iter()
        .any(|(to, captured)| {
            to != 0
                && cells[to as usize - 1] == 0
                && captured != 0
                && cells[captured as usize - 1] != 0
                && colour(cells[captured as usize - 1]) != own_colour
        })
}

fn side_has_moves(cells: &[u8; 32], side_colour: u8) -> bool {
    (0..32).any(|idx| colour(cells[idx]) == side_colour && (can_move(cells, idx) || can_jump(cells, idx)))
}

fn is_back_rank(player_colour: u8, to: u8) -> bool {
    match player_colour {
        1 => (29..=32).contains(&to),
        2 => (1..=4).contains(&to),
        _ => false,
    }
}

/// Implements §4.4's 8-point validity contract.
fn validate(state: &State, player_id: u8, mv: Move) -> Result<()> {
    let reason = |r: &str| ArbiterError::IllegalMove {
        reason: r.to_string(),
    };

    if !(1..=32).contains(&mv.from) || !(1..=32).contains(&mv.to) {
        return Err(reason("from/to out of range 1..32"));
    }
    let expects_red = player_id == 1;
    if expects_red != state.red_moves {
        return Err(reason("not this player's turn"));
    }

    let from_idx = mv.from as usize - 1;
    let to_idx = mv.to as usize - 1;
    let piece = state.cells[from_idx];
    if piece == 0 {
        return Err(reason("from square is empty"));
    }
    if state.cells[to_idx] != 0 {
        return Err(reason("to square is occupied"));
    }
    let player_colour = player_id + 1;
    if colour(piece) != player_colour {
        return Err(reason("moving piece does not belong to player"));
    }

    let king = is_king(piece);
    if !king {
        let forward = match player_colour {
            1 => mv.to > mv.from,
            2 => mv.to < mv.from,
            _ => unreachable!(),
        };
        if !forward {
            return Err(reason("a man may not move backward"));
        }
    }

    if !mv.is_jump {
        let slots = move_slots(from_idx, player_colour, king);
        if !slots.contains(&mv.to) {
            return Err(reason("to is not a legal move target"));
        }
        if !mv.pass_to_opponent {
            return Err(reason("pass_to_opponent must be true after a non-jump move"));
        }
    } else {
        let slots = jump_slots(from_idx, player_colour, king);
        let matched = slots
            .iter()
            .find(|&&(to, _)| to == mv.to)
            .ok_or_else(|| reason("to is not a legal jump landing"))?;
        let captured = matched.1;
        if captured == 0 {
            return Err(reason("jump has no intervening square"));
        }
        let captured_piece = state.cells[captured as usize - 1];
        if captured_piece == 0 || colour(captured_piece) == player_colour {
            return Err(reason("intervening square has no opponent piece"));
        }

        let mut provisional = state.cells;
        provisional[captured as usize - 1] = 0;
        provisional[from_idx] = 0;
        provisional[to_idx] = if is_back_rank(player_colour, mv.to) {
            piece | KING_FLAG
        } else {
            piece
        };
        let further = can_jump(&provisional, to_idx);
        if mv.pass_to_opponent == further {
            return Err(reason(
                "pass_to_opponent must equal the absence of a further jump",
            ));
        }
    }

    Ok(())
}

fn apply(state: &State, player_id: u8, mv: Move) -> State {
    let mut cells = state.cells;
    let from_idx = mv.from as usize - 1;
    let to_idx = mv.to as usize - 1;
    let player_colour = player_id + 1;
    let mut piece = cells[from_idx];
    let king = is_king(piece);
    cells[from_idx] = 0;

    if is_back_rank(player_colour, mv.to) {
        piece |= KING_FLAG;
    }
    cells[to_idx] = piece;

    let mut further_jump_remains = false;
    if mv.is_jump {
        // Kings may have jumped using either colour's table, so look the
        // landing up the same way `validate` matched it, not by the
        // mover's own colour alone.
        if let Some(&(_, captured)) = jump_slots(from_idx, player_colour, king)
            .iter()
            .find(|&&(to, _)| to == mv.to)
        {
            if captured != 0 {
                cells[captured as usize - 1] = 0;
            }
        }
        further_jump_remains = can_jump(&cells, to_idx);
    }

    let red_moves = if !mv.is_jump || !further_jump_remains {
        !state.red_moves
    } else {
        state.red_moves
    };

    let side_to_move_colour = if red_moves { 2 } else { 1 };
    let winner = if side_has_moves(&cells, side_to_move_colour) {
        0
    } else {
        3 - side_to_move_colour
    };

    State {
        cells,
        red_moves,
        winner,
    }
}

/// The concrete checkers plugin: a zero-sized `Rules` implementation, since
/// every operation is a pure function of the state bytes it is handed.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckersRules;

impl Rules for CheckersRules {
    fn is_valid_move(&self, state_bytes: &[u8], player_id: u8, move_bytes: &[u8]) -> Result<bool> {
        let state = State::decode(state_bytes)?;
        let mv = Move::decode(move_bytes)?;
        Ok(validate(&state, player_id, mv).is_ok())
    }

    fn transition(&self, state_bytes: &[u8], player_id: u8, move_bytes: &[u8]) -> Result<Vec<u8>> {
        let state = State::decode(state_bytes)?;
        let mv = Move::decode(move_bytes)?;
        Ok(apply(&state, player_id, mv).encode())
    }

    fn is_final(&self, state_bytes: &[u8]) -> Result<bool> {
        Ok(State::decode(state_bytes)?.is_final())
    }

    fn is_win(&self, state_bytes: &[u8], player_id: u8) -> Result<bool> {
        Ok(State::decode(state_bytes)?.is_win(player_id))
    }

    fn default_initial_state(&self) -> Vec<u8> {
        State::default_initial().encode()
    }
}
