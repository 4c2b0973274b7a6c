//! Algebraic notation rendering.
//!
//! Renders a legal move against the position it was generated from.
//! Disambiguation needs the full legal-move list and the check/mate suffix
//! needs a peek at the resulting position, so rendering takes the state
//! mutably and leaves it exactly as it found it.

use crate::game::GameState;
use caissa_core::{Move, MoveFlag, Piece};

/// Renders a move in standard algebraic notation, e.g. "e4", "exd5", "Nbd2",
/// "O-O", "e8=Q", "Qh4#".
///
/// The move must be legal in the given state; the state must be positioned
/// *before* the move.
pub fn move_to_san(state: &mut GameState, m: Move) -> String {
    let mut san = match m.flag() {
        MoveFlag::CastleKingside => "O-O".to_string(),
        MoveFlag::CastleQueenside => "O-O-O".to_string(),
        _ => {
            let mut san = String::new();
            if m.piece() != Piece::Pawn {
                san.push(m.piece().letter());
                san.push_str(&disambiguation(state, m));
            }
            if m.is_capture() {
                if m.piece() == Piece::Pawn {
                    san.push(m.from().file().to_char());
                }
                san.push('x');
            }
            san.push_str(&m.to().to_algebraic());
            if let Some(promoted) = m.promotion() {
                san.push('=');
                san.push(promoted.letter());
            }
            san
        }
    };
    push_suffix(state, m, &mut san);
    san
}

/// Standard tie-break when several pieces of the same kind reach the same
/// destination: prefer the source file, then the source rank, then both.
fn disambiguation(state: &mut GameState, m: Move) -> String {
    let rivals: Vec<Move> = state
        .legal_moves()
        .into_iter()
        .filter(|other| other.piece() == m.piece() && other.to() == m.to())
        .collect();
    if rivals.len() <= 1 {
        return String::new();
    }

    let same_file = rivals
        .iter()
        .filter(|other| other.from().file() == m.from().file())
        .count();
    if same_file == 1 {
        return m.from().file().to_char().to_string();
    }

    let same_rank = rivals
        .iter()
        .filter(|other| other.from().rank() == m.from().rank())
        .count();
    if same_rank == 1 {
        return m.from().rank().to_char().to_string();
    }

    m.from().to_algebraic()
}

/// Appends `#`, the draw marker, or `+` (mutually exclusive, in that
/// priority order) by playing the move and taking it straight back.
fn push_suffix(state: &mut GameState, m: Move, san: &mut String) {
    state.apply(m);
    let replies = state.legal_moves();
    let in_check = state.in_check();
    if replies.is_empty() {
        if in_check {
            san.push('#');
        } else {
            san.push_str("1/2-1/2");
        }
    } else if in_check {
        san.push('+');
    }
    state.undo_move();
}
