//! Position tensor encoding and the fixed move-identifier space.
//!
//! Both halves of the contract with the external evaluation service live
//! here. Positions serialize into a deterministic 9-plane 8x8 tensor, and
//! every structurally possible chess move maps to a stable integer id inside
//! a space of exactly [`MOVE_SPACE`] entries, so a prior vector can be
//! indexed directly by move id.
//!
//! Plane layout (rank-major, `planes[p][rank][file]`):
//! - 0..6: piece kinds in [`Piece::ALL`] order, +1.0 for white, -1.0 for black
//! - 6: side to move, +1.0 for white, -1.0 for black
//! - 7: castling rights; each board quadrant is filled with 1.0 while the
//!   matching right is held (rank half selects the color, file half selects
//!   queenside/kingside)
//! - 8: en-passant target square, 1.0 if present
//!
//! The id space enumerates all queen-ray and knight `(from, to)` pairs
//! (1792) followed by all promotion `(from, to, piece)` triples (176).
//! Promotions always resolve through the promotion block, so the mapping is
//! injective over legal moves.

use crate::analysis::{KNIGHT_JUMPS, RAYS};
use crate::game::GameState;
use caissa_core::{Color, Move, Piece, Rank, Square};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Number of planes in the position tensor.
pub const PLANE_COUNT: usize = 9;

/// The position tensor: `PLANE_COUNT` planes of 8x8 values.
pub type Planes = [[[f32; 8]; 8]; PLANE_COUNT];

/// Size of the move-identifier space.
pub const MOVE_SPACE: usize = 1968;

/// Serializes a position into the fixed-shape tensor.
///
/// The encoding is a pure function of
/// `(board, side_to_move, castling_rights, en_passant_target)` and each of
/// those is recoverable from the planes.
pub fn encode_planes(state: &GameState) -> Planes {
    let mut planes = [[[0.0; 8]; 8]; PLANE_COUNT];

    for sq in Square::all() {
        if let Some((piece, color)) = state.board().piece_at(sq) {
            let value = match color {
                Color::White => 1.0,
                Color::Black => -1.0,
            };
            planes[piece.index()][sq.rank().index() as usize][sq.file().index() as usize] = value;
        }
    }

    let side = match state.side_to_move() {
        Color::White => 1.0,
        Color::Black => -1.0,
    };
    planes[6] = [[side; 8]; 8];

    let rights = state.castling_rights();
    for rank in 0..8 {
        for file in 0..8 {
            let color = if rank < 4 { Color::White } else { Color::Black };
            let held = if file < 4 {
                rights.queenside(color)
            } else {
                rights.kingside(color)
            };
            if held {
                planes[7][rank][file] = 1.0;
            }
        }
    }

    if let Some(ep) = state.en_passant_target() {
        planes[8][ep.rank().index() as usize][ep.file().index() as usize] = 1.0;
    }

    planes
}

/// One entry of the move-identifier space.
type MoveKey = (Square, Square, Option<Piece>);

struct MoveTable {
    ids: HashMap<MoveKey, u16>,
    entries: Vec<MoveKey>,
}

static MOVE_TABLE: OnceLock<MoveTable> = OnceLock::new();

fn move_table() -> &'static MoveTable {
    MOVE_TABLE.get_or_init(build_move_table)
}

fn build_move_table() -> MoveTable {
    let mut entries: Vec<MoveKey> = Vec::with_capacity(MOVE_SPACE);

    // Queen rays and knight jumps from every square cover every non-promotion
    // move any piece can make, castling and en passant included.
    for from in Square::all() {
        for &(dr, df) in &RAYS {
            for dist in 1..8i8 {
                let Some(to) = from.offset(dr * dist, df * dist) else {
                    break;
                };
                entries.push((from, to, None));
            }
        }
        for &(dr, df) in &KNIGHT_JUMPS {
            if let Some(to) = from.offset(dr, df) {
                entries.push((from, to, None));
            }
        }
    }

    // Promotion block: straight and capturing pushes onto the last rank,
    // one entry per promotion piece, for both colors.
    for color in [Color::White, Color::Black] {
        let seventh = match color {
            Color::White => Rank::R7,
            Color::Black => Rank::R2,
        };
        for from in Square::all().filter(|sq| sq.rank() == seventh) {
            for df in [-1i8, 0, 1] {
                let Some(to) = from.offset(color.pawn_direction(), df) else {
                    continue;
                };
                for piece in Piece::PROMOTABLE {
                    entries.push((from, to, Some(piece)));
                }
            }
        }
    }

    debug_assert_eq!(entries.len(), MOVE_SPACE);

    let ids = entries
        .iter()
        .enumerate()
        .map(|(id, &key)| (key, id as u16))
        .collect();
    MoveTable { ids, entries }
}

/// Maps `(from, to, promotion)` to its stable id. Total over legal chess
/// moves; `None` only for geometrically impossible combinations.
pub fn move_id(from: Square, to: Square, promotion: Option<Piece>) -> Option<u16> {
    move_table().ids.get(&(from, to, promotion)).copied()
}

/// Inverts [`move_id`].
pub fn decode_move_id(id: u16) -> Option<(Square, Square, Option<Piece>)> {
    move_table().entries.get(id as usize).copied()
}

/// Maps a slice of generated legal moves to their ids, in order.
pub fn legal_move_ids(moves: &[Move]) -> Vec<u16> {
    moves
        .iter()
        .map(|m| {
            move_id(m.from(), m.to(), m.promotion())
                .expect("legal move outside the identifier space")
        })
        .collect()
}
