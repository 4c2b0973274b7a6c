//! Legal move generation.
//!
//! Generation follows the classic king-centric protocol: one attack analysis
//! up front, per-piece pseudo-legal rules that respect pins, then a filter
//! down to check evasions when the king is attacked. King moves and castling
//! are validated by attack probes; en-passant captures get a full
//! make/inspect/restore probe because no pin geometry covers them.

use crate::analysis::{analyze, square_attacked, AttackReport, Check, Pin, KNIGHT_JUMPS};
use crate::board::Board;
use crate::game::GameState;
use caissa_core::{Color, File, Move, MoveFlag, Piece, Rank, Square};

const ORTHOGONALS: [(i8, i8); 4] = [(-1, 0), (0, -1), (1, 0), (0, 1)];
const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Generates every legal move for the side to move and reports whether the
/// king is currently in check.
pub(crate) fn generate(state: &mut GameState) -> (Vec<Move>, bool) {
    let us = state.side_to_move;
    let king_sq = state.king_square(us);
    let report = analyze(&state.board, us, king_sq);

    let mut moves = Vec::new();

    if report.checks.len() > 1 {
        // Double check: nothing but the king can help.
        king_moves(state, king_sq, &report, &mut moves);
        return (moves, true);
    }

    all_piece_moves(state, &report, &mut moves);

    if let [check] = report.checks.as_slice() {
        let line = check_line(king_sq, check);
        // En-passant captures already passed a full exposure probe; the line
        // test would wrongly drop one that removes a checking pawn, since its
        // destination is the skipped square rather than the checker's.
        moves.retain(|m| {
            m.piece() == Piece::King
                || m.flag() == MoveFlag::EnPassant
                || line.contains(&m.to())
        });
    }

    (moves, report.in_check)
}

/// Squares on which a single ray check can be answered: everything between
/// king and checker, checker included. A knight check can only be answered on
/// the knight's own square.
fn check_line(king_sq: Square, check: &Check) -> Vec<Square> {
    if check.is_knight {
        return vec![check.square];
    }
    let mut line = Vec::new();
    for dist in 1..8i8 {
        let Some(sq) = king_sq.offset(check.direction.dr * dist, check.direction.df * dist) else {
            break;
        };
        line.push(sq);
        if sq == check.square {
            break;
        }
    }
    line
}

fn all_piece_moves(state: &mut GameState, report: &AttackReport, moves: &mut Vec<Move>) {
    let us = state.side_to_move;
    for sq in Square::all() {
        match state.board.piece_at(sq) {
            Some((piece, color)) if color == us => match piece {
                Piece::Pawn => pawn_moves(state, sq, report, moves),
                Piece::Knight => knight_moves(state, sq, report, moves),
                Piece::Bishop => ray_moves(state, sq, &DIAGONALS, report, moves),
                Piece::Rook => ray_moves(state, sq, &ORTHOGONALS, report, moves),
                Piece::Queen => {
                    ray_moves(state, sq, &ORTHOGONALS, report, moves);
                    ray_moves(state, sq, &DIAGONALS, report, moves);
                }
                Piece::King => king_moves(state, sq, report, moves),
            },
            _ => {}
        }
    }
}

/// Builds a move by reading the board, so the captured piece is recorded from
/// the pre-move state.
fn build(board: &Board, from: Square, to: Square, flag: MoveFlag) -> Move {
    let (piece, color) = board
        .piece_at(from)
        .expect("move generated from an empty square");
    let captured = board.piece_at(to).map(|(p, _)| p);
    Move::new(from, to, piece, color, captured, flag)
}

/// True if a pin (when present) still permits movement along `(dr, df)`.
fn pin_allows(pin: Option<Pin>, dr: i8, df: i8) -> bool {
    match pin {
        None => true,
        Some(p) => {
            (p.direction.dr, p.direction.df) == (dr, df)
                || (p.direction.dr, p.direction.df) == (-dr, -df)
        }
    }
}

fn pawn_moves(state: &mut GameState, from: Square, report: &AttackReport, moves: &mut Vec<Move>) {
    let us = state.side_to_move;
    let them = us.opposite();
    let dir = us.pawn_direction();
    let pin = report.pin_on(from);
    let (start_rank, last_rank) = match us {
        Color::White => (Rank::R2, Rank::R8),
        Color::Black => (Rank::R7, Rank::R1),
    };

    // Advances. The double push hides behind the single push: both squares
    // must be empty and the pin constraint is the same vertical line.
    if let Some(one) = from.offset(dir, 0) {
        if state.board.piece_at(one).is_none() && pin_allows(pin, dir, 0) {
            push_pawn_advance(&state.board, from, one, last_rank, moves);
            if from.rank() == start_rank {
                if let Some(two) = from.offset(2 * dir, 0) {
                    if state.board.piece_at(two).is_none() {
                        moves.push(build(&state.board, from, two, MoveFlag::DoublePush));
                    }
                }
            }
        }
    }

    // Diagonal captures, en passant included.
    for df in [-1i8, 1] {
        let Some(to) = from.offset(dir, df) else {
            continue;
        };
        match state.board.piece_at(to) {
            Some((_, color)) if color == them => {
                if pin_allows(pin, dir, df) {
                    push_pawn_advance(&state.board, from, to, last_rank, moves);
                }
            }
            None if state.en_passant == Some(to) => {
                let captured_sq = from
                    .offset(0, df)
                    .expect("en-passant victim shares the capturer's rank");
                let king_sq = state.king_square(us);
                let exposed = state.board.with_patches(
                    [
                        (to, Some((Piece::Pawn, us))),
                        (from, None),
                        (captured_sq, None),
                    ],
                    |board| analyze(board, us, king_sq).in_check,
                );
                if !exposed {
                    moves.push(Move::new(
                        from,
                        to,
                        Piece::Pawn,
                        us,
                        Some(Piece::Pawn),
                        MoveFlag::EnPassant,
                    ));
                }
            }
            _ => {}
        }
    }
}

/// Pushes a pawn move, fanning out into the four promotions on the last rank.
fn push_pawn_advance(
    board: &Board,
    from: Square,
    to: Square,
    last_rank: Rank,
    moves: &mut Vec<Move>,
) {
    if to.rank() == last_rank {
        for piece in Piece::PROMOTABLE {
            let flag = MoveFlag::for_promotion(piece).expect("PROMOTABLE pieces have a flag");
            moves.push(build(board, from, to, flag));
        }
    } else {
        moves.push(build(board, from, to, MoveFlag::Normal));
    }
}

fn knight_moves(state: &GameState, from: Square, report: &AttackReport, moves: &mut Vec<Move>) {
    // No single direction preserves a knight pin, so a pinned knight is stuck.
    if report.pin_on(from).is_some() {
        return;
    }
    let us = state.side_to_move;
    for &(dr, df) in &KNIGHT_JUMPS {
        let Some(to) = from.offset(dr, df) else {
            continue;
        };
        match state.board.piece_at(to) {
            Some((_, color)) if color == us => {}
            _ => moves.push(build(&state.board, from, to, MoveFlag::Normal)),
        }
    }
}

fn ray_moves(
    state: &GameState,
    from: Square,
    directions: &[(i8, i8); 4],
    report: &AttackReport,
    moves: &mut Vec<Move>,
) {
    let us = state.side_to_move;
    let pin = report.pin_on(from);

    for &(dr, df) in directions {
        if !pin_allows(pin, dr, df) {
            continue;
        }
        for dist in 1..8i8 {
            let Some(to) = from.offset(dr * dist, df * dist) else {
                break;
            };
            match state.board.piece_at(to) {
                None => moves.push(build(&state.board, from, to, MoveFlag::Normal)),
                Some((_, color)) if color == us => break,
                Some(_) => {
                    moves.push(build(&state.board, from, to, MoveFlag::Normal));
                    break;
                }
            }
        }
    }
}

fn king_moves(state: &GameState, from: Square, report: &AttackReport, moves: &mut Vec<Move>) {
    let us = state.side_to_move;
    for dr in -1i8..=1 {
        for df in -1i8..=1 {
            if dr == 0 && df == 0 {
                continue;
            }
            let Some(to) = from.offset(dr, df) else {
                continue;
            };
            if matches!(state.board.piece_at(to), Some((_, color)) if color == us) {
                continue;
            }
            if !square_attacked(&state.board, us, to) {
                moves.push(build(&state.board, from, to, MoveFlag::Normal));
            }
        }
    }
    castle_moves(state, from, report, moves);
}

fn castle_moves(state: &GameState, from: Square, report: &AttackReport, moves: &mut Vec<Move>) {
    if report.in_check {
        return;
    }
    let us = state.side_to_move;
    let rank = Rank::from_index(us.back_rank()).expect("back rank index is valid");
    if from != Square::new(File::E, rank) {
        return;
    }

    if state.castling.kingside(us) && rook_at(state, File::H, rank, us) {
        let f_sq = Square::new(File::F, rank);
        let g_sq = Square::new(File::G, rank);
        if state.board.piece_at(f_sq).is_none()
            && state.board.piece_at(g_sq).is_none()
            && !square_attacked(&state.board, us, f_sq)
            && !square_attacked(&state.board, us, g_sq)
        {
            moves.push(Move::new(
                from,
                g_sq,
                Piece::King,
                us,
                None,
                MoveFlag::CastleKingside,
            ));
        }
    }

    if state.castling.queenside(us) && rook_at(state, File::A, rank, us) {
        let b_sq = Square::new(File::B, rank);
        let c_sq = Square::new(File::C, rank);
        let d_sq = Square::new(File::D, rank);
        // The rook crosses b1/b8 but the king does not, so only c and d need
        // to be safe.
        if state.board.piece_at(b_sq).is_none()
            && state.board.piece_at(c_sq).is_none()
            && state.board.piece_at(d_sq).is_none()
            && !square_attacked(&state.board, us, c_sq)
            && !square_attacked(&state.board, us, d_sq)
        {
            moves.push(Move::new(
                from,
                c_sq,
                Piece::King,
                us,
                None,
                MoveFlag::CastleQueenside,
            ));
        }
    }
}

fn rook_at(state: &GameState, file: File, rank: Rank, us: Color) -> bool {
    state.board.piece_at(Square::new(file, rank)) == Some((Piece::Rook, us))
}
