//! Check and pin classification.
//!
//! Instead of asking "which enemy pieces attack square X" for every square,
//! the analyzer casts rays outward from the king and classifies the first
//! occupied square on each ray. One pass yields the full check and pin
//! picture the move generator needs.

use crate::board::Board;
use caissa_core::{Color, Piece, Square};

/// The eight compass directions as (rank, file) deltas. Orthogonals first;
/// `attacks_along` relies on that split.
pub(crate) const RAYS: [(i8, i8); 8] = [
    (-1, 0),
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// The eight knight jump offsets.
pub(crate) const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
];

/// A (rank, file) step along a ray or, for knight checks, the jump offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub dr: i8,
    pub df: i8,
}

impl Direction {
    /// The opposite direction.
    #[inline]
    pub const fn reversed(self) -> Self {
        Direction {
            dr: -self.dr,
            df: -self.df,
        }
    }
}

/// A friendly piece that shields its king from an enemy slider.
///
/// `direction` points from the king toward the pinning piece; the pinned
/// piece may only move along that line (either way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub square: Square,
    pub direction: Direction,
}

/// An enemy piece currently attacking the king.
///
/// For ray checks `direction` points from the king toward the checker and a
/// single check can be blocked anywhere on that line. Knight checks carry the
/// jump offset instead and cannot be blocked, only captured or escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub square: Square,
    pub direction: Direction,
    pub is_knight: bool,
}

/// The full check/pin picture for one side, produced fresh per query.
#[derive(Debug, Clone, Default)]
pub struct AttackReport {
    pub in_check: bool,
    pub checks: Vec<Check>,
    pub pins: Vec<Pin>,
}

impl AttackReport {
    /// Returns the pin constraining the piece on `sq`, if any.
    pub fn pin_on(&self, sq: Square) -> Option<Pin> {
        self.pins.iter().copied().find(|p| p.square == sq)
    }
}

/// Classifies checks against and pins protecting the king of `us`, taken to
/// stand on `king_sq`.
///
/// `king_sq` is a parameter rather than a board lookup so callers can probe
/// hypothetical king placements without mutating anything. During such a
/// probe the king is physically still on its old square; the scan treats a
/// friendly king as transparent, since the king cannot shield its own
/// destination.
pub fn analyze(board: &Board, us: Color, king_sq: Square) -> AttackReport {
    let them = us.opposite();
    let mut report = AttackReport::default();

    for (i, &(dr, df)) in RAYS.iter().enumerate() {
        let orthogonal = i < 4;
        let mut blocker: Option<Square> = None;

        for dist in 1..8i8 {
            let Some(sq) = king_sq.offset(dr * dist, df * dist) else {
                break;
            };
            match board.piece_at(sq) {
                None => continue,
                Some((Piece::King, color)) if color == us => continue,
                Some((_, color)) if color == us => {
                    if blocker.is_some() {
                        // Two friendly pieces on the ray: nothing behind them matters.
                        break;
                    }
                    blocker = Some(sq);
                }
                Some((piece, _)) => {
                    if attacks_along(piece, them, orthogonal, dist, dr) {
                        match blocker {
                            None => {
                                report.in_check = true;
                                report.checks.push(Check {
                                    square: sq,
                                    direction: Direction { dr, df },
                                    is_knight: false,
                                });
                            }
                            Some(shield) => report.pins.push(Pin {
                                square: shield,
                                direction: Direction { dr, df },
                            }),
                        }
                    }
                    break;
                }
            }
        }
    }

    for &(dr, df) in &KNIGHT_JUMPS {
        if let Some(sq) = king_sq.offset(dr, df) {
            if board.piece_at(sq) == Some((Piece::Knight, them)) {
                report.in_check = true;
                report.checks.push(Check {
                    square: sq,
                    direction: Direction { dr, df },
                    is_knight: true,
                });
            }
        }
    }

    report
}

/// Returns true if a hypothetical king of `us` standing on `sq` would be
/// attacked. Used to validate king destinations and castling transit squares.
pub fn square_attacked(board: &Board, us: Color, sq: Square) -> bool {
    analyze(board, us, sq).in_check
}

/// Whether an enemy piece of the given kind attacks back down the scanned ray.
///
/// `dr` is the rank component of the ray from the king outward; a pawn only
/// attacks back along the diagonal that opposes its own push direction.
fn attacks_along(piece: Piece, attacker: Color, orthogonal: bool, dist: i8, dr: i8) -> bool {
    match piece {
        Piece::Queen => true,
        Piece::Rook => orthogonal,
        Piece::Bishop => !orthogonal,
        Piece::King => dist == 1,
        Piece::Pawn => dist == 1 && !orthogonal && dr == -attacker.pawn_direction(),
        Piece::Knight => false,
    }
}
