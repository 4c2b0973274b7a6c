//! Mailbox board representation and castling rights.

use caissa_core::{Color, File, Piece, Rank, Square};
use std::fmt;
use thiserror::Error;

/// Errors raised when a board does not describe a playable position.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    #[error("no {0} king on the board")]
    MissingKing(Color),

    #[error("more than one {0} king on the board")]
    DuplicateKing(Color),
}

/// An 8x8 board, one optional piece per square.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<(Piece, Color)>; 64],
}

impl Board {
    /// Creates a board with no pieces.
    pub const fn empty() -> Self {
        Board {
            squares: [None; 64],
        }
    }

    /// Creates the standard starting arrangement.
    pub fn standard() -> Self {
        let mut board = Board::empty();
        let back = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (&file, &piece) in File::ALL.iter().zip(back.iter()) {
            board.set(Square::new(file, Rank::R1), Some((piece, Color::White)));
            board.set(Square::new(file, Rank::R2), Some((Piece::Pawn, Color::White)));
            board.set(Square::new(file, Rank::R7), Some((Piece::Pawn, Color::Black)));
            board.set(Square::new(file, Rank::R8), Some((piece, Color::Black)));
        }
        board
    }

    /// Returns the piece and color at the given square, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.squares[sq.index() as usize]
    }

    /// Places (or clears) a piece on the given square.
    #[inline]
    pub fn set(&mut self, sq: Square, contents: Option<(Piece, Color)>) {
        self.squares[sq.index() as usize] = contents;
    }

    /// Finds the sole king of the given color.
    ///
    /// Fails fast on malformed boards: attack analysis against a board with
    /// zero or two kings of one color would be meaningless.
    pub fn king_square(&self, color: Color) -> Result<Square, PositionError> {
        let mut found = None;
        for sq in Square::all() {
            if self.piece_at(sq) == Some((Piece::King, color)) {
                if found.is_some() {
                    return Err(PositionError::DuplicateKing(color));
                }
                found = Some(sq);
            }
        }
        found.ok_or(PositionError::MissingKing(color))
    }

    /// Applies the given square patches, runs `f` against the patched board,
    /// and restores the prior contents on every exit path, including panics.
    ///
    /// This is the only sanctioned way to ask "what if" questions about a
    /// hypothetical arrangement (en-passant exposure, for instance) without
    /// risking a leaked intermediate state.
    pub fn with_patches<R, const N: usize>(
        &mut self,
        patches: [(Square, Option<(Piece, Color)>); N],
        f: impl FnOnce(&Board) -> R,
    ) -> R {
        struct Restore<'a, const N: usize> {
            board: &'a mut Board,
            saved: [(Square, Option<(Piece, Color)>); N],
        }

        impl<const N: usize> Drop for Restore<'_, N> {
            fn drop(&mut self) {
                // Reverse order, in case two patches touch the same square.
                for &(sq, prior) in self.saved.iter().rev() {
                    self.board.set(sq, prior);
                }
            }
        }

        let saved = patches.map(|(sq, _)| (sq, self.piece_at(sq)));
        let guard = Restore { board: self, saved };
        for (sq, contents) in patches {
            guard.board.set(sq, contents);
        }
        f(guard.board)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for rank in Rank::ALL.iter().rev() {
            write!(f, "{} ", rank)?;
            for file in File::ALL {
                match self.piece_at(Square::new(file, *rank)) {
                    Some((piece, Color::White)) => write!(f, " {}", piece.letter())?,
                    Some((piece, Color::Black)) => {
                        write!(f, " {}", piece.letter().to_ascii_lowercase())?
                    }
                    None => write!(f, " .")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")
    }
}

/// Per-color, per-side castling eligibility.
///
/// Rights only ever decrease over the course of a game; undo restores them
/// from the history record, never by recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    const WHITE_KINGSIDE: u8 = 0b0001;
    const WHITE_QUEENSIDE: u8 = 0b0010;
    const BLACK_KINGSIDE: u8 = 0b0100;
    const BLACK_QUEENSIDE: u8 = 0b1000;

    /// All four rights held (game start).
    pub const fn all() -> Self {
        CastlingRights(0b1111)
    }

    /// No rights held.
    pub const fn none() -> Self {
        CastlingRights(0)
    }

    const fn kingside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    const fn queenside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    /// Returns true if the given side may still castle kingside.
    #[inline]
    pub const fn kingside(self, color: Color) -> bool {
        self.0 & Self::kingside_flag(color) != 0
    }

    /// Returns true if the given side may still castle queenside.
    #[inline]
    pub const fn queenside(self, color: Color) -> bool {
        self.0 & Self::queenside_flag(color) != 0
    }

    /// Clears the kingside right for a color.
    #[inline]
    pub fn clear_kingside(&mut self, color: Color) {
        self.0 &= !Self::kingside_flag(color);
    }

    /// Clears the queenside right for a color.
    #[inline]
    pub fn clear_queenside(&mut self, color: Color) {
        self.0 &= !Self::queenside_flag(color);
    }

    /// Clears both rights for a color (king moved).
    #[inline]
    pub fn clear_color(&mut self, color: Color) {
        self.0 &= !(Self::kingside_flag(color) | Self::queenside_flag(color));
    }
}
