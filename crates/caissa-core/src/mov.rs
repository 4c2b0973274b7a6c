//! Move representation.

use crate::{Color, Piece, Square};
use std::fmt;

/// Flags for special move types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveFlag {
    /// Normal move (no special action).
    Normal = 0,
    /// Pawn double push from starting rank.
    DoublePush = 1,
    /// Kingside castling (O-O).
    CastleKingside = 2,
    /// Queenside castling (O-O-O).
    CastleQueenside = 3,
    /// En passant capture.
    EnPassant = 4,
    /// Pawn promotion to knight.
    PromoteKnight = 5,
    /// Pawn promotion to bishop.
    PromoteBishop = 6,
    /// Pawn promotion to rook.
    PromoteRook = 7,
    /// Pawn promotion to queen.
    PromoteQueen = 8,
}

impl MoveFlag {
    /// Returns the promotion piece if this is a promotion move.
    #[inline]
    pub const fn promotion_piece(self) -> Option<Piece> {
        match self {
            MoveFlag::PromoteKnight => Some(Piece::Knight),
            MoveFlag::PromoteBishop => Some(Piece::Bishop),
            MoveFlag::PromoteRook => Some(Piece::Rook),
            MoveFlag::PromoteQueen => Some(Piece::Queen),
            _ => None,
        }
    }

    /// Returns the promotion flag for the given piece, if the piece is a
    /// legal promotion target.
    #[inline]
    pub const fn for_promotion(piece: Piece) -> Option<Self> {
        match piece {
            Piece::Knight => Some(MoveFlag::PromoteKnight),
            Piece::Bishop => Some(MoveFlag::PromoteBishop),
            Piece::Rook => Some(MoveFlag::PromoteRook),
            Piece::Queen => Some(MoveFlag::PromoteQueen),
            _ => None,
        }
    }

    /// Returns true if this is a promotion move.
    #[inline]
    pub const fn is_promotion(self) -> bool {
        matches!(
            self,
            MoveFlag::PromoteKnight
                | MoveFlag::PromoteBishop
                | MoveFlag::PromoteRook
                | MoveFlag::PromoteQueen
        )
    }

    /// Returns true if this is a castling move.
    #[inline]
    pub const fn is_castling(self) -> bool {
        matches!(self, MoveFlag::CastleKingside | MoveFlag::CastleQueenside)
    }
}

/// A single ply, immutable after construction.
///
/// A move records everything needed to reverse it: the endpoints, the moving
/// piece, the piece captured (if any), and the special-move flag. The piece
/// fields are copied from the board at generation time, so a move is only
/// meaningful relative to the position that produced it.
///
/// Equality covers every field, so two moves with identical endpoints but
/// different promotion pieces are distinct. Matching against an
/// engine-independent `(from, to, promotion)` identifier goes through
/// [`Move::matches`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    piece: Piece,
    color: Color,
    captured: Option<Piece>,
    flag: MoveFlag,
}

impl Move {
    /// Creates a new move.
    #[inline]
    pub const fn new(
        from: Square,
        to: Square,
        piece: Piece,
        color: Color,
        captured: Option<Piece>,
        flag: MoveFlag,
    ) -> Self {
        Move {
            from,
            to,
            piece,
            color,
            captured,
            flag,
        }
    }

    /// Returns the source square.
    #[inline]
    pub const fn from(self) -> Square {
        self.from
    }

    /// Returns the destination square.
    #[inline]
    pub const fn to(self) -> Square {
        self.to
    }

    /// Returns the moving piece.
    #[inline]
    pub const fn piece(self) -> Piece {
        self.piece
    }

    /// Returns the moving side.
    #[inline]
    pub const fn color(self) -> Color {
        self.color
    }

    /// Returns the captured piece, if any. For en passant this is the
    /// opposing pawn even though the destination square is empty.
    #[inline]
    pub const fn captured(self) -> Option<Piece> {
        self.captured
    }

    /// Returns the move flag.
    #[inline]
    pub const fn flag(self) -> MoveFlag {
        self.flag
    }

    /// Returns true if this move captures a piece.
    #[inline]
    pub const fn is_capture(self) -> bool {
        self.captured.is_some()
    }

    /// Returns the promotion piece if this is a promotion move.
    #[inline]
    pub const fn promotion(self) -> Option<Piece> {
        self.flag.promotion_piece()
    }

    /// Returns true if this move matches an engine-independent identifier:
    /// same endpoints and the same promotion piece (or neither promotes).
    #[inline]
    pub fn matches(self, from: Square, to: Square, promotion: Option<Piece>) -> bool {
        self.from == from && self.to == to && self.promotion() == promotion
    }

    /// Returns the compact `{piece}{start}{end}` identifier (e.g., "Ng1f3").
    pub fn notation(self) -> String {
        format!(
            "{}{}{}",
            self.piece.letter(),
            self.from.to_algebraic(),
            self.to.to_algebraic()
        )
    }

    /// Returns the coordinate notation for this move (e.g., "e2e4", "e7e8q").
    pub fn to_uci(self) -> String {
        let promo = match self.flag {
            MoveFlag::PromoteKnight => "n",
            MoveFlag::PromoteBishop => "b",
            MoveFlag::PromoteRook => "r",
            MoveFlag::PromoteQueen => "q",
            _ => "",
        };
        format!("{}{}{}", self.from, self.to, promo)
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self.to_uci())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}
