//! Game state with reversible move application.
//!
//! [`GameState`] owns the canonical board and everything needed to take a
//! move back exactly: each applied ply pushes one [`PlyRecord`] carrying the
//! move itself plus the castling rights and en-passant target that were in
//! force before it. Undo replays those snapshots instead of recomputing them,
//! so N undos restore the position of N plies earlier bit for bit.

use crate::analysis::analyze;
use crate::board::{Board, CastlingRights, PositionError};
use crate::movegen;
use caissa_core::{Color, File, Move, MoveFlag, Piece, Rank, Square};
use thiserror::Error;

/// Errors raised when applying a move.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// The move is not in the current legal-move list. Nothing was mutated.
    #[error("illegal move: {0}")]
    Illegal(String),

    /// The move string could not be parsed as coordinates.
    #[error("malformed move: {0}")]
    Malformed(String),
}

/// One entry of the game history: the move plus the state it destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyRecord {
    /// The move that was played.
    pub mov: Move,
    /// Castling rights before the move.
    pub castling_before: CastlingRights,
    /// En-passant target before the move.
    pub en_passant_before: Option<Square>,
}

/// A chess game in progress.
#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) board: Board,
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    white_king: Square,
    black_king: Square,
    history: Vec<PlyRecord>,
    checkmate: bool,
    stalemate: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Creates a game at the standard starting position.
    pub fn new() -> Self {
        Self::from_board(
            Board::standard(),
            Color::White,
            CastlingRights::all(),
            None,
        )
        .expect("the standard starting position is well-formed")
    }

    /// Creates a game from an arbitrary board.
    ///
    /// Fails fast if either side does not have exactly one king; attack
    /// analysis against such a board would produce nonsense.
    pub fn from_board(
        board: Board,
        side_to_move: Color,
        castling: CastlingRights,
        en_passant: Option<Square>,
    ) -> Result<Self, PositionError> {
        let white_king = board.king_square(Color::White)?;
        let black_king = board.king_square(Color::Black)?;
        let mut state = GameState {
            board,
            side_to_move,
            castling,
            en_passant,
            white_king,
            black_king,
            history: Vec::new(),
            checkmate: false,
            stalemate: false,
        };
        state.legal_moves();
        Ok(state)
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the side to move.
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Returns the active castling rights.
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    /// Returns the square a pawn skipped on the immediately preceding double
    /// push, if any. Only that square is capturable en passant, and only now.
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant
    }

    /// Returns the cached location of the given king.
    pub fn king_square(&self, color: Color) -> Square {
        match color {
            Color::White => self.white_king,
            Color::Black => self.black_king,
        }
    }

    /// Returns the number of plies played.
    pub fn ply_count(&self) -> usize {
        self.history.len()
    }

    /// Returns the game history, oldest ply first.
    pub fn history(&self) -> &[PlyRecord] {
        &self.history
    }

    /// Returns the most recently played move.
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|record| record.mov)
    }

    /// Returns true if the side to move is in check right now.
    pub fn in_check(&self) -> bool {
        let us = self.side_to_move;
        analyze(&self.board, us, self.king_square(us)).in_check
    }

    /// Returns true if the last legal-move query found mate.
    pub fn is_checkmate(&self) -> bool {
        self.checkmate
    }

    /// Returns true if the last legal-move query found stalemate.
    pub fn is_stalemate(&self) -> bool {
        self.stalemate
    }

    /// Generates every legal move for the side to move and refreshes the
    /// terminal flags. Exactly one of checkmate/stalemate is set when the
    /// list comes back empty; both are cleared otherwise.
    pub fn legal_moves(&mut self) -> Vec<Move> {
        let (moves, in_check) = movegen::generate(self);
        if moves.is_empty() {
            self.checkmate = in_check;
            self.stalemate = !in_check;
        } else {
            self.checkmate = false;
            self.stalemate = false;
        }
        moves
    }

    /// Finds the legal move matching an engine-independent
    /// `(from, to, promotion)` identifier.
    pub fn find_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Option<Move> {
        self.legal_moves()
            .into_iter()
            .find(|m| m.matches(from, to, promotion))
    }

    /// Applies a move after verifying it against the current legal-move
    /// list. An illegal move is rejected without touching any state.
    pub fn make_move(&mut self, m: Move) -> Result<(), MoveError> {
        if !self.legal_moves().contains(&m) {
            return Err(MoveError::Illegal(m.to_uci()));
        }
        self.apply(m);
        self.legal_moves();
        Ok(())
    }

    /// Parses coordinate notation ("e2e4", "e7e8q") and applies the matching
    /// legal move.
    pub fn make_move_uci(&mut self, uci: &str) -> Result<(), MoveError> {
        let malformed = || MoveError::Malformed(uci.to_string());
        if !uci.is_ascii() || uci.len() < 4 || uci.len() > 5 {
            return Err(malformed());
        }
        let from = Square::from_algebraic(&uci[0..2]).ok_or_else(malformed)?;
        let to = Square::from_algebraic(&uci[2..4]).ok_or_else(malformed)?;
        let promotion = match &uci[4..] {
            "" => None,
            "n" => Some(Piece::Knight),
            "b" => Some(Piece::Bishop),
            "r" => Some(Piece::Rook),
            "q" => Some(Piece::Queen),
            _ => return Err(malformed()),
        };
        let m = self
            .find_move(from, to, promotion)
            .ok_or_else(|| MoveError::Illegal(uci.to_string()))?;
        self.apply(m);
        self.legal_moves();
        Ok(())
    }

    /// Takes back the most recent move. A no-op returning `None` when no
    /// moves have been played.
    pub fn undo_move(&mut self) -> Option<Move> {
        let record = self.history.pop()?;
        let m = record.mov;
        let us = m.color();
        let them = us.opposite();

        self.board.set(m.from(), Some((m.piece(), us)));
        self.board.set(m.to(), m.captured().map(|p| (p, them)));

        if m.flag() == MoveFlag::EnPassant {
            // The victim never stood on the destination square.
            self.board.set(m.to(), None);
            self.board
                .set(ep_victim_square(m), Some((Piece::Pawn, them)));
        }

        match m.flag() {
            MoveFlag::CastleKingside => self.slide_rook(m, File::F, File::H),
            MoveFlag::CastleQueenside => self.slide_rook(m, File::D, File::A),
            _ => {}
        }

        if m.piece() == Piece::King {
            self.set_king_square(us, m.from());
        }

        self.castling = record.castling_before;
        self.en_passant = record.en_passant_before;
        self.side_to_move = us;
        self.checkmate = false;
        self.stalemate = false;
        Some(m)
    }

    /// Applies a move known to be legal. Callers outside `make_move` are the
    /// generator-driven probes (SAN suffixes, perft) that only ever feed
    /// moves straight from `legal_moves`.
    pub(crate) fn apply(&mut self, m: Move) {
        self.history.push(PlyRecord {
            mov: m,
            castling_before: self.castling,
            en_passant_before: self.en_passant,
        });

        let us = m.color();
        self.board.set(m.from(), None);
        self.board.set(m.to(), Some((m.piece(), us)));

        if let Some(promoted) = m.promotion() {
            self.board.set(m.to(), Some((promoted, us)));
        }

        if m.flag() == MoveFlag::EnPassant {
            self.board.set(ep_victim_square(m), None);
        }

        match m.flag() {
            MoveFlag::CastleKingside => self.slide_rook(m, File::H, File::F),
            MoveFlag::CastleQueenside => self.slide_rook(m, File::A, File::D),
            _ => {}
        }

        if m.piece() == Piece::King {
            self.set_king_square(us, m.to());
        }

        self.en_passant = if m.flag() == MoveFlag::DoublePush {
            m.from().offset(us.pawn_direction(), 0)
        } else {
            None
        };

        self.update_castling_rights(m);
        self.side_to_move = self.side_to_move.opposite();
    }

    /// Moves the castling rook between its home and transit files on the
    /// moving side's back rank.
    fn slide_rook(&mut self, m: Move, from_file: File, to_file: File) {
        let rank = m.to().rank();
        let rook = self.board.piece_at(Square::new(from_file, rank));
        self.board.set(Square::new(from_file, rank), None);
        self.board.set(Square::new(to_file, rank), rook);
    }

    fn set_king_square(&mut self, color: Color, sq: Square) {
        match color {
            Color::White => self.white_king = sq,
            Color::Black => self.black_king = sq,
        }
    }

    /// Rights are lost when a king moves, when a rook leaves its home square,
    /// or when a rook is captured on its home square. Symmetric for both
    /// colors; never regained except by undo.
    fn update_castling_rights(&mut self, m: Move) {
        let us = m.color();
        let them = us.opposite();

        match m.piece() {
            Piece::King => self.castling.clear_color(us),
            Piece::Rook => {
                if m.from() == rook_home(us, false) {
                    self.castling.clear_queenside(us);
                } else if m.from() == rook_home(us, true) {
                    self.castling.clear_kingside(us);
                }
            }
            _ => {}
        }

        if m.captured() == Some(Piece::Rook) && m.flag() != MoveFlag::EnPassant {
            if m.to() == rook_home(them, false) {
                self.castling.clear_queenside(them);
            } else if m.to() == rook_home(them, true) {
                self.castling.clear_kingside(them);
            }
        }
    }
}

/// The square occupied by the pawn an en-passant capture removes: the
/// capturer's rank, the destination's file.
fn ep_victim_square(m: Move) -> Square {
    Square::new(m.to().file(), m.from().rank())
}

/// A rook's home square for castling-rights bookkeeping.
fn rook_home(color: Color, kingside: bool) -> Square {
    let rank = Rank::from_index(color.back_rank()).expect("back rank index is valid");
    let file = if kingside { File::H } else { File::A };
    Square::new(file, rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn snapshot(state: &GameState) -> (Board, Color, CastlingRights, Option<Square>) {
        (
            state.board().clone(),
            state.side_to_move(),
            state.castling_rights(),
            state.en_passant_target(),
        )
    }

    #[test]
    fn new_game_state() {
        let state = GameState::new();
        assert_eq!(state.side_to_move(), Color::White);
        assert_eq!(state.ply_count(), 0);
        assert!(!state.in_check());
        assert!(!state.is_checkmate());
        assert!(!state.is_stalemate());
        assert_eq!(state.king_square(Color::White), Square::E1);
        assert_eq!(state.king_square(Color::Black), Square::E8);
    }

    #[test]
    fn make_and_undo_restores_everything() {
        let mut state = GameState::new();
        let before = snapshot(&state);

        state.make_move_uci("e2e4").unwrap();
        assert_eq!(state.side_to_move(), Color::Black);
        assert_eq!(state.en_passant_target(), Some(sq("e3")));
        assert_eq!(state.ply_count(), 1);

        let undone = state.undo_move().unwrap();
        assert_eq!(undone.to_uci(), "e2e4");
        assert_eq!(snapshot(&state), before);
        assert_eq!(state.ply_count(), 0);
    }

    #[test]
    fn undo_with_no_history_is_a_noop() {
        let mut state = GameState::new();
        let before = snapshot(&state);
        assert_eq!(state.undo_move(), None);
        assert_eq!(snapshot(&state), before);
    }

    #[test]
    fn illegal_move_is_rejected_without_mutation() {
        let mut state = GameState::new();
        let before = snapshot(&state);
        let bogus = Move::new(
            sq("e2"),
            sq("e5"),
            Piece::Pawn,
            Color::White,
            None,
            MoveFlag::Normal,
        );
        assert_eq!(
            state.make_move(bogus),
            Err(MoveError::Illegal("e2e5".into()))
        );
        assert_eq!(snapshot(&state), before);
        assert_eq!(state.ply_count(), 0);
    }

    #[test]
    fn malformed_uci_is_rejected() {
        let mut state = GameState::new();
        assert!(matches!(
            state.make_move_uci("banana"),
            Err(MoveError::Malformed(_))
        ));
        assert!(matches!(
            state.make_move_uci("e2"),
            Err(MoveError::Malformed(_))
        ));
        assert!(matches!(
            state.make_move_uci("e2e8x"),
            Err(MoveError::Malformed(_))
        ));
    }

    #[test]
    fn en_passant_window_closes_after_one_ply() {
        let mut state = GameState::new();
        state.make_move_uci("e2e4").unwrap();
        state.make_move_uci("a7a6").unwrap();
        state.make_move_uci("e4e5").unwrap();
        state.make_move_uci("d7d5").unwrap();

        // Capture available right now.
        assert!(state.find_move(sq("e5"), sq("d6"), None).is_some());

        // One quiet move each: the pawn still stands on d5 but the window
        // is gone.
        state.make_move_uci("h2h3").unwrap();
        state.make_move_uci("h7h6").unwrap();
        assert_eq!(state.board().piece_at(sq("d5")), Some((Piece::Pawn, Color::Black)));
        assert!(state.find_move(sq("e5"), sq("d6"), None).is_none());
    }

    #[test]
    fn en_passant_apply_and_undo() {
        let mut state = GameState::new();
        for uci in ["e2e4", "a7a6", "e4e5", "d7d5"] {
            state.make_move_uci(uci).unwrap();
        }
        let before = snapshot(&state);

        state.make_move_uci("e5d6").unwrap();
        assert_eq!(state.board().piece_at(sq("d5")), None, "victim removed");
        assert_eq!(
            state.board().piece_at(sq("d6")),
            Some((Piece::Pawn, Color::White))
        );

        state.undo_move().unwrap();
        assert_eq!(snapshot(&state), before);
    }

    #[test]
    fn castling_moves_the_rook_both_ways() {
        let mut state = GameState::new();
        for uci in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"] {
            state.make_move_uci(uci).unwrap();
        }
        let before = snapshot(&state);

        state.make_move_uci("e1g1").unwrap();
        assert_eq!(
            state.board().piece_at(sq("g1")),
            Some((Piece::King, Color::White))
        );
        assert_eq!(
            state.board().piece_at(sq("f1")),
            Some((Piece::Rook, Color::White))
        );
        assert_eq!(state.board().piece_at(sq("h1")), None);
        assert_eq!(state.board().piece_at(sq("e1")), None);
        assert_eq!(state.king_square(Color::White), sq("g1"));
        assert!(!state.castling_rights().kingside(Color::White));
        assert!(!state.castling_rights().queenside(Color::White));

        state.undo_move().unwrap();
        assert_eq!(snapshot(&state), before);
        assert_eq!(state.king_square(Color::White), sq("e1"));
    }

    #[test]
    fn promotion_apply_and_undo() {
        let mut board = Board::empty();
        board.set(sq("a7"), Some((Piece::Pawn, Color::White)));
        board.set(sq("b8"), Some((Piece::Rook, Color::Black)));
        board.set(sq("e1"), Some((Piece::King, Color::White)));
        board.set(sq("h8"), Some((Piece::King, Color::Black)));
        let mut state =
            GameState::from_board(board, Color::White, CastlingRights::none(), None).unwrap();
        let before = snapshot(&state);

        state.make_move_uci("a7b8n").unwrap();
        assert_eq!(
            state.board().piece_at(sq("b8")),
            Some((Piece::Knight, Color::White))
        );
        assert_eq!(state.board().piece_at(sq("a7")), None);

        state.undo_move().unwrap();
        assert_eq!(snapshot(&state), before);
        assert_eq!(
            state.board().piece_at(sq("b8")),
            Some((Piece::Rook, Color::Black))
        );
    }

    #[test]
    fn rook_moves_and_captures_erode_castling_rights() {
        let mut state = GameState::new();
        for uci in ["h2h4", "a7a5", "h1h3", "a8a6"] {
            state.make_move_uci(uci).unwrap();
        }
        assert!(!state.castling_rights().kingside(Color::White));
        assert!(state.castling_rights().queenside(Color::White));
        assert!(!state.castling_rights().queenside(Color::Black));
        assert!(state.castling_rights().kingside(Color::Black));
    }

    #[test]
    fn capturing_a_home_rook_clears_the_right() {
        let mut board = Board::empty();
        board.set(sq("h8"), Some((Piece::Rook, Color::Black)));
        board.set(sq("e8"), Some((Piece::King, Color::Black)));
        board.set(sq("a8"), Some((Piece::Rook, Color::Black)));
        board.set(sq("h1"), Some((Piece::Bishop, Color::White)));
        board.set(sq("e1"), Some((Piece::King, Color::White)));
        let mut state =
            GameState::from_board(board, Color::White, CastlingRights::all(), None).unwrap();

        // Bishop runs h1-a8 and takes the queenside rook.
        state.make_move_uci("h1a8").unwrap();
        assert!(!state.castling_rights().queenside(Color::Black));
        assert!(state.castling_rights().kingside(Color::Black));

        state.undo_move().unwrap();
        assert!(state.castling_rights().queenside(Color::Black));
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut state = GameState::new();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            state.make_move_uci(uci).unwrap();
        }
        assert!(state.is_checkmate());
        assert!(!state.is_stalemate());
        assert!(state.in_check());
        assert!(state.legal_moves().is_empty());
    }

    #[test]
    fn stalemate_sets_only_the_stalemate_flag() {
        let mut board = Board::empty();
        board.set(sq("h8"), Some((Piece::King, Color::Black)));
        board.set(sq("f7"), Some((Piece::Queen, Color::White)));
        board.set(sq("g6"), Some((Piece::King, Color::White)));
        let mut state =
            GameState::from_board(board, Color::Black, CastlingRights::none(), None).unwrap();

        assert!(state.legal_moves().is_empty());
        assert!(state.is_stalemate());
        assert!(!state.is_checkmate());
        assert!(!state.in_check());
    }

    #[test]
    fn terminal_flags_clear_after_undo() {
        let mut state = GameState::new();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            state.make_move_uci(uci).unwrap();
        }
        assert!(state.is_checkmate());

        state.undo_move().unwrap();
        assert!(!state.is_checkmate());
        assert!(!state.is_stalemate());
        assert!(!state.legal_moves().is_empty());
    }

    #[test]
    fn queen_on_h5_is_safe_from_the_g8_knight() {
        let mut state = GameState::new();
        for uci in ["e2e4", "e7e5", "d1h5"] {
            state.make_move_uci(uci).unwrap();
        }
        let knight_moves: Vec<Move> = state
            .legal_moves()
            .into_iter()
            .filter(|m| m.from() == sq("g8"))
            .collect();
        assert!(!knight_moves.is_empty());
        assert!(knight_moves.iter().all(|m| m.to() != sq("h5")));
    }

    #[test]
    fn long_sequence_round_trips_exactly() {
        let mut state = GameState::new();
        let before = snapshot(&state);
        let plies = [
            "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7",
            "f1e1", "b7b5", "a4b3", "d7d6", "c2c3", "e8g8",
        ];
        for uci in plies {
            state.make_move_uci(uci).unwrap();
        }
        assert_eq!(state.ply_count(), plies.len());
        for _ in plies {
            state.undo_move().unwrap();
        }
        assert_eq!(snapshot(&state), before);
        assert_eq!(state.ply_count(), 0);
    }
}
