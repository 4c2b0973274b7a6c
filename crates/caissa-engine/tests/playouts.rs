//! Random-playout properties for the full engine.
//!
//! Each case drives a game from the starting position with an arbitrary
//! sequence of move choices, then checks the invariants that must hold on
//! every reachable position: generated moves never expose the mover's king,
//! terminal flags appear exactly when the move list dries up, and unwinding
//! the whole game restores the starting state bit for bit.

use caissa_engine::{analyze, GameState};
use caissa_core::Piece;
use proptest::prelude::*;

fn snapshot(state: &GameState) -> String {
    format!(
        "{:?}|{:?}|{:?}|{:?}",
        state.board(),
        state.side_to_move(),
        state.castling_rights(),
        state.en_passant_target()
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn playout_round_trips_to_the_start(choices in prop::collection::vec(any::<u16>(), 1..80)) {
        let mut state = GameState::new();
        let before = snapshot(&state);

        let mut played = 0usize;
        for choice in choices {
            let moves = state.legal_moves();
            if moves.is_empty() {
                break;
            }
            let m = moves[choice as usize % moves.len()];
            state.make_move(m).unwrap();
            played += 1;
        }

        for _ in 0..played {
            prop_assert!(state.undo_move().is_some());
        }
        prop_assert_eq!(state.undo_move(), None);
        prop_assert_eq!(snapshot(&state), before);
        prop_assert_eq!(state.ply_count(), 0);
    }

    #[test]
    fn no_generated_move_exposes_the_king(choices in prop::collection::vec(any::<u16>(), 1..40)) {
        let mut state = GameState::new();

        for choice in choices {
            let moves = state.legal_moves();
            if moves.is_empty() {
                break;
            }

            // Every generated move must leave the mover's own king safe.
            let mover = state.side_to_move();
            for &m in &moves {
                state.make_move(m).unwrap();
                let king = state.king_square(mover);
                let report = analyze(state.board(), mover, king);
                prop_assert!(
                    !report.in_check,
                    "move {} left the {} king attacked",
                    m,
                    mover
                );
                state.undo_move();
            }

            let m = moves[choice as usize % moves.len()];
            state.make_move(m).unwrap();
        }
    }

    #[test]
    fn terminal_flags_match_empty_move_lists(choices in prop::collection::vec(any::<u16>(), 1..80)) {
        let mut state = GameState::new();

        for choice in choices {
            let moves = state.legal_moves();
            if moves.is_empty() {
                prop_assert!(state.is_checkmate() ^ state.is_stalemate());
                prop_assert_eq!(state.is_checkmate(), state.in_check());
                break;
            }
            prop_assert!(!state.is_checkmate());
            prop_assert!(!state.is_stalemate());

            let m = moves[choice as usize % moves.len()];
            state.make_move(m).unwrap();
        }
    }

    #[test]
    fn double_check_permits_only_king_moves(choices in prop::collection::vec(any::<u16>(), 1..60)) {
        let mut state = GameState::new();

        for choice in choices {
            let moves = state.legal_moves();
            if moves.is_empty() {
                break;
            }

            let us = state.side_to_move();
            let report = analyze(state.board(), us, state.king_square(us));
            if report.checks.len() > 1 {
                for m in &moves {
                    prop_assert_eq!(m.piece(), Piece::King);
                }
            }

            let m = moves[choice as usize % moves.len()];
            state.make_move(m).unwrap();
        }
    }
}
