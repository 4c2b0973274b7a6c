//! Perft (performance test) for move generator validation.
//!
//! Perft counts leaf nodes at a given depth for comparison against
//! known-correct values. It doubles as a workout for make/undo: every node
//! is reached by applying a move in place and taken back on the way out.

use crate::game::GameState;

/// Counts the number of leaf nodes at the given depth.
pub fn perft(state: &mut GameState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = state.legal_moves();

    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0u64;
    for m in moves {
        state.apply(m);
        nodes += perft(state, depth - 1);
        state.undo_move();
    }
    nodes
}

/// Perft with divide - shows the node count under each root move.
/// Useful for pinning down which move has an incorrect subtree.
pub fn perft_divide(state: &mut GameState, depth: u32) -> Vec<(String, u64)> {
    let moves = state.legal_moves();
    let mut results = Vec::with_capacity(moves.len());

    for m in moves {
        let nodes = if depth > 1 {
            state.apply(m);
            let nodes = perft(state, depth - 1);
            state.undo_move();
            nodes
        } else {
            1
        };
        results.push((m.to_uci(), nodes));
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}
