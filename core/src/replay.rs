// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stepping through a recorded history

use crate::{board::Board, ends_with_two_passes, scoring::Score, Move};
use serde::{Deserialize, Serialize};

/// One position of a replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub board: Board,
    /// Clamped index actually shown
    pub index: usize,
    /// True when this is the final position of a finished match
    pub is_final: bool,
    /// Present only on the final position of a finished match
    pub score: Option<Score>,
}

/// Highest replay index for a history.
///
/// The two closing passes of a finished match are left out of the range. A
/// match that ended any other way (resignation) keeps every ply.
pub fn max_index(history: &[Move], game_over: bool) -> usize {
    if game_over && ends_with_two_passes(history) {
        history.len().saturating_sub(2)
    } else {
        history.len()
    }
}

impl ReplayFrame {
    /// Board after the first `index` plies, with `index` clamped to
    /// `[0, max_index]`.
    pub fn resolve(
        history: &[Move],
        board_size: u8,
        game_over: bool,
        index: i64,
        komi: f32,
    ) -> Self {
        let max = max_index(history, game_over);
        let index = index.clamp(0, max as i64) as usize;
        let board = Board::from_history(&history[..index], board_size);
        let is_final = game_over && index == max;
        let score = is_final.then(|| Score::of(&board, komi));

        Self {
            board,
            index,
            is_final,
            score,
        }
    }
}
