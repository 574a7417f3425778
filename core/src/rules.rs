// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game rules and validation logic

use crate::{board::Board, GameError, History, Move};

/// Result of a legal placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// History with the move appended
    pub history: History,
    /// Board after captures were resolved
    pub board: Board,
    /// Number of opposing stones removed by the move
    pub captured: usize,
}

/// Validates placements against a committed history.
///
/// The caller's history is only borrowed; a rejected move never touches it.
pub struct RuleValidator<'a> {
    history: &'a [Move],
    board_size: u8,
}

impl<'a> RuleValidator<'a> {
    /// Create a new rules validator
    pub fn new(history: &'a [Move], board_size: u8) -> Self {
        Self {
            history,
            board_size,
        }
    }

    /// Check a placement in order: bounds, occupancy, suicide, simple ko.
    pub fn check_move(&self, mv: Move) -> Result<Accepted, GameError> {
        let coord = mv.coord();
        if !coord.is_valid(self.board_size) {
            return Err(GameError::OutOfBounds);
        }

        let current = Board::from_history(self.history, self.board_size);
        if !current.get(coord).is_empty() {
            return Err(GameError::Occupied);
        }

        let mut history = self.history.to_vec();
        history.push(mv);
        let mut board = current;
        let captured = board.play_move(coord, mv.color);

        // Captures are already applied, so only a group that is still
        // enclosed counts as suicide
        if !board.check_liberties(coord, mv.color) {
            tracing::debug!(x = mv.x, y = mv.y, color = %mv.color, "Suicide rejected");
            return Err(GameError::Suicide);
        }

        // Only the position two plies back is compared
        let two_back = Board::from_history(&history[..history.len().saturating_sub(2)], self.board_size);
        if two_back == board {
            tracing::debug!(x = mv.x, y = mv.y, color = %mv.color, "Ko violation detected");
            return Err(GameError::Ko);
        }

        Ok(Accepted {
            history,
            board,
            captured,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Coord, Stone};

    #[test]
    fn out_of_bounds_rejected() {
        let validator = RuleValidator::new(&[], 9);
        let mv = Move::place(Color::Black, Coord::new(9, 3));
        assert_eq!(validator.check_move(mv), Err(GameError::OutOfBounds));
    }

    #[test]
    fn occupied_rejected_without_touching_history() {
        let history = vec![Move::place(Color::Black, Coord::new(4, 4))];
        let validator = RuleValidator::new(&history, 9);
        let result = validator.check_move(Move::place(Color::White, Coord::new(4, 4)));
        assert_eq!(result, Err(GameError::Occupied));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn capture_takes_priority_over_suicide() {
        // White at (0,0) is in atari; Black fills (0,1) with no liberties of
        // its own until the capture opens (0,0).
        let history = vec![
            Move::place(Color::Black, Coord::new(1, 0)),
            Move::place(Color::White, Coord::new(0, 0)),
            Move::place(Color::Black, Coord::new(8, 8)),
            Move::place(Color::White, Coord::new(1, 1)),
            Move::place(Color::Black, Coord::new(8, 7)),
            Move::place(Color::White, Coord::new(0, 2)),
        ];
        let validator = RuleValidator::new(&history, 9);
        let accepted = validator
            .check_move(Move::place(Color::Black, Coord::new(0, 1)))
            .unwrap();
        assert_eq!(accepted.captured, 1);
        assert_eq!(accepted.board.get(Coord::new(0, 0)), Stone::Empty);
        assert_eq!(accepted.history.len(), 7);
    }
}
