// SPDX-License-Identifier: MIT OR Apache-2.0

//! goroom core - Go rules and board logic
//!
//! This crate provides the synchronous game functionality:
//! - Board representation, capture resolution and liberty queries
//! - Move legality (bounds, occupancy, suicide, simple ko)
//! - Territory + stone scoring with komi
//! - Replay frame resolution over an append-only move history

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod board;
pub mod replay;
pub mod rules;
pub mod scoring;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

pub use board::Board;
pub use replay::ReplayFrame;
pub use rules::{Accepted, RuleValidator};
pub use scoring::{count_points, Score, KOMI};

/// Player color in a Go game (Black or White)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Black player (moves first)
    Black,
    /// White player
    White,
}

impl Color {
    /// Returns the opposite color
    pub fn opposite(&self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Integer encoding used by the AI contract (1 = Black, 2 = White)
    pub fn code(&self) -> u8 {
        match self {
            Color::Black => 1,
            Color::White => 2,
        }
    }

    /// Inverse of [`Color::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Color::Black),
            2 => Some(Color::White),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// Contents of a single intersection.
///
/// Serializes as the integer grid value consumed by the AI service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum Stone {
    #[default]
    Empty = 0,
    Black = 1,
    White = 2,
}

impl Stone {
    pub fn is_empty(&self) -> bool {
        matches!(self, Stone::Empty)
    }

    /// The color of the stone, if any
    pub fn color(&self) -> Option<Color> {
        match self {
            Stone::Empty => None,
            Stone::Black => Some(Color::Black),
            Stone::White => Some(Color::White),
        }
    }
}

impl From<Color> for Stone {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Stone::Black,
            Color::White => Stone::White,
        }
    }
}

/// Board coordinate representing a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (column)
    pub x: u8,
    /// Y coordinate (row)
    pub y: u8,
}

impl Coord {
    /// Create a new coordinate
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Check if coordinate is valid for a board of given size
    pub fn is_valid(&self, board_size: u8) -> bool {
        self.x < board_size && self.y < board_size
    }

    /// Orthogonal neighbours that lie on a board of the given size
    pub fn neighbors(&self, board_size: u8) -> impl Iterator<Item = Coord> + '_ {
        let Coord { x, y } = *self;
        [
            x.checked_sub(1).map(|nx| Coord::new(nx, y)),
            y.checked_sub(1).map(|ny| Coord::new(x, ny)),
            x.checked_add(1).map(|nx| Coord::new(nx, y)),
            y.checked_add(1).map(|ny| Coord::new(x, ny)),
        ]
        .into_iter()
        .flatten()
        .filter(move |c| c.is_valid(board_size))
    }
}

/// One ply of the history. Immutable once appended.
///
/// Passes keep the coordinates they were submitted with so the AI service
/// always receives a complete `last` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub color: Color,
    pub x: u8,
    pub y: u8,
    pub pass: bool,
}

impl Move {
    /// A stone placement
    pub fn place(color: Color, coord: Coord) -> Self {
        Self {
            color,
            x: coord.x,
            y: coord.y,
            pass: false,
        }
    }

    /// A pass by `color`
    pub fn pass(color: Color) -> Self {
        Self {
            color,
            x: 0,
            y: 0,
            pass: true,
        }
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// Ordered, append-only move log; the single source of truth for a match.
pub type History = Vec<Move>;

/// Color whose turn it is: whoever did not play last, Black on an empty history.
pub fn next_color(history: &[Move]) -> Color {
    history
        .last()
        .map(|mv| mv.color.opposite())
        .unwrap_or(Color::Black)
}

/// True when the two trailing plies are both passes.
pub fn ends_with_two_passes(history: &[Move]) -> bool {
    match history {
        [.., a, b] => a.pass && b.pass,
        _ => false,
    }
}

/// Errors that reject a candidate move
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    /// The coordinate is outside the board
    #[error("Move is outside the board")]
    OutOfBounds,

    /// The position is already occupied
    #[error("Spot is occupied by another piece")]
    Occupied,

    /// The move would leave its own group without liberties
    #[error("Move would result in suicide")]
    Suicide,

    /// The move recreates the position from two plies earlier
    #[error("Move would recreate a prior board position")]
    Ko,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_color_alternates_from_last_move() {
        assert_eq!(next_color(&[]), Color::Black);
        let history = vec![Move::place(Color::Black, Coord::new(2, 2))];
        assert_eq!(next_color(&history), Color::White);
        let history = vec![Move::pass(Color::White)];
        assert_eq!(next_color(&history), Color::Black);
    }

    #[test]
    fn two_trailing_passes_detected() {
        assert!(!ends_with_two_passes(&[Move::pass(Color::Black)]));
        let history = vec![
            Move::place(Color::Black, Coord::new(0, 0)),
            Move::pass(Color::White),
            Move::pass(Color::Black),
        ];
        assert!(ends_with_two_passes(&history));
        let history = vec![Move::pass(Color::Black), Move::place(Color::White, Coord::new(1, 1))];
        assert!(!ends_with_two_passes(&history));
    }

    #[test]
    fn neighbors_respect_edges() {
        let corner: Vec<_> = Coord::new(0, 0).neighbors(9).collect();
        assert_eq!(corner, vec![Coord::new(1, 0), Coord::new(0, 1)]);
        assert_eq!(Coord::new(4, 4).neighbors(9).count(), 4);
        assert_eq!(Coord::new(8, 8).neighbors(9).count(), 2);
        assert_eq!(Coord::new(0, 0).neighbors(1).count(), 0);
    }

    #[test]
    fn stone_serializes_as_integer() {
        let json = serde_json::to_string(&[Stone::Empty, Stone::Black, Stone::White]).unwrap();
        assert_eq!(json, "[0,1,2]");
    }

    #[test]
    fn color_codes_roundtrip() {
        assert_eq!(Color::from_code(Color::White.code()), Some(Color::White));
        assert_eq!(Color::from_code(0), None);
    }
}
