// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board representation, capture resolution and liberty queries

use crate::{Color, Coord, Move, Stone};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A square grid of stones.
///
/// Never persisted on its own: any board is reproducible by replaying the
/// history it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Size of the board (typically 9, 13, or 19)
    size: u8,
    /// Positions on the board, row-major
    positions: Vec<Stone>,
}

impl Board {
    /// Create a new empty board with the specified size
    pub fn new(size: u8) -> Self {
        let cells = (size as usize) * (size as usize);
        Self {
            size,
            positions: vec![Stone::Empty; cells],
        }
    }

    /// Rebuild a board by playing every non-pass move of `history` in order
    pub fn from_history(history: &[Move], size: u8) -> Self {
        let mut board = Self::new(size);
        for mv in history.iter().filter(|mv| !mv.pass) {
            board.play_move(mv.coord(), mv.color);
        }
        board
    }

    /// Get the size of the board
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Get the stone at the specified coordinate; off-board reads as empty
    pub fn get(&self, coord: Coord) -> Stone {
        if !coord.is_valid(self.size) {
            return Stone::Empty;
        }
        self.positions[self.coord_to_index(coord)]
    }

    fn set(&mut self, coord: Coord, stone: Stone) {
        let idx = self.coord_to_index(coord);
        self.positions[idx] = stone;
    }

    /// Convert a coordinate to a vector index
    fn coord_to_index(&self, coord: Coord) -> usize {
        (coord.y as usize) * (self.size as usize) + (coord.x as usize)
    }

    /// Place a stone of `color` and remove any opposing groups left without
    /// liberties. Returns the number of stones captured.
    ///
    /// Legality is the caller's concern; this only guards array bounds.
    pub fn play_move(&mut self, coord: Coord, color: Color) -> usize {
        if !coord.is_valid(self.size) {
            tracing::warn!(x = coord.x, y = coord.y, size = self.size, "Ignoring off-board move");
            return 0;
        }

        self.set(coord, color.into());

        let opponent = color.opposite();
        let mut captured = 0;
        let neighbors: Vec<Coord> = coord.neighbors(self.size).collect();
        for neighbor in neighbors {
            // An earlier neighbour's capture may already have emptied this one
            if self.get(neighbor) != Stone::from(opponent) {
                continue;
            }
            if !self.check_liberties(neighbor, opponent) {
                let group = self.group(neighbor);
                for stone in &group {
                    self.set(*stone, Stone::Empty);
                }
                captured += group.len();
            }
        }

        if captured > 0 {
            tracing::debug!(x = coord.x, y = coord.y, %color, captured, "Stones captured");
        }
        captured
    }

    /// True iff the group of `color` containing `coord` touches an empty
    /// intersection.
    ///
    /// The search spreads through `color` stones only and stops at the board
    /// edge and at opposing stones. Every call uses its own visited set.
    pub fn check_liberties(&self, coord: Coord, color: Color) -> bool {
        let own = Stone::from(color);
        let mut visited = HashSet::from([coord]);
        let mut stack = vec![coord];

        while let Some(current) = stack.pop() {
            for neighbor in current.neighbors(self.size) {
                match self.get(neighbor) {
                    Stone::Empty => return true,
                    stone if stone == own && visited.insert(neighbor) => stack.push(neighbor),
                    _ => {}
                }
            }
        }

        false
    }

    /// All stones connected to the stone at `coord`; empty for an empty point
    pub fn group(&self, coord: Coord) -> Vec<Coord> {
        let target = self.get(coord);
        if target.is_empty() {
            return Vec::new();
        }

        let mut group = Vec::new();
        let mut visited = HashSet::from([coord]);
        let mut stack = vec![coord];

        while let Some(current) = stack.pop() {
            group.push(current);
            for neighbor in current.neighbors(self.size) {
                if self.get(neighbor) == target && visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }

        group
    }

    /// Numeric grid for external consumers, indexed `grid[x][y]`.
    ///
    /// Each cell serializes as 0 (empty), 1 (black) or 2 (white).
    pub fn convert_to_integer(&self) -> Vec<Vec<Stone>> {
        (0..self.size)
            .map(|x| (0..self.size).map(|y| self.get(Coord::new(x, y))).collect())
            .collect()
    }

    /// Count stones of the specified color
    pub fn count_stones(&self, color: Color) -> usize {
        let stone = Stone::from(color);
        self.positions.iter().filter(|s| **s == stone).count()
    }

    /// Every coordinate on the board, row by row
    pub fn coords(&self) -> impl Iterator<Item = Coord> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| Coord::new(x, y)))
    }
}
