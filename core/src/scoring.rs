// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stone + territory scoring

use crate::{board::Board, Color, Coord, Stone};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Bonus awarded to White for moving second
pub const KOMI: f32 = 5.5;

/// Final score of both colors on one board
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub black: f32,
    pub white: f32,
}

impl Score {
    /// Score both colors with the given komi
    pub fn of(board: &Board, komi: f32) -> Self {
        Self {
            black: count_points_with_komi(board, Color::Black, 0.0),
            white: count_points_with_komi(board, Color::White, komi),
        }
    }

    pub fn for_color(&self, color: Color) -> f32 {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }
}

/// Stones of `color` plus the territory it encloses, plus komi for White.
pub fn count_points(board: &Board, color: Color) -> f32 {
    let komi = match color {
        Color::Black => 0.0,
        Color::White => KOMI,
    };
    count_points_with_komi(board, color, komi)
}

/// Like [`count_points`] with an explicit bonus added to the result.
pub fn count_points_with_komi(board: &Board, color: Color, komi: f32) -> f32 {
    let stones = board.count_stones(color);
    komi + (stones + territory(board, color)) as f32
}

/// Empty points in regions bordered by `color` and never by its opponent.
///
/// The board edge is neutral. A region that touches no stones at all belongs
/// to nobody. Each call keeps its own visited set.
pub fn territory(board: &Board, color: Color) -> usize {
    let mut seen = HashSet::<Coord>::new();
    let mut total = 0;

    for start in board.coords() {
        if !board.get(start).is_empty() || seen.contains(&start) {
            continue;
        }
        let (region, borders) = region_and_borders(board, start, &mut seen);
        if borders.contains(&Stone::from(color)) && !borders.contains(&Stone::from(color.opposite())) {
            total += region;
        }
    }

    total
}

/// BFS over empty points; returns (region size, bordering stones)
fn region_and_borders(
    board: &Board,
    start: Coord,
    global_seen: &mut HashSet<Coord>,
) -> (usize, HashSet<Stone>) {
    let mut q = VecDeque::from([start]);
    let mut region = 1;
    let mut borders = HashSet::new();
    global_seen.insert(start);

    while let Some(c) = q.pop_front() {
        for n in c.neighbors(board.size()) {
            match board.get(n) {
                Stone::Empty => {
                    if global_seen.insert(n) {
                        region += 1;
                        q.push_back(n);
                    }
                }
                stone => {
                    borders.insert(stone);
                }
            }
        }
    }
    (region, borders)
}
