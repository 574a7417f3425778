// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII board rendering for the CLI.

use goroom_core::{Coord, Stone};

/// Render a `grid[x][y]` board as ASCII art
pub fn render_board(grid: &[Vec<Stone>]) -> String {
    let size = grid.len() as u8;
    let mut output = String::new();

    column_labels(&mut output, size);

    for row in 0..size {
        output.push_str(&format!("{:2} ", row));

        for col in 0..size {
            let stone = grid
                .get(col as usize)
                .and_then(|column| column.get(row as usize))
                .copied()
                .unwrap_or_default();
            let symbol = match stone {
                Stone::Black => "●",
                Stone::White => "○",
                Stone::Empty if is_star_point(Coord::new(col, row), size) => "*",
                Stone::Empty => "+",
            };
            output.push_str(&format!(" {}", symbol));
        }

        output.push_str(&format!(" {}", row));
        output.push('\n');
    }

    column_labels(&mut output, size);
    output
}

fn column_labels(output: &mut String, size: u8) {
    output.push_str("   ");
    for col in 0..size {
        output.push_str(&format!(" {}", coord_to_column_char(col)));
    }
    output.push('\n');
}

/// Convert a column index to a column character (A-T, skipping I)
pub fn coord_to_column_char(col: u8) -> char {
    if col < 8 {
        (b'A' + col) as char
    } else {
        (b'A' + col + 1) as char
    }
}

/// Inverse of [`coord_to_column_char`], case-insensitive
pub fn column_char_to_coord(c: char) -> Option<u8> {
    match c.to_ascii_lowercase() {
        c @ 'a'..='h' => Some(c as u8 - b'a'),
        c @ 'j'..='t' => Some(c as u8 - b'a' - 1),
        _ => None,
    }
}

fn is_star_point(coord: Coord, board_size: u8) -> bool {
    let (x, y) = (coord.x, coord.y);

    match board_size {
        9 => matches!((x, y), (2, 2) | (2, 6) | (4, 4) | (6, 2) | (6, 6)),
        13 => matches!((x, y), (3, 3) | (3, 9) | (6, 6) | (9, 3) | (9, 9)),
        19 => matches!(
            (x, y),
            (3, 3) | (3, 9) | (3, 15) |
            (9, 3) | (9, 9) | (9, 15) |
            (15, 3) | (15, 9) | (15, 15)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goroom_core::{Board, Color, Coord, Move};

    #[test]
    fn test_render_empty_9x9_board() {
        let output = render_board(&Board::new(9).convert_to_integer());

        // Column labels skip I
        assert!(output.contains("A B C D E F G H J"));
        assert!(output.contains(" 0 "));
        assert!(output.contains(" 8 "));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_render_board_with_stones() {
        let history = vec![
            Move::place(Color::Black, Coord::new(4, 4)),
            Move::place(Color::White, Coord::new(1, 0)),
        ];
        let output = render_board(&Board::from_history(&history, 9).convert_to_integer());

        let lines: Vec<&str> = output.lines().collect();
        // Row 0 holds the white stone in column B
        assert!(lines[1].starts_with(" 0  + ○ +"));
        assert!(lines[5].contains("●"));
        assert!(!lines[5].contains("○"));
    }

    #[test]
    fn test_column_chars() {
        assert_eq!(coord_to_column_char(0), 'A');
        assert_eq!(coord_to_column_char(8), 'J');
        assert_eq!(coord_to_column_char(18), 'T');
        assert_eq!(column_char_to_coord('J'), Some(8));
        assert_eq!(column_char_to_coord('d'), Some(3));
        assert_eq!(column_char_to_coord('i'), None);
    }

    #[test]
    fn test_star_points() {
        assert!(is_star_point(Coord::new(4, 4), 9));
        assert!(!is_star_point(Coord::new(0, 0), 9));
        assert!(is_star_point(Coord::new(9, 9), 19));
    }
}
