//! Board coordinates and movement directions.

use serde::{Deserialize, Serialize};

/// A cell on the board. `(0, 0)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    /// Color tag applied to this body segment when rendered (head uses the
    /// snake's primary color, tail segments may carry their own).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, color: None }
    }

    pub fn with_color(x: i32, y: i32, color: Option<String>) -> Self {
        Self { x, y, color }
    }

    /// Ignores `color` — two positions at the same cell are equal regardless
    /// of which segment's color they happen to carry.
    pub fn same_cell(&self, other: &Position) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn apply_direction(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.unit_vector();
        Position {
            x: self.x + dx,
            y: self.y + dy,
            color: self.color.clone(),
        }
    }

    pub fn in_bounds(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }

    pub fn neighbors(&self, width: i32, height: i32) -> Vec<Position> {
        Direction::ALL
            .iter()
            .map(|d| self.apply_direction(*d))
            .filter(|p| p.in_bounds(width, height))
            .collect()
    }
}

/// Movement direction. Default is `Up`, matching a freshly-reset snake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Up
    }
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn unit_vector(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_direction_moves_one_cell() {
        let p = Position::new(5, 5);
        assert_eq!(p.apply_direction(Direction::Up), Position::new(5, 6));
        assert_eq!(p.apply_direction(Direction::Down), Position::new(5, 4));
        assert_eq!(p.apply_direction(Direction::Left), Position::new(4, 5));
        assert_eq!(p.apply_direction(Direction::Right), Position::new(6, 5));
    }

    #[test]
    fn out_of_bounds_is_detected_without_saturating() {
        let p = Position::new(0, 0);
        let moved = p.apply_direction(Direction::Down);
        assert_eq!(moved, Position::new(0, -1));
        assert!(!moved.in_bounds(5, 5));
    }

    #[test]
    fn direction_from_str_is_case_insensitive() {
        assert_eq!(Direction::from_str("UP"), Some(Direction::Up));
        assert_eq!(Direction::from_str("Left"), Some(Direction::Left));
        assert_eq!(Direction::from_str("diagonal"), None);
    }
}
