use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::board::GameError;

/// Number of squares on a side of the board
pub const SIZE: usize = 9;

/// The throne (castle) in the centre of the board
pub const THRONE: Square = sq(4, 4);

/// The four squares orthogonally adjacent to the throne
pub const THRONE_NEIGHBORS: [Square; 4] = [sq(4, 5), sq(5, 4), sq(4, 3), sq(3, 4)];

/// The four rook directions. Capture resolution walks them in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// (column delta, row delta) of one step
    fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }
}

/// A board coordinate. Column 0 is file `a`, row 0 is rank `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    col: usize,
    row: usize,
}

/// Square at (COL, ROW). Panics if either is outside the board; use
/// [`Square::new`] for unchecked input.
pub const fn sq(col: usize, row: usize) -> Square {
    assert!(col < SIZE && row < SIZE, "square outside the board");
    Square { col, row }
}

impl Square {
    pub fn new(col: usize, row: usize) -> Option<Square> {
        if col < SIZE && row < SIZE {
            Some(Square { col, row })
        } else {
            None
        }
    }

    pub fn col(self) -> usize {
        self.col
    }

    pub fn row(self) -> usize {
        self.row
    }

    /// Row-major index in `0..SIZE * SIZE`
    pub fn index(self) -> usize {
        self.row * SIZE + self.col
    }

    /// Every square, row 1 first, files a to i within a row
    pub fn all() -> impl Iterator<Item = Square> {
        (0..SIZE).flat_map(|row| (0..SIZE).map(move |col| Square { col, row }))
    }

    pub fn is_edge(self) -> bool {
        self.col == 0 || self.row == 0 || self.col == SIZE - 1 || self.row == SIZE - 1
    }

    pub fn is_throne(self) -> bool {
        self == THRONE
    }

    pub fn is_throne_neighbor(self) -> bool {
        THRONE_NEIGHBORS.contains(&self)
    }

    /// The square STEPS away in direction DIR, or `None` off the board
    pub fn rook_move(self, dir: Direction, steps: usize) -> Option<Square> {
        let (dc, dr) = dir.delta();
        let col = self.col as isize + dc * steps as isize;
        let row = self.row as isize + dr * steps as isize;
        if col < 0 || row < 0 {
            return None;
        }
        Square::new(col as usize, row as usize)
    }

    /// True iff OTHER lies on the same row or column (and is not this square)
    pub fn is_rook_move(self, other: Square) -> bool {
        self != other && (self.col == other.col || self.row == other.row)
    }

    /// Direction from this square toward OTHER along a rook line
    pub fn direction(self, other: Square) -> Option<Direction> {
        if !self.is_rook_move(other) {
            return None;
        }
        let dir = if other.row > self.row {
            Direction::North
        } else if other.row < self.row {
            Direction::South
        } else if other.col > self.col {
            Direction::East
        } else {
            Direction::West
        };
        Some(dir)
    }

    /// Number of single steps between two squares on a rook line
    pub fn distance(self, other: Square) -> usize {
        self.col
            .abs_diff(other.col)
            .max(self.row.abs_diff(other.row))
    }

    /// The square strictly between this one and OTHER, when they are exactly
    /// two rook steps apart
    pub fn between(self, other: Square) -> Option<Square> {
        let dir = self.direction(other)?;
        if self.distance(other) != 2 {
            return None;
        }
        self.rook_move(dir, 1)
    }

    /// Orthogonally adjacent squares that exist on the board
    pub fn neighbors(self) -> impl Iterator<Item = Square> {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.rook_move(dir, 1))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col as u8) as char, self.row + 1)
    }
}

impl FromStr for Square {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidSquare(s.to_string());
        let mut chars = s.chars();
        let col = match chars.next() {
            Some(c @ 'a'..='i') => c as usize - 'a' as usize,
            _ => return Err(invalid()),
        };
        let rank: usize = chars.as_str().parse().map_err(|_| invalid())?;
        if !(1..=SIZE).contains(&rank) {
            return Err(invalid());
        }
        Ok(Square { col, row: rank - 1 })
    }
}

impl TryFrom<String> for Square {
    type Error = GameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> String {
        square.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_squares() {
        assert!(sq(0, 4).is_edge());
        assert!(sq(8, 8).is_edge());
        assert!(sq(3, 0).is_edge());
        assert!(!sq(1, 1).is_edge());
        assert!(!THRONE.is_edge());
    }

    #[test]
    fn test_rook_move_stays_on_board() {
        assert_eq!(sq(4, 4).rook_move(Direction::North, 2), Some(sq(4, 6)));
        assert_eq!(sq(4, 4).rook_move(Direction::East, 4), Some(sq(8, 4)));
        assert_eq!(sq(4, 4).rook_move(Direction::East, 5), None);
        assert_eq!(sq(0, 3).rook_move(Direction::West, 1), None);
        assert_eq!(sq(2, 1).rook_move(Direction::South, 1), Some(sq(2, 0)));
        assert_eq!(sq(2, 1).rook_move(Direction::South, 2), None);
    }

    #[test]
    fn test_direction_and_distance() {
        assert_eq!(sq(1, 1).direction(sq(1, 7)), Some(Direction::North));
        assert_eq!(sq(1, 7).direction(sq(1, 1)), Some(Direction::South));
        assert_eq!(sq(1, 1).direction(sq(6, 1)), Some(Direction::East));
        assert_eq!(sq(6, 1).direction(sq(0, 1)), Some(Direction::West));
        assert_eq!(sq(1, 1).direction(sq(2, 2)), None);
        assert_eq!(sq(1, 1).direction(sq(1, 1)), None);
        assert_eq!(sq(1, 1).distance(sq(1, 7)), 6);
    }

    #[test]
    fn test_rook_lines() {
        assert!(sq(0, 0).is_rook_move(sq(0, 8)));
        assert!(sq(0, 0).is_rook_move(sq(5, 0)));
        assert!(!sq(0, 0).is_rook_move(sq(1, 1)));
        assert!(!sq(3, 3).is_rook_move(sq(3, 3)));
    }

    #[test]
    fn test_between() {
        assert_eq!(sq(2, 4).between(sq(4, 4)), Some(sq(3, 4)));
        assert_eq!(sq(4, 6).between(sq(4, 4)), Some(sq(4, 5)));
        assert_eq!(sq(2, 4).between(sq(5, 4)), None);
        assert_eq!(sq(2, 4).between(sq(3, 5)), None);
    }

    #[test]
    fn test_neighbors_clip_at_corners() {
        let corner: Vec<Square> = sq(0, 0).neighbors().collect();
        assert_eq!(corner, vec![sq(0, 1), sq(1, 0)]);
        assert_eq!(THRONE.neighbors().count(), 4);
        for n in THRONE.neighbors() {
            assert!(n.is_throne_neighbor());
        }
    }

    #[test]
    fn test_text_form() {
        assert_eq!(sq(0, 0).to_string(), "a1");
        assert_eq!(THRONE.to_string(), "e5");
        assert_eq!("i9".parse::<Square>().unwrap(), sq(8, 8));
        assert!("j1".parse::<Square>().is_err());
        assert!("a0".parse::<Square>().is_err());
        assert!("a10".parse::<Square>().is_err());
        assert!("".parse::<Square>().is_err());
    }

    #[test]
    fn test_all_covers_the_grid() {
        let all: Vec<Square> = Square::all().collect();
        assert_eq!(all.len(), SIZE * SIZE);
        for (i, square) in all.iter().enumerate() {
            assert_eq!(square.index(), i);
        }
    }
}
