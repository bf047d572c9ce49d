use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::moves::Move;
use crate::square::{Direction, SIZE, Square, THRONE, sq};

/// Attackers (black) in the initial position
pub const INITIAL_ATTACKERS: [Square; 16] = [
    sq(0, 3),
    sq(0, 4),
    sq(0, 5),
    sq(1, 4),
    sq(8, 3),
    sq(8, 4),
    sq(8, 5),
    sq(7, 4),
    sq(3, 0),
    sq(4, 0),
    sq(5, 0),
    sq(4, 1),
    sq(3, 8),
    sq(4, 8),
    sq(5, 8),
    sq(4, 7),
];

/// Defenders of the king (white) in the initial position
pub const INITIAL_DEFENDERS: [Square; 8] = [
    sq(4, 5),
    sq(5, 4),
    sq(4, 3),
    sq(3, 4),
    sq(4, 6),
    sq(4, 2),
    sq(2, 4),
    sq(6, 4),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Black, // attackers, move first
    White, // defenders and the king
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Black => write!(f, "Black"),
            Side::White => write!(f, "White"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    Black,
    White,
    King,
}

impl Piece {
    pub fn side(&self) -> Side {
        match self {
            Piece::Black => Side::Black,
            Piece::White | Piece::King => Side::White,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Piece::Black => 'B',
            Piece::White => 'W',
            Piece::King => 'K',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(Move),
    #[error("Game already over")]
    GameOver,
    #[error("Move limit {limit} is incompatible with {move_count} moves already made")]
    Configuration { limit: usize, move_count: usize },
    #[error("Invalid square: {0:?}")]
    InvalidSquare(String),
    #[error("Invalid move: {0:?}")]
    InvalidMove(String),
}

/// Side to move plus the contents of every square, two bits per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PositionKey([u64; 3]);

/// Bit of the turn flag, just past the 81 two-bit cells
const TURN_BIT: usize = SIZE * SIZE * 2;

/// What `undo` needs to reverse one move
#[derive(Debug, Clone, PartialEq, Eq)]
struct UndoRecord {
    mv: Move,
    piece: Piece,
    captured: Vec<(Square, Piece)>,
    winner: Option<Side>,
    repeated: bool,
    /// False when the resulting position was already in the history
    recorded: bool,
}

/// The state of a Tablut game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Indexed `[row][col]`
    cells: [[Option<Piece>; SIZE]; SIZE],
    turn: Side,
    king: Option<Square>,
    move_count: usize,
    winner: Option<Side>,
    repeated: bool,
    history: HashSet<PositionKey>,
    undo_log: Vec<UndoRecord>,
    move_limit: Option<usize>,
}

impl Board {
    /// A board in the initial position, black to move
    pub fn new() -> Self {
        let mut board = Board {
            cells: [[None; SIZE]; SIZE],
            turn: Side::Black,
            king: Some(THRONE),
            move_count: 0,
            winner: None,
            repeated: false,
            history: HashSet::new(),
            undo_log: Vec::new(),
            move_limit: None,
        };

        for &square in &INITIAL_ATTACKERS {
            board.put(square, Some(Piece::Black));
        }
        for &square in &INITIAL_DEFENDERS {
            board.put(square, Some(Piece::White));
        }
        board.put(THRONE, Some(Piece::King));

        let key = board.position_key();
        board.history.insert(key);
        board
    }

    /// An arbitrary position with SIDE to move and no history beyond it
    #[cfg(test)]
    pub(crate) fn from_pieces(turn: Side, pieces: &[(Square, Piece)]) -> Self {
        let mut board = Board {
            cells: [[None; SIZE]; SIZE],
            turn,
            king: None,
            move_count: 0,
            winner: None,
            repeated: false,
            history: HashSet::new(),
            undo_log: Vec::new(),
            move_limit: None,
        };
        for &(square, piece) in pieces {
            board.put(square, Some(piece));
            if piece == Piece::King {
                board.king = Some(square);
            }
        }
        let key = board.position_key();
        board.history.insert(key);
        board
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// True iff the current position repeats an earlier one
    pub fn repeated_position(&self) -> bool {
        self.repeated
    }

    /// Number of moves since the initial position that have not been undone
    pub fn move_count(&self) -> usize {
        self.move_count
    }

    pub fn king_position(&self) -> Option<Square> {
        self.king
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.cells[square.row()][square.col()]
    }

    fn put(&mut self, square: Square, piece: Option<Piece>) {
        self.cells[square.row()][square.col()] = piece;
    }

    fn side_at(&self, square: Square) -> Option<Side> {
        self.get(square).map(|piece| piece.side())
    }

    /// Squares holding pieces of SIDE (the king counts for white)
    pub fn pieces(&self, side: Side) -> Vec<Square> {
        Square::all()
            .filter(|&square| self.side_at(square) == Some(side))
            .collect()
    }

    pub fn piece_count(&self, side: Side) -> usize {
        Square::all()
            .filter(|&square| self.side_at(square) == Some(side))
            .count()
    }

    pub fn move_limit(&self) -> Option<usize> {
        self.move_limit
    }

    /// Allow each side N moves. Fails if 2 * N moves have already been made.
    pub fn set_move_limit(&mut self, n: usize) -> Result<(), GameError> {
        if n.saturating_mul(2) <= self.move_count {
            return Err(GameError::Configuration {
                limit: n,
                move_count: self.move_count,
            });
        }
        self.move_limit = Some(n);
        Ok(())
    }

    /// True once both sides have used up the move limit
    pub fn move_limit_reached(&self) -> bool {
        self.move_limit
            .is_some_and(|n| self.move_count >= n.saturating_mul(2))
    }

    /// True iff FROM-TO is a rook move with every square after FROM empty,
    /// not counting TO
    pub fn is_unblocked_move(&self, from: Square, to: Square) -> bool {
        let Some(dir) = from.direction(to) else {
            return false;
        };
        (1..from.distance(to)).all(|step| {
            from.rook_move(dir, step)
                .is_some_and(|square| self.get(square).is_none())
        })
    }

    /// True iff FROM holds a piece of the side to move
    pub fn is_legal_from(&self, from: Square) -> bool {
        self.side_at(from) == Some(self.turn)
    }

    pub fn is_legal(&self, from: Square, to: Square) -> bool {
        let Some(piece) = self.get(from) else {
            return false;
        };
        self.is_unblocked_move(from, to)
            && piece.side() == self.turn
            && self.get(to).is_none()
            && (to != THRONE || piece == Piece::King)
            && !(piece == Piece::King && self.turn == Side::Black)
    }

    pub fn is_legal_move(&self, mv: Move) -> bool {
        self.is_legal(mv.from, mv.to)
    }

    /// All legal moves for SIDE. Empty unless SIDE is to move.
    pub fn legal_moves(&self, side: Side) -> Vec<Move> {
        let mut moves = Vec::new();

        for from in Square::all() {
            if self.side_at(from) != Some(side) {
                continue;
            }
            for dir in Direction::ALL {
                for step in 1..SIZE {
                    let Some(to) = from.rook_move(dir, step) else {
                        break;
                    };
                    // Nothing beyond an occupied square is reachable
                    if self.get(to).is_some() {
                        break;
                    }
                    if self.is_legal(from, to) {
                        moves.push(Move::new(from, to));
                    }
                }
            }
        }

        moves
    }

    pub fn has_move(&self, side: Side) -> bool {
        !self.legal_moves(side).is_empty()
    }

    pub fn game_over(&self) -> bool {
        match self.king {
            None => true,
            Some(king) if king.is_edge() => true,
            Some(_) => self.winner.is_some() || self.repeated,
        }
    }

    /// Apply MV after checking that the game is still on and MV is legal
    pub fn make_move(&mut self, mv: Move) -> Result<(), GameError> {
        if self.game_over() {
            return Err(GameError::GameOver);
        }
        if !self.is_legal_move(mv) {
            return Err(GameError::IllegalMove(mv));
        }
        self.apply(mv);
        Ok(())
    }

    /// Apply MV, which the caller has already found legal
    pub(crate) fn apply(&mut self, mv: Move) {
        let Some(piece) = self.get(mv.from) else {
            return;
        };
        let winner = self.winner;
        let repeated = self.repeated;

        self.put(mv.from, None);
        self.put(mv.to, Some(piece));
        if piece == Piece::King {
            self.king = Some(mv.to);
        }
        self.move_count += 1;
        self.turn = self.turn.opponent();

        if piece == Piece::King && mv.to.is_edge() {
            self.winner = Some(Side::White);
        }

        let captured = self.resolve_captures(mv.to, piece);

        // A repeated position is a win for the side now to move
        let key = self.position_key();
        if self.history.contains(&key) {
            self.repeated = true;
        }
        if self.repeated {
            self.winner = Some(self.turn);
        }
        let recorded = self.history.insert(key);
        self.undo_log.push(UndoRecord {
            mv,
            piece,
            captured,
            winner,
            repeated,
            recorded,
        });

        if self.king.is_none() {
            self.winner = Some(Side::Black);
        }
        if !self.has_move(self.turn) {
            self.winner = Some(self.turn.opponent());
        }
    }

    /// Remove every piece captured by MOVED arriving on TO
    fn resolve_captures(&mut self, to: Square, moved: Piece) -> Vec<(Square, Piece)> {
        let side = moved.side();
        let mut captured = Vec::new();

        for dir in Direction::ALL {
            let (Some(mid), Some(far)) = (to.rook_move(dir, 1), to.rook_move(dir, 2)) else {
                continue;
            };
            let Some(target) = self.get(mid) else {
                continue;
            };

            let is_captured = if target == Piece::King {
                if mid.is_throne() || mid.is_throne_neighbor() {
                    self.is_king_surrounded(mid)
                } else {
                    self.side_at(far) == Some(side) && target.side() != side
                }
            } else if self.side_at(far) == Some(side) || (far.is_throne() && self.get(far).is_none())
            {
                target.side() != side
            } else if far.is_throne() {
                // King on the throne with three attackers around it
                side == Side::Black && target.side() == Side::White && self.throne_wall() == 3
            } else {
                false
            };

            if is_captured {
                self.put(mid, None);
                if target == Piece::King {
                    self.king = None;
                }
                captured.push((mid, target));
            }
        }

        captured
    }

    /// King on or next to the throne: every neighbour is black or the throne
    fn is_king_surrounded(&self, king: Square) -> bool {
        king.neighbors()
            .filter(|&square| square.is_throne() || self.side_at(square) == Some(Side::Black))
            .count()
            == 4
    }

    /// Number of attackers orthogonally adjacent to the throne
    fn throne_wall(&self) -> usize {
        THRONE
            .neighbors()
            .filter(|&square| self.side_at(square) == Some(Side::Black))
            .count()
    }

    /// Undo one move. Has no effect on the initial position.
    pub fn undo(&mut self) {
        if self.move_count == 0 {
            return;
        }
        let Some(record) = self.undo_log.pop() else {
            return;
        };

        if record.recorded {
            let key = self.position_key();
            self.history.remove(&key);
        }

        for &(square, piece) in &record.captured {
            self.put(square, Some(piece));
            if piece == Piece::King {
                self.king = Some(square);
            }
        }
        self.put(record.mv.to, None);
        self.put(record.mv.from, Some(record.piece));
        if record.piece == Piece::King {
            self.king = Some(record.mv.from);
        }

        self.turn = self.turn.opponent();
        self.move_count -= 1;
        self.winner = record.winner;
        self.repeated = record.repeated;
    }

    fn position_key(&self) -> PositionKey {
        let mut words = [0u64; 3];
        for square in Square::all() {
            let code: u64 = match self.get(square) {
                None => 0,
                Some(Piece::Black) => 1,
                Some(Piece::White) => 2,
                Some(Piece::King) => 3,
            };
            let bit = square.index() * 2;
            words[bit / 64] |= code << (bit % 64);
        }
        if self.turn == Side::White {
            words[TURN_BIT / 64] |= 1 << (TURN_BIT % 64);
        }
        PositionKey(words)
    }

    /// Text picture of the board, rank 9 at the top. With COORDINATES, ranks
    /// are labelled on the left and files along the bottom.
    pub fn render(&self, coordinates: bool) -> String {
        let mut out = String::new();
        for row in (0..SIZE).rev() {
            if coordinates {
                out.push_str(&format!("{:2}", row + 1));
            } else {
                out.push_str("  ");
            }
            for col in 0..SIZE {
                out.push(' ');
                out.push(self.cells[row][col].map_or('-', |piece| piece.symbol()));
            }
            out.push('\n');
        }
        if coordinates {
            out.push_str("  ");
            for file in 'a'..='i' {
                out.push(' ');
                out.push(file);
            }
            out.push('\n');
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(true))
    }
}
