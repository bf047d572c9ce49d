//! Move search for the engine's side.
//!
//! A fixed-depth minimax with alpha-beta pruning. Scores are always from
//! white's point of view: white maximises (`sense == 1`) and black minimises
//! (`sense == -1`). The search works on its own clone of the game board and
//! undoes every move it makes before returning.

use tracing::debug;

use crate::board::{Board, Piece, Side};
use crate::moves::Move;
use crate::player::Player;
use crate::square::THRONE;

/// A position-score magnitude indicating a win (for white if positive,
/// black if negative)
pub const WINNING_VALUE: i32 = i32::MAX - 20;

/// A magnitude greater than any score
pub const INFTY: i32 = i32::MAX;

/// Penalty per attacker touching the king
const KING_THREAT_WEIGHT: i32 = 40;

/// Bonus per step the king has left the throne
const KING_DISTANCE_WEIGHT: i32 = 40;

const PIECE_WEIGHT: i32 = 20;

/// White's pieces in the initial position, king included
const WHITE_PIECES: i32 = 9;

/// Search depth for BOARD. Always one ply.
pub fn max_depth(_board: &Board) -> usize {
    1
}

/// Heuristic value of BOARD, higher is better for white
pub fn static_score(board: &Board) -> i32 {
    let Some(king) = board.king_position() else {
        return -INFTY;
    };
    if king.is_edge() {
        return WINNING_VALUE;
    }

    let threats = king
        .neighbors()
        .filter(|&square| board.get(square) == Some(Piece::Black))
        .count() as i32;
    let distance = king.distance(THRONE) as i32;
    let white_lost = WHITE_PIECES - board.piece_count(Side::White) as i32;
    let black = board.piece_count(Side::Black) as i32;

    -threats * KING_THREAT_WEIGHT + distance * KING_DISTANCE_WEIGHT
        - white_lost * PIECE_WEIGHT
        - black * PIECE_WEIGHT
}

#[derive(Debug, Default)]
pub struct Searcher {
    best_move: Option<Move>,
    nodes: u64,
}

impl Searcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes visited by the last search
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Best move for the side to move on BOARD, or `None` if every move
    /// repeats a position or there are none
    pub fn find_move(&mut self, board: &Board) -> Option<Move> {
        let mut board = board.clone();
        self.best_move = None;
        self.nodes = 0;

        let sense = match board.turn() {
            Side::White => 1,
            Side::Black => -1,
        };
        let depth = max_depth(&board);
        let score = self.search(&mut board, depth, true, sense, -INFTY, INFTY);

        debug!(
            side = %board.turn(),
            depth,
            score,
            nodes = self.nodes,
            best = ?self.best_move.map(|mv| mv.to_string()),
            "search finished"
        );
        self.best_move
    }

    /// Value of BOARD searched to DEPTH plies. At the root (SAVE_MOVE) the
    /// move achieving it is kept in `best_move`.
    fn search(
        &mut self,
        board: &mut Board,
        depth: usize,
        save_move: bool,
        sense: i32,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        self.nodes += 1;
        if depth == 0 || board.game_over() {
            return static_score(board);
        }

        let side = if sense == 1 { Side::White } else { Side::Black };
        let mut best = if sense == 1 { -INFTY } else { INFTY };

        for mv in board.legal_moves(side) {
            board.apply(mv);
            if board.repeated_position() {
                board.undo();
                continue;
            }
            if board.winner() == Some(side) {
                board.undo();
                if save_move {
                    self.best_move = Some(mv);
                }
                best = sense * WINNING_VALUE;
                break;
            }

            let score = self.search(board, depth - 1, false, -sense, alpha, beta);
            board.undo();

            if sense == 1 {
                if score >= best {
                    best = score;
                    alpha = alpha.max(best);
                    if save_move {
                        self.best_move = Some(mv);
                    }
                    if alpha >= beta {
                        break;
                    }
                }
            } else if score <= best {
                best = score;
                beta = beta.min(best);
                if save_move {
                    self.best_move = Some(mv);
                }
                if beta <= alpha {
                    break;
                }
            }
        }

        best
    }
}

/// The engine as a player
pub struct AiPlayer {
    name: String,
    side: Side,
    searcher: Searcher,
}

impl AiPlayer {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        AiPlayer {
            name: name.into(),
            side,
            searcher: Searcher::new(),
        }
    }
}

impl Player for AiPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn side(&self) -> Side {
        self.side
    }

    fn request_move(&mut self, board: &Board) -> Option<Move> {
        if board.turn() != self.side || board.game_over() {
            return None;
        }
        self.searcher.find_move(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::sq;

    #[test]
    fn test_static_score_initial_position() {
        // No threats, king centred, no white losses, 16 attackers
        assert_eq!(static_score(&Board::new()), -16 * PIECE_WEIGHT);
    }

    #[test]
    fn test_static_score_terminal_positions() {
        let no_king = Board::from_pieces(Side::White, &[(sq(1, 1), Piece::White)]);
        assert_eq!(static_score(&no_king), -INFTY);

        let escaped = Board::from_pieces(Side::Black, &[(sq(0, 5), Piece::King)]);
        assert_eq!(static_score(&escaped), WINNING_VALUE);
    }

    #[test]
    fn test_static_score_terms() {
        // King two steps from the throne, one attacker beside it, seven
        // defenders lost, two attackers on the board
        let board = Board::from_pieces(
            Side::White,
            &[
                (sq(6, 4), Piece::King),
                (sq(6, 5), Piece::Black),
                (sq(1, 1), Piece::Black),
                (sq(2, 2), Piece::White),
            ],
        );
        let expected = -KING_THREAT_WEIGHT + 2 * KING_DISTANCE_WEIGHT - 7 * PIECE_WEIGHT
            - 2 * PIECE_WEIGHT;
        assert_eq!(static_score(&board), expected);
    }

    #[test]
    fn test_finds_king_escape() {
        let board = Board::from_pieces(
            Side::White,
            &[
                (sq(2, 6), Piece::King),
                (sq(7, 1), Piece::Black),
                (sq(6, 6), Piece::Black),
            ],
        );
        let mut searcher = Searcher::new();
        let mv = searcher.find_move(&board).expect("a move");

        let mut after = board.clone();
        after.make_move(mv).unwrap();
        assert_eq!(after.winner(), Some(Side::White));
        assert!(mv.to.is_edge());
    }

    #[test]
    fn test_finds_king_capture() {
        let board = Board::from_pieces(
            Side::Black,
            &[
                (sq(1, 2), Piece::Black),
                (sq(2, 2), Piece::King),
                (sq(3, 5), Piece::Black),
                (sq(6, 6), Piece::White),
            ],
        );
        let mut searcher = Searcher::new();
        let mv = searcher.find_move(&board).expect("a move");

        let mut after = board.clone();
        after.make_move(mv).unwrap();
        assert_eq!(after.winner(), Some(Side::Black));
        assert_eq!(after.king_position(), None);
    }

    #[test]
    fn test_search_is_deterministic_and_leaves_board_alone() {
        let board = Board::new();
        let before = board.clone();
        let mut searcher = Searcher::new();

        let first = searcher.find_move(&board);
        let second = searcher.find_move(&board);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(board.is_legal_move(first.unwrap()));
        assert!(searcher.nodes() > 1);
        assert_eq!(board, before);
    }

    #[test]
    fn test_search_skips_repeating_moves() {
        let mut board = Board::new();
        let repeat = Move::new(sq(1, 3), sq(4, 3));
        board.make_move(Move::new(sq(8, 5), sq(8, 8))).unwrap();
        board.make_move(Move::new(sq(4, 3), sq(1, 3))).unwrap();
        board.make_move(Move::new(sq(8, 8), sq(8, 5))).unwrap();

        let mv = Searcher::new().find_move(&board).expect("a move");
        assert_ne!(mv, repeat);
        assert!(board.is_legal_move(mv));
    }

    #[test]
    fn test_ai_player_waits_for_its_turn() {
        let board = Board::new();

        let mut white = AiPlayer::new("engine", Side::White);
        assert_eq!(white.request_move(&board), None);

        let mut black = AiPlayer::new("engine", Side::Black);
        let mv = black.request_move(&board).expect("black has moves");
        assert!(board.is_legal_move(mv));
    }

    #[test]
    fn test_ai_player_silent_after_game_over() {
        let mut board = Board::from_pieces(
            Side::White,
            &[(sq(2, 6), Piece::King), (sq(7, 1), Piece::Black)],
        );
        board.make_move(Move::new(sq(2, 6), sq(2, 8))).unwrap();

        let mut black = AiPlayer::new("engine", Side::Black);
        assert_eq!(black.request_move(&board), None);
    }
}
