use tracing::{debug, info, warn};

use crate::board::{Board, GameError, Side};
use crate::moves::Move;
use crate::player::Player;

pub struct MatchConfig {
    /// Moves allowed to each side; `None` plays until the game ends
    pub move_limit: Option<usize>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            move_limit: Some(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    BlackWins { winner_name: String, moves: usize },
    WhiteWins { winner_name: String, moves: usize },
    /// The side to move would have exceeded the move limit and loses
    MoveLimit { winner_name: String, moves: usize },
    /// A player returned no move on its turn
    NoMove { violator: String, winner: String },
    IllegalMove { violator: String, winner: String, mv: Move },
}

impl MatchResult {
    pub fn winner(&self) -> &str {
        match self {
            MatchResult::BlackWins { winner_name, .. } => winner_name,
            MatchResult::WhiteWins { winner_name, .. } => winner_name,
            MatchResult::MoveLimit { winner_name, .. } => winner_name,
            MatchResult::NoMove { winner, .. } => winner,
            MatchResult::IllegalMove { winner, .. } => winner,
        }
    }
}

/// One game between two players, from the initial position
pub struct Match {
    board: Board,
    black: Box<dyn Player>,
    white: Box<dyn Player>,
    transcript: Vec<Move>,
}

impl Match {
    pub fn new(
        black: Box<dyn Player>,
        white: Box<dyn Player>,
        config: MatchConfig,
    ) -> Result<Self, GameError> {
        let mut board = Board::new();
        if let Some(limit) = config.move_limit {
            board.set_move_limit(limit)?;
        }
        Ok(Match {
            board,
            black,
            white,
            transcript: Vec::new(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Moves played so far, in order
    pub fn transcript(&self) -> &[Move] {
        &self.transcript
    }

    pub fn transcript_text(&self) -> Vec<String> {
        self.transcript.iter().map(|mv| mv.to_string()).collect()
    }

    fn name(&self, side: Side) -> String {
        match side {
            Side::Black => self.black.name().to_string(),
            Side::White => self.white.name().to_string(),
        }
    }

    pub fn play(&mut self) -> MatchResult {
        self.black.game_start(Side::Black);
        self.white.game_start(Side::White);

        info!(
            black = self.black.name(),
            white = self.white.name(),
            move_limit = ?self.board.move_limit(),
            "match starting"
        );
        debug!("initial board:\n{}", self.board);

        let result = loop {
            if let Some(result) = self.finished() {
                break result;
            }
            if let Some(result) = self.play_turn() {
                break result;
            }
        };

        self.black.game_end();
        self.white.game_end();

        info!(
            winner = result.winner(),
            moves = self.board.move_count(),
            "match over"
        );
        result
    }

    /// The result if the game on the board has ended
    fn finished(&self) -> Option<MatchResult> {
        let moves = self.board.move_count();

        if self.board.game_over() {
            let winner = match (self.board.winner(), self.board.king_position()) {
                (Some(side), _) => side,
                (None, None) => Side::Black,
                (None, Some(_)) => Side::White,
            };
            let winner_name = self.name(winner);
            return Some(match winner {
                Side::Black => MatchResult::BlackWins { winner_name, moves },
                Side::White => MatchResult::WhiteWins { winner_name, moves },
            });
        }

        if self.board.move_limit_reached() {
            let winner_name = self.name(self.board.turn().opponent());
            return Some(MatchResult::MoveLimit { winner_name, moves });
        }

        None
    }

    fn play_turn(&mut self) -> Option<MatchResult> {
        let side = self.board.turn();
        let player = match side {
            Side::Black => &mut self.black,
            Side::White => &mut self.white,
        };

        let Some(mv) = player.request_move(&self.board) else {
            let violator = player.name().to_string();
            warn!(player = %violator, "no move returned, forfeiting");
            return Some(MatchResult::NoMove {
                violator,
                winner: self.name(side.opponent()),
            });
        };

        if let Err(err) = self.board.make_move(mv) {
            let violator = self.name(side);
            warn!(player = %violator, %mv, %err, "illegal move");
            return Some(MatchResult::IllegalMove {
                violator,
                winner: self.name(side.opponent()),
                mv,
            });
        }

        info!(
            ply = self.board.move_count(),
            player = %self.name(side),
            %mv,
            "move"
        );
        debug!("\n{}", self.board);

        self.transcript.push(mv);
        self.black.notify_move(mv);
        self.white.notify_move(mv);

        None
    }
}
