use crate::board::{Board, Side};
use crate::moves::Move;

/// A participant in a game, asked for a move whenever its side is to play
pub trait Player: Send {
    /// Get the name of the player
    fn name(&self) -> &str;

    /// The side this player controls
    fn side(&self) -> Side;

    /// Choose a move for the current position. `None` when it is not this
    /// player's turn, the game has ended, or no move is available.
    fn request_move(&mut self, board: &Board) -> Option<Move>;

    /// Notified when the game starts, with the side this player plays
    fn game_start(&mut self, _side: Side) {}

    /// Notified when a move is made (by either player)
    fn notify_move(&mut self, _mv: Move) {}

    /// Notified when the game ends
    fn game_end(&mut self) {}
}

/// Plays a fixed list of moves in order, then returns `None`
#[cfg(test)]
pub struct ScriptedPlayer {
    name: String,
    side: Side,
    moves: std::vec::IntoIter<Move>,
}

#[cfg(test)]
impl ScriptedPlayer {
    pub fn new(name: impl Into<String>, side: Side, moves: Vec<Move>) -> Self {
        ScriptedPlayer {
            name: name.into(),
            side,
            moves: moves.into_iter(),
        }
    }
}

#[cfg(test)]
impl Player for ScriptedPlayer {
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
        self.moves.next()
    }
}
