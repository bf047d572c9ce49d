use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::board::GameError;
use crate::square::Square;

/// A rook move of one piece. The text form is `<from>-<to>`, e.g. `h5-h6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| GameError::InvalidMove(s.to_string()))?;
        let from: Square = from.parse()?;
        let to: Square = to.parse()?;
        if !from.is_rook_move(to) {
            return Err(GameError::InvalidMove(s.to_string()));
        }
        Ok(Move::new(from, to))
    }
}

impl TryFrom<String> for Move {
    type Error = GameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Move> for String {
    fn from(mv: Move) -> String {
        mv.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::sq;

    #[test]
    fn test_canonical_text() {
        let mv = Move::new(sq(7, 4), sq(7, 5));
        assert_eq!(mv.to_string(), "h5-h6");
        assert_eq!("h5-h6".parse::<Move>().unwrap(), mv);
        assert_eq!(" a4-a1 ".parse::<Move>().unwrap(), Move::new(sq(0, 3), sq(0, 0)));
    }

    #[test]
    fn test_rejects_non_rook_moves() {
        assert!(matches!("a1-b2".parse::<Move>(), Err(GameError::InvalidMove(_))));
        assert!(matches!("a1-a1".parse::<Move>(), Err(GameError::InvalidMove(_))));
        assert!(matches!("a1a2".parse::<Move>(), Err(GameError::InvalidMove(_))));
        assert!(matches!("a1-z2".parse::<Move>(), Err(GameError::InvalidSquare(_))));
    }

    #[test]
    fn test_serde_uses_text_form() {
        let mv = Move::new(sq(4, 2), sq(1, 2));
        let json = serde_json::to_string(&mv).unwrap();
        assert_eq!(json, "\"e3-b3\"");
        let back: Move = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mv);
        assert!(serde_json::from_str::<Move>("\"e3-b4\"").is_err());
    }
}
