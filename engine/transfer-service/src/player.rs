//! Player identity, natural position and market quote

use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PlayerId = i64;
pub type TeamId = i64;

/// A player's natural position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
}

impl Position {
    /// All positions in roster display order
    pub const ALL: [Position; 6] =
        [Position::QB, Position::RB, Position::WR, Position::TE, Position::K, Position::DEF];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DEF => "DEF",
        }
    }

    /// Positions eligible for the FLEX slot
    pub fn is_flex(self) -> bool {
        matches!(self, Position::RB | Position::WR)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while parsing a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPosition(pub String);

impl fmt::Display for UnknownPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown position '{}'", self.0)
    }
}

impl std::error::Error for UnknownPosition {}

impl FromStr for Position {
    type Err = UnknownPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "K" => Ok(Position::K),
            "DEF" | "DST" => Ok(Position::DEF),
            _ => Err(UnknownPosition(s.to_string())),
        }
    }
}

/// A player's identity and current market price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerQuote {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Position,
    pub current_price: Money,
}

impl PlayerQuote {
    pub fn new(
        player_id: PlayerId,
        name: impl Into<String>,
        position: Position,
        current_price: Money,
    ) -> Self {
        Self { player_id, name: name.into(), position, current_price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parse() {
        assert_eq!("qb".parse::<Position>().unwrap(), Position::QB);
        assert_eq!(" DEF ".parse::<Position>().unwrap(), Position::DEF);
        assert_eq!("DST".parse::<Position>().unwrap(), Position::DEF);
        assert!("LB".parse::<Position>().is_err());
    }

    #[test]
    fn test_position_serde_uses_uppercase() {
        let json = serde_json::to_string(&Position::DEF).unwrap();
        assert_eq!(json, "\"DEF\"");
        let parsed: Position = serde_json::from_str("\"WR\"").unwrap();
        assert_eq!(parsed, Position::WR);
    }

    #[test]
    fn test_flex_eligibility() {
        assert!(Position::RB.is_flex());
        assert!(Position::WR.is_flex());
        assert!(!Position::TE.is_flex());
    }
}
