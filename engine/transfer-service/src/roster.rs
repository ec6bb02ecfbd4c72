//! Weekly roster entries and the effective roster used while a transfer is staged

use crate::constraints::count_positions;
use crate::player::{PlayerId, PlayerQuote, Position, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Labeled roster position, distinct from a player's natural position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSlot {
    QB,
    RB1,
    RB2,
    WR1,
    WR2,
    TE,
    FLEX,
    K,
    DEF,
    BENCH,
}

impl PositionSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionSlot::QB => "QB",
            PositionSlot::RB1 => "RB1",
            PositionSlot::RB2 => "RB2",
            PositionSlot::WR1 => "WR1",
            PositionSlot::WR2 => "WR2",
            PositionSlot::TE => "TE",
            PositionSlot::FLEX => "FLEX",
            PositionSlot::K => "K",
            PositionSlot::DEF => "DEF",
            PositionSlot::BENCH => "BENCH",
        }
    }

    pub fn is_starter(self) -> bool {
        self != PositionSlot::BENCH
    }
}

impl fmt::Display for PositionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QB" => Ok(PositionSlot::QB),
            "RB1" => Ok(PositionSlot::RB1),
            "RB2" => Ok(PositionSlot::RB2),
            "WR1" => Ok(PositionSlot::WR1),
            "WR2" => Ok(PositionSlot::WR2),
            "TE" => Ok(PositionSlot::TE),
            "FLEX" => Ok(PositionSlot::FLEX),
            "K" => Ok(PositionSlot::K),
            "DEF" => Ok(PositionSlot::DEF),
            "BENCH" => Ok(PositionSlot::BENCH),
            other => Err(format!("Unknown position slot '{other}'")),
        }
    }
}

/// A player on a team's roster for one week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub week: u32,
    pub season: i32,
    pub position_slot: PositionSlot,
}

impl RosterEntry {
    /// Bought players start on the bench
    pub fn bench(team_id: TeamId, player_id: PlayerId, week: u32, season: i32) -> Self {
        Self { team_id, player_id, week, season, position_slot: PositionSlot::BENCH }
    }

    /// Same entry carried into another week
    pub fn carried_to(&self, week: u32) -> Self {
        Self { week, ..self.clone() }
    }
}

/// Committed roster adjusted by a transfer that is staged but not yet committed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectiveRoster {
    players: Vec<PlayerQuote>,
}

impl EffectiveRoster {
    /// committed - pending removals + pending additions (additions already present are ignored)
    pub fn new(
        committed: Vec<PlayerQuote>,
        pending_out: &[PlayerId],
        pending_in: Vec<PlayerQuote>,
    ) -> Self {
        let removed: HashSet<PlayerId> = pending_out.iter().copied().collect();
        let mut players: Vec<PlayerQuote> =
            committed.into_iter().filter(|p| !removed.contains(&p.player_id)).collect();

        for player in pending_in {
            if !players.iter().any(|p| p.player_id == player.player_id) {
                players.push(player);
            }
        }

        Self { players }
    }

    pub fn from_players(players: Vec<PlayerQuote>) -> Self {
        Self::new(players, &[], Vec::new())
    }

    pub fn players(&self) -> &[PlayerQuote] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.player_id == player_id)
    }

    pub fn position_counts(&self) -> BTreeMap<Position, u32> {
        count_positions(self.players.iter().map(|p| p.position))
    }
}
