//! Error types for TransferService

use crate::money::Money;
use crate::player::{PlayerId, TeamId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Transfer not affordable: needed {needed}, freed {freed}, remaining after transfer {remaining}")]
    Unaffordable { needed: Money, freed: Money, remaining: Money },

    #[error("Transfer would violate position requirements. Missing: {}", .missing.join(", "))]
    PositionConstraintViolated { missing: Vec<String> },

    #[error("Player {player_id} not in roster for week {week}")]
    PlayerNotOnRoster { player_id: PlayerId, week: u32 },

    #[error("Player {player_id} not found")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Team not found: {team_id}")]
    TeamNotFound { team_id: TeamId },

    #[error("Roster is already full ({roster_size} players)")]
    RosterFull { roster_size: u32 },

    #[error("No affordable players found to add to the roster")]
    NoAffordableCandidates,

    #[error("Ledger for team {team_id} changed during the transfer")]
    LedgerConflict { team_id: TeamId },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TransferError {
    /// True for rejections decided by policy, as opposed to storage failures
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            TransferError::DatabaseError(_)
                | TransferError::Migration(_)
                | TransferError::SerializationError(_)
        )
    }
}
