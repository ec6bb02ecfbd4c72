//! Storage seam for rosters, ledgers, prices and the transfer log
//!
//! Reads go through [`RosterReads`], which both a plain read handle and a
//! write transaction implement, so impact assessment runs the same code in
//! preview and in execute.

use crate::constraints::RosterConstraints;
use crate::ledger::TeamLedger;
use crate::money::Money;
use crate::period::Period;
use crate::player::{PlayerId, PlayerQuote, TeamId};
use crate::roster::RosterEntry;
use crate::transfer::{NewTransfer, TransferHistoryFilter, TransferRecord};
use crate::Result;
use std::collections::HashMap;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRosterStore;
pub use postgres::PgRosterStore;

/// Read access shared by read handles and transactions
#[async_trait::async_trait]
pub trait RosterReads: Send {
    /// Current market quote for a player
    async fn player_quote(&mut self, player_id: PlayerId) -> Result<Option<PlayerQuote>>;

    /// Quotes for many players; unknown ids are left out of the map
    async fn player_quotes(&mut self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, PlayerQuote>> {
        let mut quotes = HashMap::with_capacity(player_ids.len());
        for &player_id in player_ids {
            if let Some(quote) = self.player_quote(player_id).await? {
                quotes.insert(player_id, quote);
            }
        }
        Ok(quotes)
    }

    /// Roster entries of a team for one week
    async fn roster_snapshot(
        &mut self,
        team_id: TeamId,
        week: u32,
        season: i32,
    ) -> Result<Vec<RosterEntry>>;

    /// Ledger of a team, unlocked
    async fn ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>>;

    /// Stored policy for a season, if any
    async fn roster_constraints(&mut self, season: i32) -> Result<Option<RosterConstraints>>;

    /// Current game period; never cached by callers
    async fn current_period(&mut self) -> Result<Period>;
}

/// A unit of work. Dropping it without [`TransferTransaction::commit`]
/// discards every change.
#[async_trait::async_trait]
pub trait TransferTransaction: RosterReads {
    /// Read the team's ledger and hold it until commit or rollback
    async fn lock_ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>>;

    /// Create a ledger; returns false when the team already exists
    async fn insert_ledger(&mut self, ledger: &TeamLedger) -> Result<bool>;

    /// Write `ledger` only if the stored spend still equals `expected_spent`
    async fn update_ledger(&mut self, expected_spent: Money, ledger: &TeamLedger) -> Result<()>;

    /// Copy a week's entries into another week, keeping slots; returns rows copied
    async fn copy_roster_forward(
        &mut self,
        team_id: TeamId,
        from_week: u32,
        to_week: u32,
        season: i32,
    ) -> Result<u64>;

    /// Delete one roster entry; returns false when it was not there
    async fn remove_roster_entry(
        &mut self,
        team_id: TeamId,
        player_id: PlayerId,
        week: u32,
        season: i32,
    ) -> Result<bool>;

    /// Insert a roster entry; returns false when the player is already rostered that week
    async fn insert_roster_entry(&mut self, entry: &RosterEntry) -> Result<bool>;

    /// Append to the transfer log
    async fn record_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord>;

    /// Move the game clock
    async fn set_current_period(&mut self, period: Period) -> Result<()>;

    /// Make every change visible
    async fn commit(&mut self) -> Result<()>;

    /// Discard every change
    async fn rollback(&mut self) -> Result<()>;
}

/// Entry point to a storage backend
#[async_trait::async_trait]
pub trait RosterStore: Send + Sync {
    /// A read handle; writes are not possible through it
    async fn reader(&self) -> Result<Box<dyn RosterReads>>;

    /// Start a transaction
    async fn begin(&self) -> Result<Box<dyn TransferTransaction>>;

    /// Transfer log, newest first, capped at `filter.limit`
    async fn transfer_history(&self, filter: &TransferHistoryFilter) -> Result<Vec<TransferRecord>>;

    /// Every player with a current price
    async fn available_players(&self, season: i32) -> Result<Vec<PlayerQuote>>;

    /// Teams playing a season
    async fn teams(&self, season: i32) -> Result<Vec<TeamId>>;
}

/// Stored policy for `season`, or `fallback` re-dated to that season
pub async fn season_constraints<R>(
    reader: &mut R,
    season: i32,
    fallback: &RosterConstraints,
) -> Result<RosterConstraints>
where
    R: RosterReads + ?Sized,
{
    Ok(reader
        .roster_constraints(season)
        .await?
        .unwrap_or_else(|| RosterConstraints { season, ..fallback.clone() }))
}
