//! In-memory store for tests and local runs
//!
//! A transaction takes the store mutex for its whole life and works on a
//! copy of the state; commit swaps the copy in.

use super::{RosterReads, RosterStore, TransferTransaction};
use crate::constraints::RosterConstraints;
use crate::ledger::TeamLedger;
use crate::money::Money;
use crate::period::Period;
use crate::player::{PlayerId, PlayerQuote, TeamId};
use crate::roster::RosterEntry;
use crate::transfer::{NewTransfer, TransferHistoryFilter, TransferRecord};
use crate::{Result, TransferError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    players: HashMap<PlayerId, PlayerQuote>,
    /// Keyed by (team, season, week)
    rosters: BTreeMap<(TeamId, i32, u32), Vec<RosterEntry>>,
    ledgers: HashMap<TeamId, TeamLedger>,
    constraints: HashMap<i32, RosterConstraints>,
    period: Period,
    transfers: Vec<TransferRecord>,
    next_transfer_id: i64,
    /// Recording a transfer for this player fails, to exercise rollback
    failing_player: Option<PlayerId>,
}

impl MemoryState {
    fn player_quote(&self, player_id: PlayerId) -> Option<PlayerQuote> {
        self.players.get(&player_id).cloned()
    }

    fn roster_snapshot(&self, team_id: TeamId, week: u32, season: i32) -> Vec<RosterEntry> {
        self.rosters.get(&(team_id, season, week)).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRosterStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_player(&self, quote: PlayerQuote) {
        self.state.lock().await.players.insert(quote.player_id, quote);
    }

    /// Reprice a player, as the market feed would
    pub async fn set_price(&self, player_id: PlayerId, price: Money) -> Result<()> {
        let mut state = self.state.lock().await;
        let quote =
            state.players.get_mut(&player_id).ok_or(TransferError::PlayerNotFound { player_id })?;
        quote.current_price = price;
        Ok(())
    }

    pub async fn set_period(&self, period: Period) {
        self.state.lock().await.period = period;
    }

    pub async fn set_constraints(&self, constraints: RosterConstraints) {
        self.state.lock().await.constraints.insert(constraints.season, constraints);
    }

    pub async fn put_ledger(&self, ledger: TeamLedger) {
        self.state.lock().await.ledgers.insert(ledger.team_id, ledger);
    }

    pub async fn put_roster_entry(&self, entry: RosterEntry) {
        let mut state = self.state.lock().await;
        let week = state.rosters.entry((entry.team_id, entry.season, entry.week)).or_default();
        week.retain(|e| e.player_id != entry.player_id);
        week.push(entry);
    }

    /// Make recording any transfer of `player_id` fail with a database error
    pub async fn fail_transfers_for(&self, player_id: Option<PlayerId>) {
        self.state.lock().await.failing_player = player_id;
    }

    pub async fn ledger_snapshot(&self, team_id: TeamId) -> Option<TeamLedger> {
        self.state.lock().await.ledgers.get(&team_id).cloned()
    }

    pub async fn roster_ids(&self, team_id: TeamId, week: u32, season: i32) -> Vec<PlayerId> {
        let state = self.state.lock().await;
        let mut ids: Vec<PlayerId> =
            state.roster_snapshot(team_id, week, season).iter().map(|e| e.player_id).collect();
        ids.sort_unstable();
        ids
    }

    pub async fn transfer_count(&self) -> usize {
        self.state.lock().await.transfers.len()
    }
}

/// Point-in-time copy used for reads outside a transaction
struct MemoryReader {
    state: MemoryState,
}

#[async_trait::async_trait]
impl RosterReads for MemoryReader {
    async fn player_quote(&mut self, player_id: PlayerId) -> Result<Option<PlayerQuote>> {
        Ok(self.state.player_quote(player_id))
    }

    async fn roster_snapshot(
        &mut self,
        team_id: TeamId,
        week: u32,
        season: i32,
    ) -> Result<Vec<RosterEntry>> {
        Ok(self.state.roster_snapshot(team_id, week, season))
    }

    async fn ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>> {
        Ok(self.state.ledgers.get(&team_id).cloned())
    }

    async fn roster_constraints(&mut self, season: i32) -> Result<Option<RosterConstraints>> {
        Ok(self.state.constraints.get(&season).cloned())
    }

    async fn current_period(&mut self) -> Result<Period> {
        Ok(self.state.period)
    }
}

struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.guard.is_none() {
            return Err(TransferError::InvalidRequest {
                message: "transaction already finished".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterReads for MemoryTransaction {
    async fn player_quote(&mut self, player_id: PlayerId) -> Result<Option<PlayerQuote>> {
        self.ensure_open()?;
        Ok(self.working.player_quote(player_id))
    }

    async fn roster_snapshot(
        &mut self,
        team_id: TeamId,
        week: u32,
        season: i32,
    ) -> Result<Vec<RosterEntry>> {
        self.ensure_open()?;
        Ok(self.working.roster_snapshot(team_id, week, season))
    }

    async fn ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>> {
        self.ensure_open()?;
        Ok(self.working.ledgers.get(&team_id).cloned())
    }

    async fn roster_constraints(&mut self, season: i32) -> Result<Option<RosterConstraints>> {
        self.ensure_open()?;
        Ok(self.working.constraints.get(&season).cloned())
    }

    async fn current_period(&mut self) -> Result<Period> {
        self.ensure_open()?;
        Ok(self.working.period)
    }
}

#[async_trait::async_trait]
impl TransferTransaction for MemoryTransaction {
    async fn lock_ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>> {
        // The whole store is already held
        self.ledger(team_id).await
    }

    async fn insert_ledger(&mut self, ledger: &TeamLedger) -> Result<bool> {
        self.ensure_open()?;
        if self.working.ledgers.contains_key(&ledger.team_id) {
            return Ok(false);
        }
        self.working.ledgers.insert(ledger.team_id, ledger.clone());
        Ok(true)
    }

    async fn update_ledger(&mut self, expected_spent: Money, ledger: &TeamLedger) -> Result<()> {
        self.ensure_open()?;
        let team_id = ledger.team_id;
        match self.working.ledgers.get_mut(&team_id) {
            Some(stored) if stored.current_spent == expected_spent => {
                *stored = ledger.clone();
                Ok(())
            }
            Some(_) => Err(TransferError::LedgerConflict { team_id }),
            None => Err(TransferError::TeamNotFound { team_id }),
        }
    }

    async fn copy_roster_forward(
        &mut self,
        team_id: TeamId,
        from_week: u32,
        to_week: u32,
        season: i32,
    ) -> Result<u64> {
        self.ensure_open()?;
        let source = self.working.roster_snapshot(team_id, from_week, season);
        let target = self.working.rosters.entry((team_id, season, to_week)).or_default();

        let mut copied = 0;
        for entry in source {
            if !target.iter().any(|e| e.player_id == entry.player_id) {
                target.push(entry.carried_to(to_week));
                copied += 1;
            }
        }
        Ok(copied)
    }

    async fn remove_roster_entry(
        &mut self,
        team_id: TeamId,
        player_id: PlayerId,
        week: u32,
        season: i32,
    ) -> Result<bool> {
        self.ensure_open()?;
        let Some(entries) = self.working.rosters.get_mut(&(team_id, season, week)) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.player_id != player_id);
        Ok(entries.len() < before)
    }

    async fn insert_roster_entry(&mut self, entry: &RosterEntry) -> Result<bool> {
        self.ensure_open()?;
        let entries =
            self.working.rosters.entry((entry.team_id, entry.season, entry.week)).or_default();
        if entries.iter().any(|e| e.player_id == entry.player_id) {
            return Ok(false);
        }
        entries.push(entry.clone());
        Ok(true)
    }

    async fn record_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        self.ensure_open()?;
        if self.working.failing_player == Some(transfer.player_id) {
            return Err(TransferError::DatabaseError(sqlx::Error::Protocol(format!(
                "simulated failure recording transfer of player {}",
                transfer.player_id
            ))));
        }

        self.working.next_transfer_id += 1;
        let record = transfer.into_record(self.working.next_transfer_id);
        self.working.transfers.push(record.clone());
        Ok(record)
    }

    async fn set_current_period(&mut self, period: Period) -> Result<()> {
        self.ensure_open()?;
        self.working.period = period;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut guard = self.guard.take().ok_or_else(|| TransferError::InvalidRequest {
            message: "transaction already finished".to_string(),
        })?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.guard = None;
        self.working = MemoryState::default();
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn reader(&self) -> Result<Box<dyn RosterReads>> {
        let state = self.state.lock().await.clone();
        Ok(Box::new(MemoryReader { state }))
    }

    async fn begin(&self) -> Result<Box<dyn TransferTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard: Some(guard), working }))
    }

    async fn transfer_history(&self, filter: &TransferHistoryFilter) -> Result<Vec<TransferRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .transfers
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn available_players(&self, _season: i32) -> Result<Vec<PlayerQuote>> {
        let state = self.state.lock().await;
        let mut players: Vec<PlayerQuote> = state.players.values().cloned().collect();
        players.sort_by_key(|p| p.player_id);
        Ok(players)
    }

    async fn teams(&self, season: i32) -> Result<Vec<TeamId>> {
        let state = self.state.lock().await;
        let mut teams: Vec<TeamId> =
            state.ledgers.values().filter(|l| l.season == season).map(|l| l.team_id).collect();
        teams.sort_unstable();
        Ok(teams)
    }
}
