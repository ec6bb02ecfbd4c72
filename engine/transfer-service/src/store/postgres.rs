//! PostgreSQL store
//!
//! Transactions lock the team row with `SELECT ... FOR UPDATE`, so writes to
//! one team are serialised while other teams proceed.

use super::{RosterReads, RosterStore, TransferTransaction};
use crate::config::DatabaseConfig;
use crate::constraints::RosterConstraints;
use crate::ledger::TeamLedger;
use crate::money::Money;
use crate::period::Period;
use crate::player::{PlayerId, PlayerQuote, Position, TeamId};
use crate::roster::{PositionSlot, RosterEntry};
use crate::transfer::{NewTransfer, TransferHistoryFilter, TransferRecord, TransferType};
use crate::{Result, TransferError};
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::{BTreeMap, HashMap};

const CURRENT_PERIOD_KEY: &str = "current_period";

#[derive(Debug, Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode_err(column: &str, message: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("{column}: {message}").into())
}

fn get_u32(row: &PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).map_err(|e| decode_err(column, e).into())
}

fn get_money(row: &PgRow, column: &str) -> Result<Money> {
    let value: Decimal = row.try_get(column)?;
    Ok(Money::from_decimal(value))
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn quote_from_row(row: &PgRow) -> Result<PlayerQuote> {
    let position: String = row.try_get("position")?;
    let position: Position = position.parse().map_err(|e| decode_err("position", e))?;
    Ok(PlayerQuote {
        player_id: row.try_get("player_id")?,
        name: row.try_get("name")?,
        position,
        current_price: get_money(row, "current_price")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<RosterEntry> {
    let slot: String = row.try_get("position_slot")?;
    let position_slot: PositionSlot = slot.parse().map_err(|e| decode_err("position_slot", e))?;
    Ok(RosterEntry {
        team_id: row.try_get("team_id")?,
        player_id: row.try_get("player_id")?,
        week: get_u32(row, "week")?,
        season: row.try_get("season")?,
        position_slot,
    })
}

fn ledger_from_row(row: &PgRow) -> Result<TeamLedger> {
    Ok(TeamLedger {
        team_id: row.try_get("team_id")?,
        season: row.try_get("season")?,
        current_spent: get_money(row, "current_spent")?,
        remaining_budget: get_money(row, "remaining_budget")?,
        free_transfers_remaining: get_u32(row, "free_transfers_remaining")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<TransferRecord> {
    let transfer_type: String = row.try_get("transfer_type")?;
    let transfer_type: TransferType =
        transfer_type.parse().map_err(|e| decode_err("transfer_type", e))?;
    Ok(TransferRecord {
        id: row.try_get("transfer_id")?,
        team_id: row.try_get("team_id")?,
        player_id: row.try_get("player_id")?,
        transfer_type,
        price: get_money(row, "price")?,
        week: get_u32(row, "week")?,
        season: row.try_get("season")?,
        transfer_date: row.try_get("transfer_date")?,
    })
}

const LEDGER_COLUMNS: &str =
    "team_id, season, current_spent, remaining_budget, free_transfers_remaining, last_updated";

async fn fetch_quote(conn: &mut PgConnection, player_id: PlayerId) -> Result<Option<PlayerQuote>> {
    let row = sqlx::query(
        "SELECT player_id, name, position, current_price FROM players WHERE player_id = $1",
    )
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(quote_from_row).transpose()
}

async fn fetch_quotes(
    conn: &mut PgConnection,
    player_ids: &[PlayerId],
) -> Result<HashMap<PlayerId, PlayerQuote>> {
    let rows = sqlx::query(
        "SELECT player_id, name, position, current_price FROM players WHERE player_id = ANY($1)",
    )
    .bind(player_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(|row| quote_from_row(row).map(|q| (q.player_id, q))).collect()
}

async fn fetch_roster(
    conn: &mut PgConnection,
    team_id: TeamId,
    week: u32,
    season: i32,
) -> Result<Vec<RosterEntry>> {
    let rows = sqlx::query(
        "SELECT team_id, player_id, week, season, position_slot FROM rosters \
         WHERE team_id = $1 AND week = $2 AND season = $3 ORDER BY player_id",
    )
    .bind(team_id)
    .bind(to_i32(week))
    .bind(season)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

async fn fetch_ledger(
    conn: &mut PgConnection,
    team_id: TeamId,
    for_update: bool,
) -> Result<Option<TeamLedger>> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {LEDGER_COLUMNS} FROM teams WHERE team_id = $1{lock}");
    let row = sqlx::query(&sql).bind(team_id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(ledger_from_row).transpose()
}

async fn fetch_constraints(conn: &mut PgConnection, season: i32) -> Result<Option<RosterConstraints>> {
    let row = sqlx::query(
        "SELECT season, budget_cap, floor_price, roster_size, position_minimums, \
         position_maximums, free_transfers_per_week, max_banked_free_transfers, \
         point_cost_per_transfer FROM roster_constraints WHERE season = $1",
    )
    .bind(season)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let minimums: String = row.try_get("position_minimums")?;
    let maximums: String = row.try_get("position_maximums")?;
    let position_minimums: BTreeMap<Position, u32> = serde_json::from_str(&minimums)?;
    let position_maximums: BTreeMap<Position, u32> = serde_json::from_str(&maximums)?;

    Ok(Some(RosterConstraints {
        season: row.try_get("season")?,
        budget_cap: get_money(&row, "budget_cap")?,
        floor_price: get_money(&row, "floor_price")?,
        roster_size: get_u32(&row, "roster_size")?,
        position_minimums,
        position_maximums,
        free_transfers_per_week: get_u32(&row, "free_transfers_per_week")?,
        max_banked_free_transfers: get_u32(&row, "max_banked_free_transfers")?,
        point_cost_per_transfer: get_u32(&row, "point_cost_per_transfer")?,
    }))
}

async fn fetch_period(conn: &mut PgConnection) -> Result<Period> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT setting_value FROM app_settings WHERE setting_key = $1")
            .bind(CURRENT_PERIOD_KEY)
            .fetch_optional(&mut *conn)
            .await?;

    match value {
        Some(raw) => Ok(raw.parse::<Period>().map_err(|e| decode_err("setting_value", e))?),
        None => Ok(Period::default()),
    }
}

/// Plain pooled connection for reads outside a transaction
struct PgReader {
    conn: PoolConnection<Postgres>,
}

#[async_trait::async_trait]
impl RosterReads for PgReader {
    async fn player_quote(&mut self, player_id: PlayerId) -> Result<Option<PlayerQuote>> {
        fetch_quote(&mut self.conn, player_id).await
    }

    async fn player_quotes(&mut self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, PlayerQuote>> {
        fetch_quotes(&mut self.conn, player_ids).await
    }

    async fn roster_snapshot(
        &mut self,
        team_id: TeamId,
        week: u32,
        season: i32,
    ) -> Result<Vec<RosterEntry>> {
        fetch_roster(&mut self.conn, team_id, week, season).await
    }

    async fn ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>> {
        fetch_ledger(&mut self.conn, team_id, false).await
    }

    async fn roster_constraints(&mut self, season: i32) -> Result<Option<RosterConstraints>> {
        fetch_constraints(&mut self.conn, season).await
    }

    async fn current_period(&mut self) -> Result<Period> {
        fetch_period(&mut self.conn).await
    }
}

struct PgTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or_else(|| TransferError::InvalidRequest {
            message: "transaction already finished".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl RosterReads for PgTransaction {
    async fn player_quote(&mut self, player_id: PlayerId) -> Result<Option<PlayerQuote>> {
        fetch_quote(self.conn()?, player_id).await
    }

    async fn player_quotes(&mut self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, PlayerQuote>> {
        fetch_quotes(self.conn()?, player_ids).await
    }

    async fn roster_snapshot(
        &mut self,
        team_id: TeamId,
        week: u32,
        season: i32,
    ) -> Result<Vec<RosterEntry>> {
        fetch_roster(self.conn()?, team_id, week, season).await
    }

    async fn ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>> {
        fetch_ledger(self.conn()?, team_id, false).await
    }

    async fn roster_constraints(&mut self, season: i32) -> Result<Option<RosterConstraints>> {
        fetch_constraints(self.conn()?, season).await
    }

    async fn current_period(&mut self) -> Result<Period> {
        fetch_period(self.conn()?).await
    }
}

#[async_trait::async_trait]
impl TransferTransaction for PgTransaction {
    async fn lock_ledger(&mut self, team_id: TeamId) -> Result<Option<TeamLedger>> {
        fetch_ledger(self.conn()?, team_id, true).await
    }

    async fn insert_ledger(&mut self, ledger: &TeamLedger) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO teams (team_id, season, current_spent, remaining_budget, \
             free_transfers_remaining, last_updated) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (team_id) DO NOTHING",
        )
        .bind(ledger.team_id)
        .bind(ledger.season)
        .bind(ledger.current_spent.to_decimal())
        .bind(ledger.remaining_budget.to_decimal())
        .bind(to_i32(ledger.free_transfers_remaining))
        .bind(ledger.last_updated)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_ledger(&mut self, expected_spent: Money, ledger: &TeamLedger) -> Result<()> {
        let result = sqlx::query(
            "UPDATE teams SET current_spent = $2, remaining_budget = $3, \
             free_transfers_remaining = $4, last_updated = $5 \
             WHERE team_id = $1 AND current_spent = $6",
        )
        .bind(ledger.team_id)
        .bind(ledger.current_spent.to_decimal())
        .bind(ledger.remaining_budget.to_decimal())
        .bind(to_i32(ledger.free_transfers_remaining))
        .bind(ledger.last_updated)
        .bind(expected_spent.to_decimal())
        .execute(self.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TransferError::LedgerConflict { team_id: ledger.team_id });
        }
        Ok(())
    }

    async fn copy_roster_forward(
        &mut self,
        team_id: TeamId,
        from_week: u32,
        to_week: u32,
        season: i32,
    ) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO rosters (team_id, player_id, week, season, position_slot) \
             SELECT team_id, player_id, $3, season, position_slot FROM rosters \
             WHERE team_id = $1 AND week = $2 AND season = $4 \
             ON CONFLICT (team_id, player_id, week, season) DO NOTHING",
        )
        .bind(team_id)
        .bind(to_i32(from_week))
        .bind(to_i32(to_week))
        .bind(season)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected())
    }

    async fn remove_roster_entry(
        &mut self,
        team_id: TeamId,
        player_id: PlayerId,
        week: u32,
        season: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM rosters WHERE team_id = $1 AND player_id = $2 AND week = $3 AND season = $4",
        )
        .bind(team_id)
        .bind(player_id)
        .bind(to_i32(week))
        .bind(season)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_roster_entry(&mut self, entry: &RosterEntry) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO rosters (team_id, player_id, week, season, position_slot) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (team_id, player_id, week, season) DO NOTHING",
        )
        .bind(entry.team_id)
        .bind(entry.player_id)
        .bind(to_i32(entry.week))
        .bind(entry.season)
        .bind(entry.position_slot.as_str())
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        let row = sqlx::query(
            "INSERT INTO transfers (team_id, player_id, transfer_type, price, week, season) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING transfer_id, team_id, player_id, transfer_type, price, week, season, transfer_date",
        )
        .bind(transfer.team_id)
        .bind(transfer.player_id)
        .bind(transfer.transfer_type.as_str())
        .bind(transfer.price.to_decimal())
        .bind(to_i32(transfer.week))
        .bind(transfer.season)
        .fetch_one(self.conn()?)
        .await?;

        record_from_row(&row)
    }

    async fn set_current_period(&mut self, period: Period) -> Result<()> {
        sqlx::query(
            "INSERT INTO app_settings (setting_key, setting_value) VALUES ($1, $2) \
             ON CONFLICT (setting_key) DO UPDATE SET setting_value = EXCLUDED.setting_value",
        )
        .bind(CURRENT_PERIOD_KEY)
        .bind(period.to_string())
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| TransferError::InvalidRequest {
            message: "transaction already finished".to_string(),
        })?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterStore for PgRosterStore {
    async fn reader(&self) -> Result<Box<dyn RosterReads>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgReader { conn }))
    }

    async fn begin(&self) -> Result<Box<dyn TransferTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    async fn transfer_history(&self, filter: &TransferHistoryFilter) -> Result<Vec<TransferRecord>> {
        let rows = sqlx::query(
            "SELECT transfer_id, team_id, player_id, transfer_type, price, week, season, transfer_date \
             FROM transfers \
             WHERE season = $1 AND ($2::BIGINT IS NULL OR team_id = $2) \
             AND ($3::INT IS NULL OR week = $3) \
             ORDER BY transfer_date DESC, transfer_id DESC LIMIT $4",
        )
        .bind(filter.season)
        .bind(filter.team_id)
        .bind(filter.week.map(to_i32))
        .bind(i64::from(filter.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn available_players(&self, _season: i32) -> Result<Vec<PlayerQuote>> {
        let rows = sqlx::query(
            "SELECT player_id, name, position, current_price FROM players \
             WHERE current_price IS NOT NULL ORDER BY player_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(quote_from_row).collect()
    }

    async fn teams(&self, season: i32) -> Result<Vec<TeamId>> {
        let teams = sqlx::query_scalar("SELECT team_id FROM teams WHERE season = $1 ORDER BY team_id")
            .bind(season)
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }
}
