//! Atomic application of a transfer
//!
//! Everything happens inside one store transaction holding the team's ledger
//! lock. Any failure rolls the whole transfer back.

use crate::constraints::RosterConstraints;
use crate::impact::{assess, ImpactReport, TransferRequest};
use crate::ledger::TeamLedger;
use crate::player::TeamId;
use crate::roster::RosterEntry;
use crate::store::{RosterStore, TransferTransaction};
use crate::transfer::{NewTransfer, TransferRecord, TransferType};
use crate::{Result, TransferError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub execution_id: Uuid,
    /// Ledger as committed
    pub ledger: TeamLedger,
    /// Sells first, then buys, in request order
    pub records: Vec<TransferRecord>,
    pub point_cost: u32,
    /// Impact computed under the lock; identical to a preview taken just before
    pub impact: ImpactReport,
}

/// Seed `week` from the prior week when it has no roster yet.
///
/// Week 1 starts empty. Returns the number of entries copied; a week that
/// already has entries is left alone.
pub async fn ensure_week_roster_exists(
    tx: &mut dyn TransferTransaction,
    team_id: TeamId,
    week: u32,
    season: i32,
) -> Result<u64> {
    if week <= 1 || !tx.roster_snapshot(team_id, week, season).await?.is_empty() {
        return Ok(0);
    }

    let copied = tx.copy_roster_forward(team_id, week - 1, week, season).await?;
    if copied > 0 {
        debug!(team_id, week, copied, "Seeded roster from previous week");
    }
    Ok(copied)
}

pub struct TransferExecutor<'a> {
    store: &'a dyn RosterStore,
    fallback_constraints: &'a RosterConstraints,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(store: &'a dyn RosterStore, fallback_constraints: &'a RosterConstraints) -> Self {
        Self { store, fallback_constraints }
    }

    pub async fn execute(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        request.validate()?;

        let mut tx = self.store.begin().await?;
        match self.apply(tx.as_mut(), request).await {
            Ok(receipt) => {
                tx.commit().await?;
                info!(
                    team_id = request.team_id,
                    week = request.week,
                    execution_id = %receipt.execution_id,
                    spent = %receipt.ledger.current_spent,
                    remaining = %receipt.ledger.remaining_budget,
                    point_cost = receipt.point_cost,
                    "Transfer committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed transfer also failed: {}", rollback_err);
                }
                debug!(team_id = request.team_id, week = request.week, "Transfer rejected: {}", e);
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut dyn TransferTransaction,
        request: &TransferRequest,
    ) -> Result<TransferReceipt> {
        let team_id = request.team_id;
        let ledger = tx
            .lock_ledger(team_id)
            .await?
            .ok_or(TransferError::TeamNotFound { team_id })?;

        let assessment = assess(tx, request, ledger, self.fallback_constraints).await?;
        if let Some(rejection) = assessment.report.rejection() {
            return Err(rejection);
        }

        ensure_week_roster_exists(tx, team_id, request.week, request.season).await?;

        let mut records = Vec::with_capacity(request.players_out.len() + request.players_in.len());

        for &player_id in &request.players_out {
            let price = assessment
                .quotes
                .get(&player_id)
                .map(|q| q.current_price)
                .ok_or(TransferError::PlayerNotFound { player_id })?;

            if !tx.remove_roster_entry(team_id, player_id, request.week, request.season).await? {
                return Err(TransferError::PlayerNotOnRoster { player_id, week: request.week });
            }

            let record = tx
                .record_transfer(NewTransfer {
                    team_id,
                    player_id,
                    transfer_type: TransferType::Sell,
                    price,
                    week: request.week,
                    season: request.season,
                })
                .await?;
            records.push(record);
        }

        for &player_id in &request.players_in {
            let price = assessment
                .quotes
                .get(&player_id)
                .map(|q| q.current_price)
                .ok_or(TransferError::PlayerNotFound { player_id })?;

            let entry = RosterEntry::bench(team_id, player_id, request.week, request.season);
            if !tx.insert_roster_entry(&entry).await? {
                warn!(team_id, player_id, week = request.week, "Bought player was already rostered");
            }

            let record = tx
                .record_transfer(NewTransfer {
                    team_id,
                    player_id,
                    transfer_type: TransferType::Buy,
                    price,
                    week: request.week,
                    season: request.season,
                })
                .await?;
            records.push(record);
        }

        let report = assessment.report;
        let settled = assessment.ledger.settled(
            report.new_total_spent,
            assessment.constraints.budget_cap,
            &report.charge(),
        );
        tx.update_ledger(assessment.ledger.current_spent, &settled).await?;

        Ok(TransferReceipt {
            execution_id: Uuid::new_v4(),
            ledger: settled,
            records,
            point_cost: report.point_cost,
            impact: report,
        })
    }
}
