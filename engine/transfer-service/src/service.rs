//! TransferService: the public face of the engine

use crate::auto_draft::{auto_draft, AutoDraftRequest, AutoDraftSummary};
use crate::config::TransferServiceConfig;
use crate::constraints::RosterConstraints;
use crate::executor::{TransferExecutor, TransferReceipt};
use crate::impact::{assess, week_roster, ImpactReport, TransferRequest};
use crate::ledger::TeamLedger;
use crate::money::Money;
use crate::period::Period;
use crate::player::{PlayerId, PlayerQuote, TeamId};
use crate::roster::EffectiveRoster;
use crate::store::{season_constraints, PgRosterStore, RosterStore};
use crate::transfer::{TransferHistoryFilter, TransferRecord};
use crate::validator::{validate_roster, RosterCompleteness, ValidationReport};
use crate::{Result, TransferError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Default page size for one team's history
pub const TEAM_HISTORY_LIMIT: u32 = 20;

/// Current market value of a team's roster for one week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterValue {
    pub team_id: TeamId,
    pub week: u32,
    pub season: i32,
    pub player_count: u32,
    pub total_value: Money,
}

/// Result of moving the season to a new week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekAdvance {
    pub from: Period,
    pub to: Period,
    pub teams: u32,
    pub roster_entries_copied: u64,
}

pub struct TransferService {
    store: Arc<dyn RosterStore>,
    config: TransferServiceConfig,
}

impl TransferService {
    /// Connect to PostgreSQL and apply migrations
    pub async fn new(config: TransferServiceConfig) -> Result<Self> {
        let store = PgRosterStore::connect(&config.database).await?;
        store.migrate().await?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<dyn RosterStore>, config: TransferServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TransferServiceConfig {
        &self.config
    }

    /// Policy in force for a season
    pub async fn constraints(&self, season: i32) -> Result<RosterConstraints> {
        let mut reader = self.store.reader().await?;
        season_constraints(reader.as_mut(), season, &self.config.constraints).await
    }

    /// Register a team with nothing spent and the weekly free transfers
    pub async fn create_team(&self, team_id: TeamId, season: i32) -> Result<TeamLedger> {
        let mut tx = self.store.begin().await?;
        let constraints = season_constraints(tx.as_mut(), season, &self.config.constraints).await?;
        let ledger = TeamLedger::new(team_id, &constraints);

        if !tx.insert_ledger(&ledger).await? {
            tx.rollback().await?;
            return Err(TransferError::InvalidRequest {
                message: format!("team {team_id} already exists"),
            });
        }
        tx.commit().await?;

        info!(team_id, season, budget = %ledger.remaining_budget, "Team created");
        Ok(ledger)
    }

    pub async fn ledger(&self, team_id: TeamId) -> Result<TeamLedger> {
        let mut reader = self.store.reader().await?;
        reader.ledger(team_id).await?.ok_or(TransferError::TeamNotFound { team_id })
    }

    /// What a transfer would do, without changing anything
    pub async fn preview_transfer(&self, request: &TransferRequest) -> Result<ImpactReport> {
        let mut reader = self.store.reader().await?;
        let ledger = reader
            .ledger(request.team_id)
            .await?
            .ok_or(TransferError::TeamNotFound { team_id: request.team_id })?;

        let assessment = assess(reader.as_mut(), request, ledger, &self.config.constraints).await?;
        Ok(assessment.report)
    }

    /// Apply a transfer atomically
    pub async fn execute_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        TransferExecutor::new(self.store.as_ref(), &self.config.constraints).execute(request).await
    }

    /// Check a candidate roster against a season's policy
    pub async fn validate_roster(
        &self,
        player_ids: &[PlayerId],
        season: i32,
        completeness: RosterCompleteness,
    ) -> Result<ValidationReport> {
        let mut reader = self.store.reader().await?;
        let constraints = season_constraints(reader.as_mut(), season, &self.config.constraints).await?;
        let quotes = reader.player_quotes(player_ids).await?;
        validate_roster(player_ids, &quotes, &constraints, completeness)
    }

    /// Run the allocator with this service's draft tuning
    pub fn auto_draft<R: Rng>(
        &self,
        roster: &EffectiveRoster,
        available: &[PlayerQuote],
        budget: Money,
        constraints: &RosterConstraints,
        rng: &mut R,
    ) -> Result<AutoDraftSummary> {
        auto_draft(roster, available, budget, constraints, &self.config.draft, rng)
    }

    /// Propose players that complete a team's roster for a week.
    ///
    /// A staged transfer is taken into account: its outgoing players are
    /// dropped, its incoming players kept, and the budget is the preview's
    /// remaining budget.
    pub async fn auto_complete_roster(&self, request: &AutoDraftRequest) -> Result<AutoDraftSummary> {
        let team_id = request.team_id;
        let mut reader = self.store.reader().await?;
        let ledger = reader.ledger(team_id).await?.ok_or(TransferError::TeamNotFound { team_id })?;
        let constraints =
            season_constraints(reader.as_mut(), request.season, &self.config.constraints).await?;

        let budget = if request.staged_out.is_empty() && request.staged_in.is_empty() {
            constraints.budget_cap - ledger.current_spent
        } else {
            let staged = TransferRequest::new(
                team_id,
                request.week,
                request.season,
                request.staged_out.clone(),
                request.staged_in.clone(),
            );
            assess(reader.as_mut(), &staged, ledger, &self.config.constraints)
                .await?
                .report
                .remaining_budget
        };

        let (snapshot, _) = week_roster(reader.as_mut(), team_id, request.week, request.season).await?;
        let committed_ids: Vec<PlayerId> = snapshot.iter().map(|e| e.player_id).collect();
        let mut quotes = reader.player_quotes(&committed_ids).await?;
        quotes.extend(reader.player_quotes(&request.staged_in).await?);

        let lookup = |player_id: PlayerId| {
            quotes.get(&player_id).cloned().ok_or(TransferError::PlayerNotFound { player_id })
        };
        let committed = committed_ids.iter().map(|id| lookup(*id)).collect::<Result<Vec<_>>>()?;
        let pending_in = request.staged_in.iter().map(|id| lookup(*id)).collect::<Result<Vec<_>>>()?;
        let roster = EffectiveRoster::new(committed, &request.staged_out, pending_in);

        let mut available = self.store.available_players(request.season).await?;
        available.retain(|p| !request.staged_out.contains(&p.player_id));
        let mut rng = request.rng();
        let summary =
            auto_draft(&roster, &available, budget, &constraints, &self.config.draft, &mut rng)?;

        info!(
            team_id,
            week = request.week,
            picked = summary.selections.len(),
            spent = %summary.spent,
            outcome = ?summary.outcome,
            "Auto-draft proposal ready"
        );
        Ok(summary)
    }

    /// One team's transfers, optionally for one week, newest first
    pub async fn team_transfer_history(
        &self,
        team_id: TeamId,
        season: i32,
        week: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<TransferRecord>> {
        let filter = TransferHistoryFilter {
            season,
            team_id: Some(team_id),
            week,
            limit: limit.unwrap_or(TEAM_HISTORY_LIMIT),
        };
        self.store.transfer_history(&filter).await
    }

    /// All transfers of a season, optionally for one week, newest first
    pub async fn transfer_history(
        &self,
        season: i32,
        week: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<TransferRecord>> {
        let filter = TransferHistoryFilter {
            season,
            team_id: None,
            week,
            limit: limit.unwrap_or(self.config.history_limit),
        };
        self.store.transfer_history(&filter).await
    }

    /// Move the season from its current period to `to_week`.
    ///
    /// The period being closed is read from the store. Closing a week carries
    /// every team's roster into `to_week` unless the team already has one
    /// there from transfers made ahead, and tops up free transfers. Leaving
    /// Preseason or Setup copies nothing and grants nothing: teams start
    /// week 1 with the rosters they built.
    pub async fn advance_week(&self, to_week: u32, season: i32) -> Result<WeekAdvance> {
        let teams = self.store.teams(season).await?;
        let mut tx = self.store.begin().await?;

        let from = tx.current_period().await?;
        let closing_week = from.week();
        if to_week == 0 || closing_week.is_some_and(|week| to_week <= week) {
            tx.rollback().await?;
            return Err(TransferError::InvalidRequest {
                message: format!("cannot advance from {from} to week {to_week}"),
            });
        }

        let constraints = season_constraints(tx.as_mut(), season, &self.config.constraints).await?;

        let mut copied = 0;
        if let Some(week) = closing_week {
            for &team_id in &teams {
                if tx.roster_snapshot(team_id, to_week, season).await?.is_empty() {
                    copied += tx.copy_roster_forward(team_id, week, to_week, season).await?;
                } else {
                    debug!(team_id, week = to_week, "Roster already set for the new week");
                }

                let ledger =
                    tx.lock_ledger(team_id).await?.ok_or(TransferError::TeamNotFound { team_id })?;
                tx.update_ledger(ledger.current_spent, &ledger.replenished(&constraints)).await?;
            }
        }

        let to = Period::Week(to_week);
        tx.set_current_period(to).await?;
        tx.commit().await?;

        info!(season, from = %from, to = %to, teams = teams.len(), copied, "Week advanced");
        Ok(WeekAdvance { from, to, teams: teams.len() as u32, roster_entries_copied: copied })
    }

    /// Sum of current prices across a team's roster for a week
    pub async fn roster_value(&self, team_id: TeamId, week: u32, season: i32) -> Result<RosterValue> {
        let mut reader = self.store.reader().await?;
        let (snapshot, _) = week_roster(reader.as_mut(), team_id, week, season).await?;
        let ids: Vec<PlayerId> = snapshot.iter().map(|e| e.player_id).collect();
        let quotes = reader.player_quotes(&ids).await?;

        let total_value = ids
            .iter()
            .map(|&player_id| {
                quotes
                    .get(&player_id)
                    .map(|q| q.current_price)
                    .ok_or(TransferError::PlayerNotFound { player_id })
            })
            .sum::<Result<Money>>()?;

        Ok(RosterValue { team_id, week, season, player_count: ids.len() as u32, total_value })
    }
}
