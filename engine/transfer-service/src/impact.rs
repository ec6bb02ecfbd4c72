//! Transfer impact calculation
//!
//! The calculator is pure: it takes a ledger, a roster snapshot and price
//! quotes and reports what a proposed swap would do. Preview and execute both
//! load their inputs through [`assess`], so the two always agree when nothing
//! changes in between.

use crate::constraints::{count_positions, RosterConstraints};
use crate::ledger::{TeamLedger, TransferCharge};
use crate::money::Money;
use crate::period::Period;
use crate::player::{PlayerId, PlayerQuote, Position, TeamId};
use crate::roster::RosterEntry;
use crate::store::{season_constraints, RosterReads};
use crate::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A proposed set of swaps for one team and week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub team_id: TeamId,
    pub week: u32,
    pub season: i32,
    #[serde(default)]
    pub players_out: Vec<PlayerId>,
    #[serde(default)]
    pub players_in: Vec<PlayerId>,
}

impl TransferRequest {
    pub fn new(
        team_id: TeamId,
        week: u32,
        season: i32,
        players_out: Vec<PlayerId>,
        players_in: Vec<PlayerId>,
    ) -> Self {
        Self { team_id, week, season, players_out, players_in }
    }

    /// Shape checks that need no stored state
    pub fn validate(&self) -> Result<()> {
        if self.week == 0 {
            return Err(invalid("week must be 1 or later"));
        }

        if self.players_out.is_empty() && self.players_in.is_empty() {
            return Err(invalid("no players to transfer"));
        }

        let mut seen_out = HashSet::new();
        if let Some(id) = self.players_out.iter().find(|id| !seen_out.insert(**id)) {
            return Err(invalid(&format!("player {id} listed twice in players_out")));
        }

        let mut seen_in = HashSet::new();
        if let Some(id) = self.players_in.iter().find(|id| !seen_in.insert(**id)) {
            return Err(invalid(&format!("player {id} listed twice in players_in")));
        }

        if let Some(id) = self.players_in.iter().find(|id| seen_out.contains(*id)) {
            return Err(invalid(&format!("player {id} cannot be sold and bought together")));
        }

        Ok(())
    }

    /// Swaps consumed: a sell paired with a buy counts once
    pub fn transfers_count(&self) -> u32 {
        self.players_out.len().max(self.players_in.len()) as u32
    }
}

fn invalid(message: &str) -> TransferError {
    TransferError::InvalidRequest { message: message.to_string() }
}

/// A position below its season minimum on the resulting roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionShortfall {
    pub position: Position,
    pub missing: u32,
}

/// Everything a transfer would change, computed without mutating anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub team_id: TeamId,
    pub week: u32,
    pub season: i32,
    pub period: Period,
    pub current_spent: Money,
    /// Sum of outgoing players' current prices
    pub money_freed: Money,
    /// Sum of incoming players' current prices
    pub money_needed: Money,
    pub new_total_spent: Money,
    pub remaining_budget: Money,
    pub is_affordable: bool,
    pub position_valid: bool,
    pub missing_positions: Vec<PositionShortfall>,
    pub over_maximum: Vec<Position>,
    pub roster_overflow: bool,
    /// Players on the resulting roster
    pub roster_count: u32,
    pub roster_size: u32,
    pub transfers_count: u32,
    pub free_transfers_available: u32,
    pub free_transfers_after: u32,
    pub point_cost: u32,
    /// Incoming players already on the roster; their insert is a no-op
    pub already_rostered: Vec<PlayerId>,
    /// Budget missing to fill the open slots at floor price (advisory only)
    pub reservation_shortfall: Money,
}

impl ImpactReport {
    pub fn missing_position_names(&self) -> Vec<String> {
        self.missing_positions.iter().map(|s| s.position.to_string()).collect()
    }

    /// The transfer the executor would accept
    pub fn is_executable(&self) -> bool {
        self.is_affordable && self.position_valid
    }

    pub fn charge(&self) -> TransferCharge {
        TransferCharge {
            transfers_count: self.transfers_count,
            free_transfers_available: self.free_transfers_available,
            free_transfers_after: self.free_transfers_after,
            paid_transfers: self.transfers_count.saturating_sub(self.free_transfers_available),
            point_cost: self.point_cost,
        }
    }

    /// The first policy violation, in the order the executor checks them
    pub fn rejection(&self) -> Option<TransferError> {
        if !self.is_affordable {
            return Some(TransferError::Unaffordable {
                needed: self.money_needed,
                freed: self.money_freed,
                remaining: self.remaining_budget,
            });
        }

        if !self.missing_positions.is_empty() || !self.over_maximum.is_empty() {
            let mut missing = self.missing_position_names();
            missing.extend(self.over_maximum.iter().map(|p| format!("{p} (over maximum)")));
            return Some(TransferError::PositionConstraintViolated { missing });
        }

        if self.roster_overflow {
            return Some(TransferError::RosterFull { roster_size: self.roster_size });
        }

        None
    }
}

/// Pure impact computation for one period and policy
#[derive(Debug, Clone, Copy)]
pub struct ImpactCalculator<'a> {
    constraints: &'a RosterConstraints,
    period: Period,
}

impl<'a> ImpactCalculator<'a> {
    pub fn new(constraints: &'a RosterConstraints, period: Period) -> Self {
        Self { constraints, period }
    }

    /// Compute the impact of `request` against `roster`.
    ///
    /// `quotes` must hold every rostered, outgoing and incoming player.
    pub fn calculate(
        &self,
        request: &TransferRequest,
        ledger: &TeamLedger,
        roster: &[RosterEntry],
        quotes: &HashMap<PlayerId, PlayerQuote>,
    ) -> Result<ImpactReport> {
        let quote = |player_id: PlayerId| {
            quotes.get(&player_id).ok_or(TransferError::PlayerNotFound { player_id })
        };

        let rostered: HashSet<PlayerId> = roster.iter().map(|e| e.player_id).collect();

        let mut money_freed = Money::ZERO;
        for &player_id in &request.players_out {
            if !rostered.contains(&player_id) {
                return Err(TransferError::PlayerNotOnRoster { player_id, week: request.week });
            }
            money_freed += quote(player_id)?.current_price;
        }

        let mut money_needed = Money::ZERO;
        for &player_id in &request.players_in {
            money_needed += quote(player_id)?.current_price;
        }

        let outgoing: HashSet<PlayerId> = request.players_out.iter().copied().collect();
        let already_rostered: Vec<PlayerId> =
            request.players_in.iter().copied().filter(|id| rostered.contains(id)).collect();

        let mut resulting: Vec<PlayerId> =
            roster.iter().map(|e| e.player_id).filter(|id| !outgoing.contains(id)).collect();
        resulting.extend(request.players_in.iter().copied().filter(|id| !rostered.contains(id)));

        let positions = resulting.iter().map(|&id| quote(id).map(|q| q.position));
        let counts = count_positions(positions.collect::<Result<Vec<_>>>()?);
        let roster_count = resulting.len() as u32;
        let roster_size = self.constraints.roster_size;

        // Minimums only bind once the roster is complete
        let missing_positions = if roster_count >= roster_size {
            self.constraints
                .unmet_minimums(&counts)
                .into_iter()
                .map(|(position, missing)| PositionShortfall { position, missing })
                .collect()
        } else {
            Vec::new()
        };
        let over_maximum = self.constraints.exceeded_maximums(&counts);
        let roster_overflow = roster_count > roster_size;
        let position_valid =
            missing_positions.is_empty() && over_maximum.is_empty() && !roster_overflow;

        let new_total_spent = ledger.current_spent - money_freed + money_needed;
        let remaining_budget = self.constraints.budget_cap - new_total_spent;

        let open_slots = roster_size.saturating_sub(roster_count) as i64;
        let reservation_shortfall =
            (self.constraints.floor_price * open_slots).saturating_sub(remaining_budget);

        let charge = TransferCharge::assess(
            self.period,
            request.transfers_count(),
            ledger.free_transfers_remaining,
            self.constraints,
        );

        Ok(ImpactReport {
            team_id: request.team_id,
            week: request.week,
            season: request.season,
            period: self.period,
            current_spent: ledger.current_spent,
            money_freed,
            money_needed,
            new_total_spent,
            remaining_budget,
            is_affordable: !remaining_budget.is_negative(),
            position_valid,
            missing_positions,
            over_maximum,
            roster_overflow,
            roster_count,
            roster_size,
            transfers_count: charge.transfers_count,
            free_transfers_available: charge.free_transfers_available,
            free_transfers_after: charge.free_transfers_after,
            point_cost: charge.point_cost,
            already_rostered,
            reservation_shortfall,
        })
    }
}

/// Inputs and result of an impact assessment read from a store
#[derive(Debug, Clone)]
pub struct Assessment {
    pub report: ImpactReport,
    pub ledger: TeamLedger,
    pub constraints: RosterConstraints,
    /// Roster the report was computed against
    pub snapshot: Vec<RosterEntry>,
    /// False when the target week is empty and `snapshot` came from the prior week
    pub week_exists: bool,
    pub quotes: HashMap<PlayerId, PlayerQuote>,
}

/// Load the roster a transfer for `week` applies to: that week's entries, or
/// the prior week's when the target week has not been seeded yet.
pub async fn week_roster<R>(
    reader: &mut R,
    team_id: TeamId,
    week: u32,
    season: i32,
) -> Result<(Vec<RosterEntry>, bool)>
where
    R: RosterReads + ?Sized,
{
    let entries = reader.roster_snapshot(team_id, week, season).await?;
    let exists = !entries.is_empty();
    if exists || week <= 1 {
        return Ok((entries, exists));
    }

    let prior = reader.roster_snapshot(team_id, week - 1, season).await?;
    Ok((prior.into_iter().map(|e| e.carried_to(week)).collect(), false))
}

/// Read everything the calculator needs and compute the report.
///
/// `ledger` is passed in so the executor can supply the row it locked.
pub async fn assess<R>(
    reader: &mut R,
    request: &TransferRequest,
    ledger: TeamLedger,
    fallback: &RosterConstraints,
) -> Result<Assessment>
where
    R: RosterReads + ?Sized,
{
    request.validate()?;
    if ledger.season != request.season {
        return Err(invalid(&format!(
            "team {} plays season {}, not {}",
            ledger.team_id, ledger.season, request.season
        )));
    }

    let period = reader.current_period().await?;
    let constraints = season_constraints(reader, request.season, fallback).await?;

    let (snapshot, week_exists) =
        week_roster(reader, request.team_id, request.week, request.season).await?;

    let mut ids: Vec<PlayerId> = snapshot.iter().map(|e| e.player_id).collect();
    ids.extend(request.players_out.iter().copied());
    ids.extend(request.players_in.iter().copied());
    ids.sort_unstable();
    ids.dedup();
    let quotes = reader.player_quotes(&ids).await?;

    let report = ImpactCalculator::new(&constraints, period)
        .calculate(request, &ledger, &snapshot, &quotes)?;

    Ok(Assessment { report, ledger, constraints, snapshot, week_exists, quotes })
}
