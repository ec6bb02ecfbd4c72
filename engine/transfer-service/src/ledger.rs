//! Per-team budget ledger and free-transfer economics

use crate::constraints::RosterConstraints;
use crate::money::Money;
use crate::period::Period;
use crate::player::TeamId;
use serde::{Deserialize, Serialize};

/// Financial state of a team for one season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLedger {
    pub team_id: TeamId,
    pub season: i32,
    pub current_spent: Money,
    /// Always budget_cap - current_spent
    pub remaining_budget: Money,
    pub free_transfers_remaining: u32,
    pub last_updated: chrono::NaiveDateTime,
}

impl TeamLedger {
    /// A freshly created team: nothing spent, weekly allotment of free transfers
    pub fn new(team_id: TeamId, constraints: &RosterConstraints) -> Self {
        Self {
            team_id,
            season: constraints.season,
            current_spent: Money::ZERO,
            remaining_budget: constraints.budget_cap,
            free_transfers_remaining: constraints.free_transfers_per_week,
            last_updated: chrono::Utc::now().naive_utc(),
        }
    }

    /// Ledger after a transfer settles at `new_spent`
    pub fn settled(&self, new_spent: Money, budget_cap: Money, charge: &TransferCharge) -> Self {
        Self {
            team_id: self.team_id,
            season: self.season,
            current_spent: new_spent,
            remaining_budget: budget_cap - new_spent,
            free_transfers_remaining: charge.free_transfers_after,
            last_updated: chrono::Utc::now().naive_utc(),
        }
    }

    /// Weekly top-up of free transfers, capped at the banking limit
    pub fn replenished(&self, constraints: &RosterConstraints) -> Self {
        let topped_up = self.free_transfers_remaining + constraints.free_transfers_per_week;
        Self {
            free_transfers_remaining: topped_up
                .min(constraints.max_banked_free_transfers.max(constraints.free_transfers_per_week)),
            last_updated: chrono::Utc::now().naive_utc(),
            ..self.clone()
        }
    }

    /// Holds when the ledger is consistent with the cap
    pub fn is_balanced(&self, budget_cap: Money) -> bool {
        self.remaining_budget == budget_cap - self.current_spent
    }
}

/// What a transfer costs in free transfers and points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCharge {
    pub transfers_count: u32,
    pub free_transfers_available: u32,
    pub free_transfers_after: u32,
    /// Transfers beyond the free allotment
    pub paid_transfers: u32,
    /// Deducted from this week's score
    pub point_cost: u32,
}

impl TransferCharge {
    /// Assess a transfer of `transfers_count` swaps in the given period
    pub fn assess(
        period: Period,
        transfers_count: u32,
        free_transfers_available: u32,
        constraints: &RosterConstraints,
    ) -> Self {
        if period.transfers_are_free() {
            return Self {
                transfers_count,
                free_transfers_available,
                free_transfers_after: free_transfers_available,
                paid_transfers: 0,
                point_cost: 0,
            };
        }

        let paid_transfers = transfers_count.saturating_sub(free_transfers_available);
        Self {
            transfers_count,
            free_transfers_available,
            free_transfers_after: free_transfers_available.saturating_sub(transfers_count),
            paid_transfers,
            point_cost: paid_transfers.saturating_mul(constraints.point_cost_per_transfer),
        }
    }
}
