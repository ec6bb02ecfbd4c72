//! Per-season roster policy

use crate::money::Money;
use crate::player::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Roster rules for one season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConstraints {
    pub season: i32,
    /// Total budget per team
    pub budget_cap: Money,
    /// Minimum legal player price
    pub floor_price: Money,
    pub roster_size: u32,
    pub position_minimums: BTreeMap<Position, u32>,
    /// Empty by default; a position absent here has no upper bound
    pub position_maximums: BTreeMap<Position, u32>,
    pub free_transfers_per_week: u32,
    /// Upper bound on free transfers carried into a week
    pub max_banked_free_transfers: u32,
    /// Points deducted for each transfer beyond the free allotment
    pub point_cost_per_transfer: u32,
}

impl Default for RosterConstraints {
    fn default() -> Self {
        let position_minimums = BTreeMap::from([
            (Position::QB, 1),
            (Position::RB, 3),
            (Position::WR, 3),
            (Position::TE, 1),
            (Position::K, 1),
            (Position::DEF, 1),
        ]);

        Self {
            season: 2024,
            budget_cap: Money::from_units(100),
            floor_price: Money::from_tenths(45),
            roster_size: 15,
            position_minimums,
            position_maximums: BTreeMap::new(),
            free_transfers_per_week: 1,
            max_banked_free_transfers: 1,
            point_cost_per_transfer: 6,
        }
    }
}

impl RosterConstraints {
    /// Default policy for the given season
    pub fn for_season(season: i32) -> Self {
        Self { season, ..Default::default() }
    }

    pub fn minimum(&self, position: Position) -> u32 {
        self.position_minimums.get(&position).copied().unwrap_or(0)
    }

    pub fn maximum(&self, position: Position) -> Option<u32> {
        self.position_maximums.get(&position).copied()
    }

    /// Positions below their minimum, with the shortfall for each
    pub fn unmet_minimums(&self, counts: &BTreeMap<Position, u32>) -> Vec<(Position, u32)> {
        Position::ALL
            .iter()
            .filter_map(|&position| {
                let have = counts.get(&position).copied().unwrap_or(0);
                let need = self.minimum(position);
                need.checked_sub(have)
                    .filter(|missing| *missing > 0)
                    .map(|missing| (position, missing))
            })
            .collect()
    }

    /// Positions above a configured maximum
    pub fn exceeded_maximums(&self, counts: &BTreeMap<Position, u32>) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|&position| match self.maximum(position) {
                Some(max) => counts.get(&position).copied().unwrap_or(0) > max,
                None => false,
            })
            .collect()
    }

    /// Validate the policy is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.roster_size == 0 {
            return Err("roster_size must be greater than 0".to_string());
        }

        if self.floor_price.is_negative() || self.floor_price.is_zero() {
            return Err("floor_price must be greater than 0".to_string());
        }

        let total_minimum: u32 = self.position_minimums.values().sum();
        if total_minimum > self.roster_size {
            return Err(format!(
                "position minimums ({total_minimum}) exceed roster_size ({})",
                self.roster_size
            ));
        }

        if self.floor_price * self.roster_size as i64 > self.budget_cap {
            return Err("budget_cap cannot cover a full roster at floor_price".to_string());
        }

        for (position, max) in &self.position_maximums {
            if *max < self.minimum(*position) {
                return Err(format!("maximum for {position} is below its minimum"));
            }
        }

        Ok(())
    }
}

/// Count players per position, including zero entries for every position
pub fn count_positions<I>(positions: I) -> BTreeMap<Position, u32>
where
    I: IntoIterator<Item = Position>,
{
    let mut counts: BTreeMap<Position, u32> = Position::ALL.iter().map(|&p| (p, 0)).collect();
    for position in positions {
        *counts.entry(position).or_insert(0) += 1;
    }
    counts
}
