//! Auto-draft: propose players that complete a roster within budget
//!
//! A feasibility-preserving heuristic. Every pick is capped so the slots
//! still open after it can be filled at floor price, which keeps the total
//! within the supplied budget whatever the random choices are.

use crate::config::{DraftConfig, DraftRequirement};
use crate::constraints::RosterConstraints;
use crate::money::Money;
use crate::player::{PlayerId, PlayerQuote, Position, TeamId};
use crate::roster::EffectiveRoster;
use crate::{Result, TransferError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Auto-complete a team's roster for one week, optionally on top of a staged transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDraftRequest {
    pub team_id: TeamId,
    pub week: u32,
    pub season: i32,
    #[serde(default)]
    pub staged_out: Vec<PlayerId>,
    #[serde(default)]
    pub staged_in: Vec<PlayerId>,
    /// Pins the random choices; fresh entropy when absent
    pub seed: Option<u64>,
}

impl AutoDraftRequest {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftOutcome {
    /// Every open slot got a player
    Filled,
    /// Some slots filled before the budget ran out
    Partial,
    /// No affordable candidate at all
    Nothing,
}

/// A requirement that could not be met in full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderFilled {
    pub position: Position,
    pub target: u32,
    pub missing: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDraftSummary {
    /// Picks in the order they were made
    pub selections: Vec<PlayerQuote>,
    pub spots_remaining: u32,
    pub spent: Money,
    pub remaining_budget: Money,
    pub fully_filled: bool,
    pub under_filled: Vec<UnderFilled>,
    pub outcome: DraftOutcome,
}

impl AutoDraftSummary {
    pub fn selected_ids(&self) -> Vec<PlayerId> {
        self.selections.iter().map(|p| p.player_id).collect()
    }

    pub fn message(&self) -> String {
        let picked = self.selections.len();
        match self.outcome {
            DraftOutcome::Filled => format!(
                "Added {picked} players to fill the roster, {} remaining",
                self.remaining_budget
            ),
            DraftOutcome::Partial => format!(
                "Added {picked} of {} players; not enough budget for the rest",
                self.spots_remaining
            ),
            DraftOutcome::Nothing => {
                "No affordable players found to add to the roster".to_string()
            }
        }
    }

    /// Treat an empty draft as an error
    pub fn ensure_selected(self) -> Result<Self> {
        if self.outcome == DraftOutcome::Nothing {
            return Err(TransferError::NoAffordableCandidates);
        }
        Ok(self)
    }
}

/// Highest price the next pick may cost while `slots_remaining` slots,
/// this one included, are still open.
pub fn pick_ceiling(budget: Money, slots_remaining: u32, floor_price: Money) -> Money {
    budget - floor_price * i64::from(slots_remaining.saturating_sub(1))
}

/// Mutable state of one draft run
struct Draft<'a, R: Rng> {
    available: &'a [PlayerQuote],
    constraints: &'a RosterConstraints,
    pool_size: usize,
    spend_ratio: Decimal,
    rng: &'a mut R,
    taken: HashSet<PlayerId>,
    counts: BTreeMap<Position, u32>,
    budget_left: Money,
    slots_left: u32,
    selections: Vec<PlayerQuote>,
}

impl<'a, R: Rng> Draft<'a, R> {
    fn ceiling(&self) -> Money {
        pick_ceiling(self.budget_left, self.slots_left, self.constraints.floor_price)
    }

    fn at_maximum(&self, position: Position) -> bool {
        self.constraints
            .maximum(position)
            .is_some_and(|max| self.counts.get(&position).copied().unwrap_or(0) >= max)
    }

    /// Untaken, affordable candidates accepted by `filter`
    fn eligible(&self, filter: impl Fn(&PlayerQuote) -> bool) -> Vec<&'a PlayerQuote> {
        let ceiling = self.ceiling();
        self.available
            .iter()
            .filter(|p| !self.taken.contains(&p.player_id))
            .filter(|p| p.current_price <= ceiling && !self.at_maximum(p.position))
            .filter(|p| filter(p))
            .collect()
    }

    /// Choose at random among the first `pool_size` of an already ranked list
    fn pick_from(&mut self, ranked: &[&'a PlayerQuote], phase: &str) -> bool {
        let pool = ranked.len().min(self.pool_size);
        if pool == 0 {
            return false;
        }

        let chosen = ranked[self.rng.gen_range(0..pool)];
        self.taken.insert(chosen.player_id);
        *self.counts.entry(chosen.position).or_insert(0) += 1;
        self.budget_left -= chosen.current_price;
        self.slots_left -= 1;
        self.selections.push(chosen.clone());

        debug!(
            player_id = chosen.player_id,
            position = %chosen.position,
            price = %chosen.current_price,
            budget_left = %self.budget_left,
            slots_left = self.slots_left,
            "Auto-draft {} pick",
            phase
        );
        true
    }

    fn count(&self, position: Position) -> u32 {
        self.counts.get(&position).copied().unwrap_or(0)
    }

    /// Fill one position requirement; returns how many picks were missing
    fn fill_requirement(
        &mut self,
        requirement: &DraftRequirement,
        requirements: &[DraftRequirement],
        target_per_player: Decimal,
    ) -> u32 {
        let unmet = requirement.target.saturating_sub(self.count(requirement.position));
        let needed = unmet.min(self.slots_left);
        if needed == 0 {
            return 0;
        }

        let still_needed: u32 =
            requirements.iter().map(|r| r.target.saturating_sub(self.count(r.position))).sum();
        let floor = self.constraints.floor_price;
        let reserved = floor * i64::from(still_needed.saturating_sub(needed));
        let available_here = (self.budget_left - reserved).to_decimal();

        let weighted = target_per_player * requirement.budget_weight;
        let aggressive = self.spend_ratio * available_here / Decimal::from(needed);
        let target = Money::from_decimal(weighted.max(aggressive)).max(floor);

        let mut picked = 0;
        for _ in 0..needed {
            let mut ranked = self.eligible(|p| p.position == requirement.position);
            ranked.sort_by_key(|p| (p.current_price.abs_diff(target), p.player_id));
            if !self.pick_from(&ranked, requirement.position.as_str()) {
                break;
            }
            picked += 1;
        }

        needed - picked
    }

    fn fill_flex(&mut self) {
        let floor = self.constraints.floor_price;
        while self.slots_left > 0 {
            let headroom = self.budget_left - floor * i64::from(self.slots_left - 1);
            let target = Money::from_decimal(self.spend_ratio * headroom.to_decimal()).max(floor);

            let mut ranked = self.eligible(|p| p.position.is_flex());
            ranked.sort_by_key(|p| (p.current_price.abs_diff(target), p.player_id));
            if !self.pick_from(&ranked, "flex") {
                break;
            }
        }
    }

    fn fill_cheapest(&mut self) {
        while self.slots_left > 0 {
            let mut ranked = self.eligible(|_| true);
            ranked.sort_by_key(|p| (p.current_price, p.player_id));
            if !self.pick_from(&ranked, "desperation") {
                break;
            }
        }
    }
}

/// Propose players to complete `roster` within `budget`.
///
/// `budget` is what the team can still spend, including any staged but
/// uncommitted transfer. Fails with `RosterFull` when no slot is open.
pub fn auto_draft<R: Rng>(
    roster: &EffectiveRoster,
    available: &[PlayerQuote],
    budget: Money,
    constraints: &RosterConstraints,
    config: &DraftConfig,
    rng: &mut R,
) -> Result<AutoDraftSummary> {
    let roster_size = constraints.roster_size;
    let spots_remaining = roster_size.saturating_sub(roster.len() as u32);
    if spots_remaining == 0 {
        return Err(TransferError::RosterFull { roster_size });
    }

    let target_budget = budget.saturating_sub(config.budget_buffer).max(Money::ZERO);
    let target_per_player = target_budget.to_decimal() / Decimal::from(spots_remaining);

    let mut draft = Draft {
        available,
        constraints,
        pool_size: config.pick_pool_size.max(1),
        spend_ratio: config.spend_ratio,
        rng,
        taken: roster.players().iter().map(|p| p.player_id).collect(),
        counts: roster.position_counts(),
        budget_left: budget,
        slots_left: spots_remaining,
        selections: Vec::new(),
    };

    let requirements = config.requirements(constraints);
    let mut under_filled = Vec::new();
    for requirement in &requirements {
        if draft.slots_left == 0 {
            break;
        }

        let missing = draft.fill_requirement(requirement, &requirements, target_per_player);
        if missing > 0 {
            warn!(
                position = %requirement.position,
                target = requirement.target,
                missing,
                "Auto-draft could not afford requirement"
            );
            under_filled.push(UnderFilled {
                position: requirement.position,
                target: requirement.target,
                missing,
            });
        }
    }

    draft.fill_flex();
    draft.fill_cheapest();

    let spent: Money = draft.selections.iter().map(|p| p.current_price).sum();
    let fully_filled = draft.slots_left == 0;
    let outcome = if fully_filled {
        DraftOutcome::Filled
    } else if draft.selections.is_empty() {
        DraftOutcome::Nothing
    } else {
        DraftOutcome::Partial
    };

    Ok(AutoDraftSummary {
        selections: draft.selections,
        spots_remaining,
        spent,
        remaining_budget: budget - spent,
        fully_filled,
        under_filled,
        outcome,
    })
}
