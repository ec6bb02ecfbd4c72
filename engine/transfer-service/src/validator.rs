//! Roster validation against the season's budget and position policy

use crate::constraints::{count_positions, RosterConstraints};
use crate::impact::PositionShortfall;
use crate::money::Money;
use crate::player::{PlayerId, PlayerQuote, Position};
use crate::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How strictly a candidate roster is judged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterCompleteness {
    /// The roster is declared complete: exact size and every minimum met
    #[default]
    Final,
    /// Still being built: budget, duplicates and size ceiling only
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_cost: Money,
    pub remaining_budget: Money,
    pub player_count: u32,
    pub roster_size: u32,
    pub position_counts: BTreeMap<Position, u32>,
    pub missing_positions: Vec<PositionShortfall>,
    pub over_maximum: Vec<Position>,
    pub duplicate_ids: Vec<PlayerId>,
    pub completeness: RosterCompleteness,
    pub is_valid: bool,
    pub message: String,
}

/// Check a flat candidate list. Every id must have a quote in `quotes`.
pub fn validate_roster(
    player_ids: &[PlayerId],
    quotes: &HashMap<PlayerId, PlayerQuote>,
    constraints: &RosterConstraints,
    completeness: RosterCompleteness,
) -> Result<ValidationReport> {
    let mut seen = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let mut players = Vec::with_capacity(player_ids.len());

    for &player_id in player_ids {
        let quote = quotes.get(&player_id).ok_or(TransferError::PlayerNotFound { player_id })?;
        if !seen.insert(player_id) {
            if !duplicate_ids.contains(&player_id) {
                duplicate_ids.push(player_id);
            }
            continue;
        }
        players.push(quote);
    }

    let total_cost: Money = players.iter().map(|p| p.current_price).sum();
    let remaining_budget = constraints.budget_cap - total_cost;
    let position_counts = count_positions(players.iter().map(|p| p.position));
    let player_count = player_ids.len() as u32;

    let missing_positions: Vec<PositionShortfall> = match completeness {
        RosterCompleteness::Final => constraints
            .unmet_minimums(&position_counts)
            .into_iter()
            .map(|(position, missing)| PositionShortfall { position, missing })
            .collect(),
        RosterCompleteness::Partial => Vec::new(),
    };
    let over_maximum = constraints.exceeded_maximums(&position_counts);

    let mut problems = Vec::new();
    if remaining_budget.is_negative() {
        problems.push(format!(
            "Total cost {total_cost} exceeds budget cap {}",
            constraints.budget_cap
        ));
    }
    if !duplicate_ids.is_empty() {
        let ids: Vec<String> = duplicate_ids.iter().map(|id| id.to_string()).collect();
        problems.push(format!("Duplicate players: {}", ids.join(", ")));
    }
    match completeness {
        RosterCompleteness::Final if player_count != constraints.roster_size => {
            problems.push(format!(
                "Roster must contain exactly {} players, found {player_count}",
                constraints.roster_size
            ));
        }
        RosterCompleteness::Partial if player_count > constraints.roster_size => {
            problems.push(format!(
                "Roster cannot exceed {} players, found {player_count}",
                constraints.roster_size
            ));
        }
        _ => {}
    }
    if !missing_positions.is_empty() {
        let names: Vec<String> = missing_positions
            .iter()
            .map(|s| format!("{} (need {} more)", s.position, s.missing))
            .collect();
        problems.push(format!("Missing positions: {}", names.join(", ")));
    }
    if !over_maximum.is_empty() {
        let names: Vec<&str> = over_maximum.iter().map(|p| p.as_str()).collect();
        problems.push(format!("Too many players at: {}", names.join(", ")));
    }

    let is_valid = problems.is_empty();
    let message = if is_valid { "Roster is valid".to_string() } else { problems.join("; ") };

    Ok(ValidationReport {
        total_cost,
        remaining_budget,
        player_count,
        roster_size: constraints.roster_size,
        position_counts,
        missing_positions,
        over_maximum,
        duplicate_ids,
        completeness,
        is_valid,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> HashMap<PlayerId, PlayerQuote> {
        let layout = [
            (Position::QB, 2),
            (Position::RB, 4),
            (Position::WR, 5),
            (Position::TE, 2),
            (Position::K, 1),
            (Position::DEF, 1),
        ];
        let mut quotes = HashMap::new();
        let mut id = 0;
        for (position, count) in layout {
            for _ in 0..count {
                id += 1;
                quotes.insert(id, PlayerQuote::new(id, format!("{position}{id}"), position, Money::from_units(6)));
            }
        }
        quotes.insert(50, PlayerQuote::new(50, "Star WR", Position::WR, Money::from_units(20)));
        quotes
    }

    fn ids(range: std::ops::RangeInclusive<PlayerId>) -> Vec<PlayerId> {
        range.collect()
    }

    #[test]
    fn test_complete_roster_is_valid() {
        let report = validate_roster(
            &ids(1..=15),
            &pool(),
            &RosterConstraints::default(),
            RosterCompleteness::Final,
        )
        .unwrap();

        assert!(report.is_valid, "{}", report.message);
        assert_eq!(report.total_cost, Money::from_units(90));
        assert_eq!(report.remaining_budget, Money::from_units(10));
        assert_eq!(report.position_counts[&Position::WR], 5);
    }

    #[test]
    fn test_over_budget_roster_is_invalid() {
        let mut players = ids(1..=15);
        // Swap a 6.0 WR for the 20.0 one: 104.0 total
        players.retain(|id| *id != 7);
        players.push(50);

        let report = validate_roster(
            &players,
            &pool(),
            &RosterConstraints::default(),
            RosterCompleteness::Final,
        )
        .unwrap();

        assert!(!report.is_valid);
        assert!(report.remaining_budget.is_negative());
        assert!(report.message.contains("exceeds budget cap"));
    }

    #[test]
    fn test_missing_position_and_duplicates() {
        // Drop the kicker, duplicate a QB to keep the count at 15
        let mut players = ids(1..=15);
        players.retain(|id| *id != 14);
        players.push(1);

        let report = validate_roster(
            &players,
            &pool(),
            &RosterConstraints::default(),
            RosterCompleteness::Final,
        )
        .unwrap();

        assert!(!report.is_valid);
        assert_eq!(report.duplicate_ids, vec![1]);
        assert_eq!(report.missing_positions, vec![PositionShortfall { position: Position::K, missing: 1 }]);
    }

    #[test]
    fn test_partial_roster_skips_minimums() {
        let constraints = RosterConstraints::default();
        let partial =
            validate_roster(&ids(1..=5), &pool(), &constraints, RosterCompleteness::Partial).unwrap();
        assert!(partial.is_valid, "{}", partial.message);

        let final_check =
            validate_roster(&ids(1..=5), &pool(), &constraints, RosterCompleteness::Final).unwrap();
        assert!(!final_check.is_valid);
    }

    #[test]
    fn test_unknown_player_fails() {
        let err = validate_roster(
            &[1, 999],
            &pool(),
            &RosterConstraints::default(),
            RosterCompleteness::Partial,
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::PlayerNotFound { player_id: 999 }));
    }

    #[test]
    fn test_position_maximum() {
        let mut constraints = RosterConstraints::default();
        constraints.position_maximums.insert(Position::WR, 4);

        let report =
            validate_roster(&ids(1..=15), &pool(), &constraints, RosterCompleteness::Final).unwrap();
        assert_eq!(report.over_maximum, vec![Position::WR]);
        assert!(!report.is_valid);
    }
}
