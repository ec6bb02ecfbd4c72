//! End-to-end tests for TransferService over the in-memory store

use crate::auto_draft::{AutoDraftRequest, DraftOutcome};
use crate::config::TransferServiceConfig;
use crate::constraints::RosterConstraints;
use crate::impact::TransferRequest;
use crate::ledger::TeamLedger;
use crate::money::Money;
use crate::period::Period;
use crate::player::{PlayerId, PlayerQuote, Position, TeamId};
use crate::roster::{PositionSlot, RosterEntry};
use crate::store::{InMemoryRosterStore, RosterReads, RosterStore};
use crate::transfer::TransferType;
use crate::validator::RosterCompleteness;
use crate::{TransferError, TransferService};
use std::sync::Arc;

const SEASON: i32 = 2024;
const TEAM: TeamId = 1;
const WEEK: u32 = 5;

const LAYOUT: [Position; 15] = [
    Position::QB,
    Position::QB,
    Position::RB,
    Position::RB,
    Position::RB,
    Position::RB,
    Position::WR,
    Position::WR,
    Position::WR,
    Position::WR,
    Position::WR,
    Position::TE,
    Position::TE,
    Position::K,
    Position::DEF,
];

// Free agents
const WR_8: PlayerId = 100;
const QB_20: PlayerId = 101;
const K_45: PlayerId = 102;
const RB_5: PlayerId = 103;
const RB_9: PlayerId = 104;
const WR_9: PlayerId = 105;

struct Harness {
    store: Arc<InMemoryRosterStore>,
    service: Arc<TransferService>,
}

impl Harness {
    async fn ledger(&self, team_id: TeamId) -> TeamLedger {
        self.store.ledger_snapshot(team_id).await.expect("ledger exists")
    }

    async fn roster(&self, team_id: TeamId, week: u32) -> Vec<PlayerId> {
        self.store.roster_ids(team_id, week, SEASON).await
    }
}

fn quote(id: PlayerId, position: Position, tenths: i64) -> PlayerQuote {
    PlayerQuote::new(id, format!("{position} {id}"), position, Money::from_tenths(tenths))
}

/// Team 1 holds players 1-15 at 6.0 each for `roster_week`; 10.0 left
async fn harness(period: Period, roster_week: u32) -> Harness {
    let store = Arc::new(InMemoryRosterStore::new());
    store.set_period(period).await;

    for (i, position) in LAYOUT.iter().enumerate() {
        let id = i as PlayerId + 1;
        store.upsert_player(quote(id, *position, 60)).await;
        store
            .put_roster_entry(RosterEntry {
                team_id: TEAM,
                player_id: id,
                week: roster_week,
                season: SEASON,
                position_slot: if i == 0 { PositionSlot::QB } else { PositionSlot::BENCH },
            })
            .await;
    }

    for free_agent in [
        quote(WR_8, Position::WR, 80),
        quote(QB_20, Position::QB, 200),
        quote(K_45, Position::K, 45),
        quote(RB_5, Position::RB, 50),
        quote(RB_9, Position::RB, 90),
        quote(WR_9, Position::WR, 90),
    ] {
        store.upsert_player(free_agent).await;
    }

    // Eight floor-priced players per position for the allocator
    for (p, position) in Position::ALL.iter().enumerate() {
        for k in 0..8 {
            let id = 200 + (p as PlayerId) * 10 + k;
            store.upsert_player(quote(id, *position, 45)).await;
        }
    }

    let constraints = RosterConstraints::default();
    let mut ledger = TeamLedger::new(TEAM, &constraints);
    ledger.current_spent = Money::from_units(90);
    ledger.remaining_budget = Money::from_units(10);
    store.put_ledger(ledger).await;

    let service = Arc::new(TransferService::with_store(
        store.clone() as Arc<dyn RosterStore>,
        TransferServiceConfig::default(),
    ));
    Harness { store, service }
}

fn swap(out: Vec<PlayerId>, into: Vec<PlayerId>) -> TransferRequest {
    TransferRequest::new(TEAM, WEEK, SEASON, out, into)
}

#[tokio::test]
async fn test_buy_eight_sell_six_moves_budget() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let request = swap(vec![7], vec![WR_8]);

    let preview = h.service.preview_transfer(&request).await.unwrap();
    assert_eq!(preview.money_freed, Money::from_units(6));
    assert_eq!(preview.money_needed, Money::from_units(8));

    let receipt = tokio_test::assert_ok!(h.service.execute_transfer(&request).await);
    assert_eq!(receipt.ledger.current_spent, Money::from_units(92));
    assert_eq!(receipt.ledger.remaining_budget, Money::from_units(8));
    assert_eq!(receipt.impact, preview);

    let types: Vec<(PlayerId, TransferType)> =
        receipt.records.iter().map(|r| (r.player_id, r.transfer_type)).collect();
    assert_eq!(types, vec![(7, TransferType::Sell), (WR_8, TransferType::Buy)]);
    assert_eq!(receipt.records[0].price, Money::from_units(6));
    assert_eq!(receipt.records[1].price, Money::from_units(8));

    let ledger = h.ledger(TEAM).await;
    assert!(ledger.is_balanced(Money::from_units(100)));
    assert_eq!(ledger, receipt.ledger);

    let roster = h.roster(TEAM, WEEK).await;
    assert!(roster.contains(&WR_8));
    assert!(!roster.contains(&7));
    assert_eq!(roster.len(), 15);
}

#[tokio::test]
async fn test_unaffordable_transfer_changes_nothing() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let before_ledger = h.ledger(TEAM).await;
    let before_roster = h.roster(TEAM, WEEK).await;

    let err = tokio_test::assert_err!(h.service.execute_transfer(&swap(vec![1], vec![QB_20])).await);
    assert!(matches!(err, TransferError::Unaffordable { .. }));
    assert!(err.is_rejection());

    assert_eq!(h.ledger(TEAM).await, before_ledger);
    assert_eq!(h.roster(TEAM, WEEK).await, before_roster);
    assert_eq!(h.store.transfer_count().await, 0);
}

#[tokio::test]
async fn test_selling_unrostered_player_changes_nothing() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let before_ledger = h.ledger(TEAM).await;

    let err = h.service.execute_transfer(&swap(vec![WR_8], vec![])).await.unwrap_err();
    assert!(matches!(err, TransferError::PlayerNotOnRoster { player_id: WR_8, week: WEEK }));

    assert_eq!(h.ledger(TEAM).await, before_ledger);
    assert_eq!(h.roster(TEAM, WEEK).await.len(), 15);
    assert_eq!(h.store.transfer_count().await, 0);
}

#[tokio::test]
async fn test_position_minimums_block_transfer() {
    let h = harness(Period::Week(WEEK), WEEK).await;

    let err = h.service.execute_transfer(&swap(vec![14], vec![RB_5])).await.unwrap_err();
    match err {
        TransferError::PositionConstraintViolated { missing } => {
            assert_eq!(missing, vec!["K".to_string()])
        }
        other => panic!("expected position violation, got {other:?}"),
    }
    assert!(h.roster(TEAM, WEEK).await.contains(&14));
}

#[tokio::test]
async fn test_buying_onto_full_roster_is_rejected() {
    let h = harness(Period::Preseason, WEEK).await;
    let err = h.service.execute_transfer(&swap(vec![], vec![K_45])).await.unwrap_err();
    assert!(matches!(err, TransferError::RosterFull { roster_size: 15 }));
}

#[tokio::test]
async fn test_preseason_transfers_are_free() {
    let h = harness(Period::Preseason, WEEK).await;
    let request = swap(vec![3, 4, 5], vec![RB_5, RB_9, 200 + 10]);

    let receipt = h.service.execute_transfer(&request).await.unwrap();
    assert_eq!(receipt.impact.transfers_count, 3);
    assert_eq!(receipt.point_cost, 0);
    assert_eq!(receipt.ledger.free_transfers_remaining, 1);
}

#[tokio::test]
async fn test_extra_weekly_transfers_cost_points() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let request = swap(vec![3, 4, 5], vec![RB_5, 210, 211]);

    let receipt = h.service.execute_transfer(&request).await.unwrap();
    assert_eq!(receipt.point_cost, 12);
    assert_eq!(receipt.ledger.free_transfers_remaining, 0);
    // 90 - 18 + 5 + 4.5 + 4.5
    assert_eq!(receipt.ledger.current_spent, Money::from_units(86));
}

#[tokio::test]
async fn test_empty_week_is_seeded_from_previous_week() {
    let h = harness(Period::Week(WEEK), WEEK - 1).await;
    let request = swap(vec![7], vec![WR_8]);

    let preview = h.service.preview_transfer(&request).await.unwrap();
    assert!(preview.is_executable());
    assert_eq!(preview.roster_count, 15);

    let receipt = h.service.execute_transfer(&request).await.unwrap();
    assert_eq!(receipt.impact, preview);

    let week_five = h.roster(TEAM, WEEK).await;
    assert_eq!(week_five.len(), 15);
    assert!(week_five.contains(&WR_8));
    assert!(!week_five.contains(&7));

    // The closed week is untouched
    let week_four = h.roster(TEAM, WEEK - 1).await;
    assert!(week_four.contains(&7));
    assert!(!week_four.contains(&WR_8));
}

#[tokio::test]
async fn test_store_failure_rolls_back_everything() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    h.store.fail_transfers_for(Some(WR_8)).await;
    let before_ledger = h.ledger(TEAM).await;

    let err = h.service.execute_transfer(&swap(vec![7], vec![WR_8])).await.unwrap_err();
    assert!(matches!(err, TransferError::DatabaseError(_)));
    assert!(!err.is_rejection());

    // The sell of player 7 happened before the failure and must not survive
    assert!(h.roster(TEAM, WEEK).await.contains(&7));
    assert_eq!(h.ledger(TEAM).await, before_ledger);
    assert_eq!(h.store.transfer_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_transfers_cannot_overspend() {
    let h = harness(Period::Week(WEEK), WEEK).await;

    // Drop to 14 players with 16.0 left, then race two 9.0 buys
    h.service.execute_transfer(&swap(vec![11], vec![])).await.unwrap();
    assert_eq!(h.ledger(TEAM).await.remaining_budget, Money::from_units(16));

    let mut handles = Vec::new();
    for player in [RB_9, WR_9] {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service.execute_transfer(&swap(vec![], vec![player])).await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }
    assert_eq!(committed, 1);

    let ledger = h.ledger(TEAM).await;
    assert_eq!(ledger.current_spent, Money::from_units(93));
    assert!(ledger.is_balanced(Money::from_units(100)));
    assert_eq!(h.roster(TEAM, WEEK).await.len(), 15);
}

#[tokio::test]
async fn test_price_move_between_preview_and_execute() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let request = swap(vec![7], vec![WR_8]);
    let preview = h.service.preview_transfer(&request).await.unwrap();
    assert!(preview.is_affordable);

    // The market reprices before execution; execute re-derives and rejects
    h.store.set_price(WR_8, Money::from_units(17)).await.unwrap();
    let err = h.service.execute_transfer(&request).await.unwrap_err();
    assert!(matches!(err, TransferError::Unaffordable { .. }));
}

#[tokio::test]
async fn test_buying_rostered_player_is_charged_without_duplicate() {
    let h = harness(Period::Preseason, WEEK).await;
    let receipt = h.service.execute_transfer(&swap(vec![7], vec![8])).await.unwrap();

    assert_eq!(receipt.impact.already_rostered, vec![8]);
    assert_eq!(receipt.ledger.current_spent, Money::from_units(90));
    assert_eq!(h.roster(TEAM, WEEK).await.len(), 14);
}

#[tokio::test]
async fn test_create_team_once() {
    let h = harness(Period::Preseason, 1).await;

    let ledger = h.service.create_team(50, SEASON).await.unwrap();
    assert_eq!(ledger.current_spent, Money::ZERO);
    assert_eq!(ledger.remaining_budget, Money::from_units(100));
    assert_eq!(ledger.free_transfers_remaining, 1);

    let err = h.service.create_team(50, SEASON).await.unwrap_err();
    assert!(matches!(err, TransferError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_unknown_team() {
    let h = harness(Period::Preseason, 1).await;
    let request = TransferRequest::new(999, 1, SEASON, vec![], vec![K_45]);

    let err = h.service.preview_transfer(&request).await.unwrap_err();
    assert!(matches!(err, TransferError::TeamNotFound { team_id: 999 }));
}

#[tokio::test]
async fn test_validate_roster_through_service() {
    let h = harness(Period::Preseason, 1).await;

    let legal: Vec<PlayerId> = (1..=15).collect();
    let report = h.service.validate_roster(&legal, SEASON, RosterCompleteness::Final).await.unwrap();
    assert!(report.is_valid, "{}", report.message);
    assert_eq!(report.total_cost, Money::from_units(90));

    let err = h
        .service
        .validate_roster(&[1, 9999], SEASON, RosterCompleteness::Partial)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::PlayerNotFound { player_id: 9999 }));
}

#[tokio::test]
async fn test_auto_complete_then_execute_new_team() {
    let h = harness(Period::Preseason, 1).await;
    h.service.create_team(2, SEASON).await.unwrap();

    let request = AutoDraftRequest { team_id: 2, week: 1, season: SEASON, seed: Some(17), ..Default::default() };
    let summary = h.service.auto_complete_roster(&request).await.unwrap();
    assert_eq!(summary.outcome, DraftOutcome::Filled);
    assert_eq!(summary.selections.len(), 15);
    assert!(summary.spent <= Money::from_units(100));

    // Same seed, same proposal
    let again = h.service.auto_complete_roster(&request).await.unwrap();
    assert_eq!(again.selected_ids(), summary.selected_ids());

    let buy = TransferRequest::new(2, 1, SEASON, vec![], summary.selected_ids());
    let receipt = h.service.execute_transfer(&buy).await.unwrap();
    assert_eq!(receipt.ledger.current_spent, summary.spent);
    assert_eq!(receipt.point_cost, 0);
    assert_eq!(h.roster(2, 1).await.len(), 15);
}

#[tokio::test]
async fn test_auto_complete_respects_staged_transfer() {
    let h = harness(Period::Week(WEEK), WEEK).await;

    let full = AutoDraftRequest { team_id: TEAM, week: WEEK, season: SEASON, seed: Some(1), ..Default::default() };
    let err = h.service.auto_complete_roster(&full).await.unwrap_err();
    assert!(matches!(err, TransferError::RosterFull { roster_size: 15 }));

    let staged = AutoDraftRequest { staged_out: vec![7], ..full };
    let summary = h.service.auto_complete_roster(&staged).await.unwrap();
    assert_eq!(summary.selections.len(), 1);
    assert_ne!(summary.selections[0].player_id, 7);
    // Budget is 10.0 plus the 6.0 freed by the staged sale
    assert!(summary.spent <= Money::from_units(16));
    assert_eq!(summary.remaining_budget, Money::from_units(16) - summary.spent);
}

#[tokio::test]
async fn test_auto_complete_with_no_budget_selects_nothing() {
    let h = harness(Period::Preseason, 1).await;
    let mut ledger = h.service.create_team(2, SEASON).await.unwrap();
    ledger.current_spent = Money::from_units(98);
    ledger.remaining_budget = Money::from_units(2);
    h.store.put_ledger(ledger).await;

    let request = AutoDraftRequest { team_id: 2, week: 1, season: SEASON, seed: Some(3), ..Default::default() };
    let summary = h.service.auto_complete_roster(&request).await.unwrap();
    assert_eq!(summary.outcome, DraftOutcome::Nothing);
    assert!(summary.selections.is_empty());

    let err = summary.ensure_selected().unwrap_err();
    assert!(matches!(err, TransferError::NoAffordableCandidates));
}

#[tokio::test]
async fn test_history_newest_first_with_filters() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    h.service.create_team(2, SEASON).await.unwrap();

    h.service.execute_transfer(&swap(vec![7], vec![WR_8])).await.unwrap();
    h.service
        .execute_transfer(&TransferRequest::new(2, WEEK, SEASON, vec![], vec![K_45]))
        .await
        .unwrap();

    let team = h.service.team_transfer_history(TEAM, SEASON, None, None).await.unwrap();
    let ids: Vec<PlayerId> = team.iter().map(|r| r.player_id).collect();
    assert_eq!(ids, vec![WR_8, 7]);

    let all = h.service.transfer_history(SEASON, Some(WEEK), Some(2)).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].team_id, 2);

    let other_week = h.service.transfer_history(SEASON, Some(WEEK + 1), None).await.unwrap();
    assert!(other_week.is_empty());

    // Newer records for another week must not crowd out the requested page
    h.service
        .execute_transfer(&TransferRequest::new(TEAM, WEEK + 1, SEASON, vec![8], vec![WR_9]))
        .await
        .unwrap();
    let page = h.service.team_transfer_history(TEAM, SEASON, Some(WEEK), Some(2)).await.unwrap();
    let ids: Vec<PlayerId> = page.iter().map(|r| r.player_id).collect();
    assert_eq!(ids, vec![WR_8, 7]);
}

#[tokio::test]
async fn test_advance_week_carries_rosters_and_free_transfers() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    h.service.execute_transfer(&swap(vec![7], vec![WR_8])).await.unwrap();
    assert_eq!(h.ledger(TEAM).await.free_transfers_remaining, 0);

    let advance = h.service.advance_week(WEEK + 1, SEASON).await.unwrap();
    assert_eq!(advance.from, Period::Week(WEEK));
    assert_eq!(advance.to, Period::Week(WEEK + 1));
    assert_eq!(advance.roster_entries_copied, 15);

    assert_eq!(h.roster(TEAM, WEEK + 1).await, h.roster(TEAM, WEEK).await);
    assert_eq!(h.ledger(TEAM).await.free_transfers_remaining, 1);

    // The new week's transfers are charged against the new period
    let preview = h
        .service
        .preview_transfer(&TransferRequest::new(TEAM, WEEK + 1, SEASON, vec![8], vec![WR_9]))
        .await
        .unwrap();
    assert_eq!(preview.period, Period::Week(WEEK + 1));
    assert_eq!(preview.point_cost, 0);
}

#[tokio::test]
async fn test_leaving_preseason_copies_nothing() {
    let h = harness(Period::Preseason, 1).await;
    let mut ledger = h.ledger(TEAM).await;
    ledger.free_transfers_remaining = 0;
    h.store.put_ledger(ledger).await;

    let advance = h.service.advance_week(1, SEASON).await.unwrap();

    assert_eq!(advance.from, Period::Preseason);
    assert_eq!(advance.roster_entries_copied, 0);
    assert_eq!(h.ledger(TEAM).await.free_transfers_remaining, 0);

    // Week 1 is now current, so it cannot be opened again
    let err = h.service.advance_week(1, SEASON).await.unwrap_err();
    assert!(matches!(err, TransferError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_advance_week_reads_current_period() {
    let h = harness(Period::Week(WEEK), WEEK).await;

    let err = h.service.advance_week(WEEK - 2, SEASON).await.unwrap_err();
    assert!(matches!(err, TransferError::InvalidRequest { .. }));

    let mut reader = h.store.reader().await.unwrap();
    assert_eq!(reader.current_period().await.unwrap(), Period::Week(WEEK));
    assert!(h.roster(TEAM, WEEK - 2).await.is_empty());
}

#[tokio::test]
async fn test_advance_week_keeps_roster_set_ahead() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let next = WEEK + 1;

    // Transfers made during a week apply to next week's lineup
    let ahead = TransferRequest::new(TEAM, next, SEASON, vec![7], vec![WR_8]);
    h.service.execute_transfer(&ahead).await.unwrap();
    assert_eq!(h.roster(TEAM, next).await.len(), 15);

    let advance = h.service.advance_week(next, SEASON).await.unwrap();
    assert_eq!(advance.roster_entries_copied, 0);

    let roster = h.roster(TEAM, next).await;
    assert_eq!(roster.len(), 15);
    assert!(!roster.contains(&7));
    assert!(roster.contains(&WR_8));

    let ledger = h.ledger(TEAM).await;
    assert_eq!(ledger.current_spent, Money::from_units(92));
    assert!(ledger.is_balanced(Money::from_units(100)));
    assert_eq!(ledger.free_transfers_remaining, 1);

    let value = h.service.roster_value(TEAM, next, SEASON).await.unwrap();
    assert_eq!(value.total_value, ledger.current_spent);
}

#[tokio::test]
async fn test_roster_value() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    let value = h.service.roster_value(TEAM, WEEK, SEASON).await.unwrap();

    assert_eq!(value.player_count, 15);
    assert_eq!(value.total_value, Money::from_units(90));
}

#[tokio::test]
async fn test_stored_season_constraints_override_defaults() {
    let h = harness(Period::Week(WEEK), WEEK).await;
    h.store
        .set_constraints(RosterConstraints { point_cost_per_transfer: 4, ..RosterConstraints::for_season(SEASON) })
        .await;

    let preview = h.service.preview_transfer(&swap(vec![3, 4], vec![RB_5, 210])).await.unwrap();
    assert_eq!(preview.point_cost, 4);
}
