//! Tests for the opponent decision service: validation order, fallback
//! policy, and the observability log.

mod common;

use common::{FailingBackend, ScriptedBackend, Step};
use poison_game::{
    enumerate_unclaimed, ClaimedSet, Coord, DecisionService, RoundEntry, RoundHistory, Side,
    ThinkingMode,
};
use std::sync::Arc;

fn service(steps: Vec<Step>) -> DecisionService {
    DecisionService::with_seed(
        Arc::new(ScriptedBackend::new(steps)),
        ThinkingMode::Disabled,
        42,
    )
}

fn history_of(rounds: u32) -> RoundHistory {
    let mut history = RoundHistory::new();
    for round in 1..=rounds {
        history.record(RoundEntry {
            round,
            player_poison: Coord::new(1, 1),
            opponent_poison: Coord::new(2, 2),
            timestamp: chrono::Utc::now(),
        });
    }
    history
}

#[tokio::test]
async fn test_placement_accepts_valid_reply() {
    let mut service = service(vec![Step::coord(3, 4)]);
    let coord = service
        .propose_poison_placement(5, &RoundHistory::new(), 0)
        .await;
    assert_eq!(coord, Coord::new(3, 4));

    let records = service.log().records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].fallback);
    assert!(records[0].raw.is_some());
    assert!(records[0].error.is_none());
}

#[tokio::test]
async fn test_placement_transport_failure_falls_back_in_bounds() {
    // Scenario: N=5, collaborator transport fails; the opponent poison must
    // still be a valid in-bounds coordinate.
    let mut service = DecisionService::with_seed(Arc::new(FailingBackend), ThinkingMode::Auto, 9);
    let coord = service
        .propose_poison_placement(5, &RoundHistory::new(), 0)
        .await;
    assert!(coord.in_bounds(5));

    let records = service.log().records();
    assert_eq!(records.len(), 1);
    assert!(records[0].fallback);
    assert!(records[0].raw.is_none());
    assert!(records[0].error.as_deref().unwrap().contains("transport"));
    assert_eq!(records[0].resolved, coord);
}

#[tokio::test]
async fn test_placement_rejects_out_of_range_reply() {
    let mut service = service(vec![Step::coord(6, 2)]);
    let coord = service
        .propose_poison_placement(5, &RoundHistory::new(), 0)
        .await;
    assert!(coord.in_bounds(5));
    assert!(service.log().records()[0].fallback);
    // The raw reply is preserved even though validation rejected it.
    assert!(service.log().records()[0].raw.is_some());
}

#[tokio::test]
async fn test_placement_rejects_malformed_reply() {
    let mut service = service(vec![Step::Reply("not json at all".to_string())]);
    let coord = service
        .propose_poison_placement(4, &RoundHistory::new(), 0)
        .await;
    assert!(coord.in_bounds(4));
    assert!(service.log().records()[0].fallback);
}

#[tokio::test]
async fn test_placement_prompt_states_missing_history() {
    let mut service = service(vec![Step::coord(1, 1)]);
    service
        .propose_poison_placement(5, &RoundHistory::new(), 0)
        .await;
    assert!(service.log().records()[0].prompt.contains("No history yet"));
}

#[tokio::test]
async fn test_placement_prompt_includes_three_newest_rounds() {
    let history = history_of(6);
    assert_eq!(history.len(), 5);
    assert_eq!(history.entries()[0].round, 6);

    let mut service = service(vec![Step::coord(1, 1)]);
    service.propose_poison_placement(5, &history, 0).await;

    let prompt = &service.log().records()[0].prompt;
    assert!(prompt.contains("Round 6:"));
    assert!(prompt.contains("Round 5:"));
    assert!(prompt.contains("Round 4:"));
    assert!(!prompt.contains("Round 3:"));
}

#[tokio::test]
async fn test_move_rejects_already_claimed_cell() {
    // Scenario: claimed = [(1,1)], collaborator proposes (1,1); the
    // fallback must pick a different, unclaimed cell.
    let mut claimed = ClaimedSet::new(5);
    claimed.push(Coord::new(1, 1));
    let own_poison = Coord::new(5, 5);

    let mut service = service(vec![Step::coord(1, 1)]);
    let coord = service
        .propose_turn_move(own_poison, &claimed, 5, Side::Player, 0)
        .await;

    assert_ne!(coord, Coord::new(1, 1));
    let free = enumerate_unclaimed(5, &claimed, &[own_poison]);
    assert!(free.contains(&coord));
    assert!(service.log().records()[0].fallback);
}

#[tokio::test]
async fn test_move_rejects_missing_rationale() {
    let claimed = ClaimedSet::new(5);
    let mut service = service(vec![Step::Reply("{\"x\": 2, \"y\": 2}".to_string())]);
    let coord = service
        .propose_turn_move(Coord::new(5, 5), &claimed, 5, Side::Player, 0)
        .await;
    assert!(coord.in_bounds(5));
    assert!(service.log().records()[0].fallback);
}

#[tokio::test]
async fn test_move_rejects_own_poison() {
    let claimed = ClaimedSet::new(5);
    let own_poison = Coord::new(2, 3);
    let mut service = service(vec![Step::coord(2, 3)]);
    let coord = service
        .propose_turn_move(own_poison, &claimed, 5, Side::Opponent, 0)
        .await;
    assert_ne!(coord, own_poison);
    assert!(service.log().records()[0].fallback);
}

#[tokio::test]
async fn test_move_fallback_member_of_unclaimed_set() {
    let mut claimed = ClaimedSet::new(3);
    claimed.push(Coord::new(1, 1));
    claimed.push(Coord::new(2, 1));
    let own_poison = Coord::new(3, 3);

    let mut service = DecisionService::with_seed(Arc::new(FailingBackend), ThinkingMode::Disabled, 5);
    for _ in 0..20 {
        let coord = service
            .propose_turn_move(own_poison, &claimed, 3, Side::Player, 0)
            .await;
        let free = enumerate_unclaimed(3, &claimed, &[own_poison]);
        assert!(free.contains(&coord));
    }
}

#[tokio::test]
async fn test_move_sentinel_when_no_cell_remains() {
    // Terminal edge case: every cell claimed, nothing legal remains. The
    // service must return the sentinel instead of panicking.
    let mut claimed = ClaimedSet::new(3);
    for y in 1..=3 {
        for x in 1..=3 {
            claimed.push(Coord::new(x, y));
        }
    }

    let mut service = DecisionService::with_seed(Arc::new(FailingBackend), ThinkingMode::Disabled, 1);
    let coord = service
        .propose_turn_move(Coord::new(2, 2), &claimed, 3, Side::Player, 0)
        .await;
    assert_eq!(coord, Coord::new(1, 1));
}

#[tokio::test]
async fn test_move_prompt_attributes_claims_by_parity() {
    let mut claimed = ClaimedSet::new(5);
    claimed.push(Coord::new(1, 1));
    claimed.push(Coord::new(2, 2));

    let mut service = service(vec![Step::coord(4, 4)]);
    service
        .propose_turn_move(Coord::new(5, 5), &claimed, 5, Side::Opponent, 0)
        .await;

    let prompt = &service.log().records()[0].prompt;
    assert!(prompt.contains("opponent claimed (1, 1)"));
    assert!(prompt.contains("player claimed (2, 2)"));
}

#[tokio::test]
async fn test_log_appends_one_record_per_call_with_epoch() {
    let mut service = service(vec![Step::coord(1, 2), Step::Fail("boom".to_string())]);
    service
        .propose_poison_placement(5, &RoundHistory::new(), 3)
        .await;
    service
        .propose_turn_move(Coord::new(5, 5), &ClaimedSet::new(5), 5, Side::Player, 3)
        .await;

    let records = service.log().records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].request_id, 0);
    assert_eq!(records[1].request_id, 1);
    assert!(records.iter().all(|r| r.epoch == 3));
}
