//! Plan legality re-check against the snapshot. Walks the ordered action
//! list once, carrying running money / build-budget / cargo / movement
//! totals, and accumulates every applicable violation instead of stopping at
//! the first. Validation failure is data for the retry loop, never an error.

use serde::Serialize;

use boxcar_common::{TrackSegment, BUILD_BUDGET_PER_TURN};

use crate::graph::ReachabilityGraph;
use crate::options::{BotAction, TurnPlan};
use crate::snapshot::WorldSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<String>,
}

impl ValidationResult {
    /// The only constructor: `valid` is derived, so an invalid result always
    /// names at least one violation.
    pub fn from_violations(violations: Vec<String>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

/// Validate a plan against the snapshot it was generated from.
pub fn validate(plan: &TurnPlan, snapshot: &WorldSnapshot) -> ValidationResult {
    let mut violations = Vec::new();

    // Running state across the plan.
    let mut money_left = snapshot.money;
    let mut budget_left = (BUILD_BUDGET_PER_TURN - snapshot.turn_build_spend).max(0);
    let mut movement_left = snapshot.movement_remaining;
    let mut carried = snapshot.loads.clone();
    let mut position = snapshot.position;
    let mut planned_segments: Vec<TrackSegment> = Vec::new();

    for (index, scored) in plan.actions.iter().enumerate() {
        let n = index + 1;
        let fail = |violations: &mut Vec<String>, msg: String| {
            violations.push(format!("action {n}: {msg}"));
        };

        match &scored.action {
            BotAction::PassTurn => {}

            BotAction::DeliverLoad {
                load,
                city,
                demand_card_id,
                ..
            } => {
                let mut ok = true;
                if !carried.iter().any(|l| l == load) {
                    fail(&mut violations, format!("not carrying {load}"));
                    ok = false;
                }
                if !demand_in_hand(snapshot, *demand_card_id, city, load) {
                    fail(
                        &mut violations,
                        format!("demand card {demand_card_id} for {load} to {city} not in hand"),
                    );
                    ok = false;
                }
                let Some(from) = position else {
                    fail(&mut violations, "train is not on the board".to_string());
                    continue;
                };
                match reach(snapshot, &planned_segments, from, city, movement_left) {
                    Some((path, cost)) if ok => {
                        movement_left -= cost;
                        position = path.last().copied().or(position);
                        carried.retain_first(load);
                    }
                    Some(_) => {}
                    None => fail(
                        &mut violations,
                        format!("{city} not reachable within {movement_left} remaining movement"),
                    ),
                }
            }

            BotAction::PickupAndDeliver {
                load,
                pickup_city,
                deliver_city,
                demand_card_id,
                ..
            } => {
                let mut ok = true;
                // Capacity at the point this action executes within the plan.
                if carried.len() >= snapshot.train_type.capacity() {
                    fail(&mut violations, "train is at capacity".to_string());
                    ok = false;
                }
                let demand_matches = match (deliver_city, demand_card_id) {
                    (Some(city), Some(card_id)) => demand_in_hand(snapshot, *card_id, city, load),
                    _ => snapshot.demands().any(|(_, d)| d.load == *load),
                };
                if !demand_matches {
                    fail(
                        &mut violations,
                        format!("no matching demand for {load} in hand"),
                    );
                    ok = false;
                }
                let Some(from) = position else {
                    fail(&mut violations, "train is not on the board".to_string());
                    continue;
                };
                let Some((pickup_path, pickup_cost)) =
                    reach(snapshot, &planned_segments, from, pickup_city, movement_left)
                else {
                    fail(
                        &mut violations,
                        format!(
                            "{pickup_city} not reachable within {movement_left} remaining movement"
                        ),
                    );
                    continue;
                };
                let arrival = pickup_path.last().copied().unwrap_or(from);
                let after_pickup = movement_left - pickup_cost;

                let mut deliver_cost = 0;
                if let Some(city) = deliver_city {
                    match reach(snapshot, &planned_segments, arrival, city, after_pickup) {
                        Some((_, cost)) => deliver_cost = cost,
                        None => {
                            fail(
                                &mut violations,
                                format!(
                                    "{city} not reachable within {after_pickup} remaining movement"
                                ),
                            );
                            ok = false;
                        }
                    }
                }

                if ok {
                    movement_left = after_pickup - deliver_cost;
                    position = Some(arrival);
                    if deliver_city.is_none() {
                        carried.push(load.clone());
                    }
                }
            }

            BotAction::BuildTrack { segments, cost, .. }
            | BotAction::BuildTowardMajorCity { segments, cost, .. } => {
                let mut ok = true;
                if segments.is_empty() {
                    fail(&mut violations, "build has no segments".to_string());
                    ok = false;
                }
                let board = snapshot.board;
                for segment in segments {
                    if !board.are_adjacent(segment.from, segment.to) {
                        fail(
                            &mut violations,
                            format!(
                                "segment {}-{} does not join adjacent mileposts",
                                segment.from, segment.to
                            ),
                        );
                        ok = false;
                    }
                }
                if let BotAction::BuildTowardMajorCity { city, .. } = &scored.action {
                    if city.is_empty() {
                        fail(&mut violations, "missing target city".to_string());
                        ok = false;
                    }
                }
                if *cost > money_left {
                    fail(
                        &mut violations,
                        format!("cost {cost}M exceeds remaining funds {money_left}M"),
                    );
                    ok = false;
                }
                if *cost > budget_left {
                    fail(
                        &mut violations,
                        format!("cost {cost}M exceeds remaining turn budget {budget_left}M"),
                    );
                    ok = false;
                }
                if ok {
                    money_left -= cost;
                    budget_left -= cost;
                    planned_segments.extend_from_slice(segments);
                }
            }

            BotAction::UpgradeTrain { kind, target, cost } => {
                let mut ok = true;
                match snapshot.train_type.transition_to(*target) {
                    Some(table_kind) if table_kind == *kind => {}
                    _ => {
                        fail(
                            &mut violations,
                            format!(
                                "no valid transition from {} to {}",
                                snapshot.train_type, target
                            ),
                        );
                        ok = false;
                    }
                }
                if *cost > money_left {
                    fail(
                        &mut violations,
                        format!("cost {cost}M exceeds remaining funds {money_left}M"),
                    );
                    ok = false;
                }
                if *cost > budget_left {
                    fail(
                        &mut violations,
                        format!("cost {cost}M exceeds remaining turn budget {budget_left}M"),
                    );
                    ok = false;
                }
                if ok {
                    money_left -= cost;
                    budget_left -= cost;
                }
            }
        }
    }

    ValidationResult::from_violations(violations)
}

fn demand_in_hand(snapshot: &WorldSnapshot, card_id: u32, city: &str, load: &str) -> bool {
    snapshot
        .hand
        .iter()
        .any(|c| c.id == card_id && c.demands.iter().any(|d| d.city == city && d.load == load))
}

/// Reachability over existing track plus segments implied by earlier build
/// actions in the same plan.
fn reach(
    snapshot: &WorldSnapshot,
    planned: &[TrackSegment],
    from: boxcar_common::GridCoord,
    city: &str,
    budget: u32,
) -> Option<(Vec<boxcar_common::GridCoord>, u32)> {
    let graph = ReachabilityGraph::from_segments(
        snapshot.board,
        snapshot
            .all_tracks
            .iter()
            .flat_map(|t| t.segments.iter().copied())
            .chain(planned.iter().copied()),
    );
    graph.reachable_within_budget(from, city, budget)
}

trait RetainFirst {
    fn retain_first(&mut self, value: &str);
}

impl RetainFirst for Vec<String> {
    /// Remove one unit of a load, not every unit of that type.
    fn retain_first(&mut self, value: &str) {
        if let Some(at) = self.iter().position(|v| v == value) {
            self.remove(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ScoredOption, TurnPlan};
    use crate::testing::fixtures;
    use boxcar_common::{GridCoord, TrackSegment};

    fn plan_of(actions: Vec<BotAction>) -> TurnPlan {
        TurnPlan {
            actions: actions
                .into_iter()
                .map(|action| ScoredOption {
                    description: format!("{}", action.kind()),
                    action,
                    score: 0.0,
                    rationale: String::new(),
                })
                .collect(),
        }
    }

    fn build_action(cost: i64) -> BotAction {
        BotAction::BuildTrack {
            segments: vec![TrackSegment::new(
                GridCoord::new(3, 3),
                GridCoord::new(4, 3),
            )],
            cost,
            toward: "Karst".to_string(),
        }
    }

    #[test]
    fn pass_turn_is_always_valid() {
        let snapshot = fixtures::snapshot_builder().build();
        let result = validate(&plan_of(vec![BotAction::PassTurn]), &snapshot);
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn empty_plan_is_valid() {
        let snapshot = fixtures::snapshot_builder().build();
        let result = validate(&TurnPlan::default(), &snapshot);
        assert!(result.valid);
    }

    #[test]
    fn cumulative_build_cost_over_the_cap_is_rejected() {
        let snapshot = fixtures::snapshot_builder().money(100).build();
        // 15 + 15 = 30 over a 20M turn budget: the second build violates.
        let result = validate(
            &plan_of(vec![build_action(15), build_action(15)]),
            &snapshot,
        );
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].contains("exceeds remaining turn budget"));
    }

    #[test]
    fn prior_turn_spend_seeds_the_budget() {
        let snapshot = fixtures::snapshot_builder()
            .money(100)
            .turn_build_spend(10)
            .build();
        let result = validate(&plan_of(vec![build_action(15)]), &snapshot);
        assert!(!result.valid);
        assert!(result.violations[0].contains("exceeds remaining turn budget"));
    }

    #[test]
    fn delivering_a_load_not_carried_is_rejected() {
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(5, 9), (6, 9), (7, 9)])
            .position(5, 9)
            .movement(9)
            .demand(3, "Stonebridge", "Coal", 16)
            .build();
        let plan = plan_of(vec![BotAction::DeliverLoad {
            load: "Coal".to_string(),
            city: "Stonebridge".to_string(),
            demand_card_id: 3,
            payment: 16,
            path: vec![],
            movement_cost: 2,
        }]);
        let result = validate(&plan, &snapshot);
        assert!(!result.valid);
        assert!(result.violations.iter().any(|v| v.contains("not carrying")));
    }

    #[test]
    fn every_violation_is_accumulated_not_just_the_first() {
        // Not carrying the load AND no such demand card AND unreachable city.
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(3, 3), (4, 3)])
            .position(3, 3)
            .movement(2)
            .build();
        let plan = plan_of(vec![BotAction::DeliverLoad {
            load: "Coal".to_string(),
            city: "Marrow".to_string(),
            demand_card_id: 99,
            payment: 10,
            path: vec![],
            movement_cost: 2,
        }]);
        let result = validate(&plan, &snapshot);
        assert!(!result.valid);
        assert!(result.violations.len() >= 3);
    }

    #[test]
    fn build_across_non_adjacent_mileposts_is_rejected() {
        let snapshot = fixtures::snapshot_builder().money(100).build();
        let plan = plan_of(vec![BotAction::BuildTrack {
            segments: vec![TrackSegment::new(
                GridCoord::new(3, 3),
                GridCoord::new(9, 6),
            )],
            cost: 5,
            toward: "Karst".to_string(),
        }]);
        let result = validate(&plan, &snapshot);
        assert!(!result.valid);
        assert!(result
            .violations
            .iter()
            .any(|v| v.contains("adjacent mileposts")));
    }

    #[test]
    fn upgrade_with_identity_transition_is_rejected() {
        let snapshot = fixtures::snapshot_builder().money(100).build();
        let plan = plan_of(vec![BotAction::UpgradeTrain {
            kind: boxcar_common::UpgradeKind::Upgrade,
            target: boxcar_common::TrainType::Freight,
            cost: 20,
        }]);
        let result = validate(&plan, &snapshot);
        assert!(!result.valid);
        assert!(result.violations[0].contains("no valid transition"));
    }

    #[test]
    fn pickup_capacity_is_checked_at_the_point_of_execution() {
        // One slot free now, but the earlier pickup in the same plan fills it.
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(5, 9), (6, 9), (7, 9)])
            .position(7, 9)
            .movement(9)
            .carrying(&["Steel"])
            .demand(1, "Karst", "Coal", 10)
            .demand(2, "Karst", "Oats", 10)
            .city_stock("Stonebridge", &["Coal", "Oats"])
            .build();
        let pickup = |load: &str| BotAction::PickupAndDeliver {
            load: load.to_string(),
            pickup_city: "Stonebridge".to_string(),
            from_dropped: false,
            pickup_path: vec![GridCoord::new(7, 9)],
            pickup_cost: 0,
            deliver_city: None,
            demand_card_id: None,
            payment: None,
            deliver_path: vec![],
        };
        let result = validate(&plan_of(vec![pickup("Coal"), pickup("Oats")]), &snapshot);
        assert!(!result.valid);
        assert!(result
            .violations
            .iter()
            .any(|v| v.starts_with("action 2:") && v.contains("at capacity")));
    }

    #[test]
    fn build_segments_extend_reachability_for_later_actions() {
        // No track to Stonebridge yet; the plan builds it first, then delivers.
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(5, 9), (6, 9)])
            .position(5, 9)
            .movement(9)
            .money(100)
            .carrying(&["Coal"])
            .demand(3, "Stonebridge", "Coal", 16)
            .build();
        let build = BotAction::BuildTrack {
            segments: vec![TrackSegment::new(
                GridCoord::new(6, 9),
                GridCoord::new(7, 9),
            )],
            cost: 3,
            toward: "Stonebridge".to_string(),
        };
        let deliver = BotAction::DeliverLoad {
            load: "Coal".to_string(),
            city: "Stonebridge".to_string(),
            demand_card_id: 3,
            payment: 16,
            path: vec![],
            movement_cost: 2,
        };
        let result = validate(&plan_of(vec![build, deliver]), &snapshot);
        assert!(result.valid, "violations: {:?}", result.violations);
    }
}
