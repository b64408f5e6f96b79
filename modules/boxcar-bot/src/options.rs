//! Candidate-action enumeration. Every possible action this turn is emitted
//! either feasible (with the parameters execution needs) or infeasible (with
//! the reason it cannot run). PassTurn is always feasible, so the result is
//! never empty.

use serde::Serialize;
use tracing::debug;

use boxcar_common::{
    GamePhase, GridCoord, TrackSegment, TrainType, UpgradeKind, BUILD_BUDGET_PER_TURN,
    TRAIN_PURCHASE_COST,
};

use crate::graph::ReachabilityGraph;
use crate::snapshot::WorldSnapshot;

// ---------------------------------------------------------------------------
// Action and option types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DeliverLoad,
    PickupAndDeliver,
    BuildTrack,
    BuildTowardMajorCity,
    UpgradeTrain,
    PassTurn,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::DeliverLoad => "deliver_load",
            ActionKind::PickupAndDeliver => "pickup_and_deliver",
            ActionKind::BuildTrack => "build_track",
            ActionKind::BuildTowardMajorCity => "build_toward_major_city",
            ActionKind::UpgradeTrain => "upgrade_train",
            ActionKind::PassTurn => "pass_turn",
        };
        write!(f, "{s}")
    }
}

/// A concrete executable action with everything the executor needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BotAction {
    DeliverLoad {
        load: String,
        city: String,
        demand_card_id: u32,
        payment: i64,
        /// Move path including the current position as its first point.
        path: Vec<GridCoord>,
        movement_cost: u32,
    },
    PickupAndDeliver {
        load: String,
        pickup_city: String,
        /// True when the unit is a dropped load rather than city stock.
        from_dropped: bool,
        pickup_path: Vec<GridCoord>,
        pickup_cost: u32,
        /// Delivery leg, present when it also fits this turn's movement.
        deliver_city: Option<String>,
        demand_card_id: Option<u32>,
        payment: Option<i64>,
        deliver_path: Vec<GridCoord>,
    },
    BuildTrack {
        segments: Vec<TrackSegment>,
        cost: i64,
        toward: String,
    },
    BuildTowardMajorCity {
        segments: Vec<TrackSegment>,
        cost: i64,
        city: String,
    },
    UpgradeTrain {
        kind: UpgradeKind,
        target: TrainType,
        cost: i64,
    },
    PassTurn,
}

impl BotAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            BotAction::DeliverLoad { .. } => ActionKind::DeliverLoad,
            BotAction::PickupAndDeliver { .. } => ActionKind::PickupAndDeliver,
            BotAction::BuildTrack { .. } => ActionKind::BuildTrack,
            BotAction::BuildTowardMajorCity { .. } => ActionKind::BuildTowardMajorCity,
            BotAction::UpgradeTrain { .. } => ActionKind::UpgradeTrain,
            BotAction::PassTurn => ActionKind::PassTurn,
        }
    }
}

/// A candidate the bot could actually take.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibleOption {
    pub action: BotAction,
    pub description: String,
}

/// A candidate that cannot run, kept for the audit trail. The reason is
/// always a non-empty descriptive string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfeasibleOption {
    pub kind: ActionKind,
    pub description: String,
    pub reason: String,
}

/// The feasible/infeasible sum. Every generated candidate is one of these;
/// [`GeneratedOptions`] partitions them for the scorer and the audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "feasibility", rename_all = "camelCase")]
pub enum TurnOption {
    Feasible(FeasibleOption),
    Infeasible(InfeasibleOption),
}

impl TurnOption {
    pub fn feasible(action: BotAction, description: impl Into<String>) -> Self {
        TurnOption::Feasible(FeasibleOption {
            action,
            description: description.into(),
        })
    }

    pub fn infeasible(
        kind: ActionKind,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        debug_assert!(!reason.is_empty(), "infeasible options carry a reason");
        TurnOption::Infeasible(InfeasibleOption {
            kind,
            description: description.into(),
            reason,
        })
    }
}

/// A feasible option with its score and rationale attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredOption {
    pub action: BotAction,
    pub description: String,
    pub score: f64,
    pub rationale: String,
}

/// An ordered list of actions for one turn. Usually one action, occasionally
/// a short chain.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TurnPlan {
    pub actions: Vec<ScoredOption>,
}

impl TurnPlan {
    pub fn single(option: ScoredOption) -> Self {
        Self {
            actions: vec![option],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn describe(&self) -> String {
        self.actions
            .iter()
            .map(|a| a.description.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneratedOptions {
    pub feasible: Vec<FeasibleOption>,
    pub infeasible: Vec<InfeasibleOption>,
}

impl GeneratedOptions {
    fn push(&mut self, option: TurnOption) {
        match option {
            TurnOption::Feasible(feasible) => self.feasible.push(feasible),
            TurnOption::Infeasible(infeasible) => self.infeasible.push(infeasible),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Enumerate every candidate action for this snapshot. Always yields at
/// least one feasible option (PassTurn). During the initial build phase only
/// build options and PassTurn are produced.
pub fn generate(snapshot: &WorldSnapshot) -> GeneratedOptions {
    let mut out = GeneratedOptions::default();

    // Movement runs on the full network (riding opponents' track is the rules
    // engine's rent problem, not a reachability one).
    let movement_graph = ReachabilityGraph::from_segments(
        snapshot.board,
        snapshot
            .all_tracks
            .iter()
            .flat_map(|t| t.segments.iter().copied()),
    );

    if snapshot.phase == GamePhase::Active {
        generate_deliveries(snapshot, &movement_graph, &mut out);
        generate_pickups(snapshot, &movement_graph, &mut out);
        generate_upgrades(snapshot, &mut out);
    }
    generate_builds(snapshot, &mut out);

    out.push(TurnOption::feasible(BotAction::PassTurn, "Pass the turn"));

    debug!(
        feasible = out.feasible.len(),
        infeasible = out.infeasible.len(),
        phase = ?snapshot.phase,
        "Options generated"
    );
    out
}

fn generate_deliveries(
    snapshot: &WorldSnapshot,
    graph: &ReachabilityGraph,
    out: &mut GeneratedOptions,
) {
    for (card_id, demand) in snapshot.demands() {
        if !snapshot.carries(&demand.load) {
            continue;
        }
        let description = format!(
            "Deliver {} to {} for {}M",
            demand.load, demand.city, demand.payment
        );
        let Some(position) = snapshot.position else {
            out.push(TurnOption::infeasible(
                ActionKind::DeliverLoad,
                description,
                "train is not on the board yet",
            ));
            continue;
        };
        match graph.reachable_within_budget(position, &demand.city, snapshot.movement_remaining) {
            Some((path, movement_cost)) => out.push(TurnOption::feasible(
                BotAction::DeliverLoad {
                    load: demand.load.clone(),
                    city: demand.city.clone(),
                    demand_card_id: card_id,
                    payment: demand.payment,
                    path,
                    movement_cost,
                },
                description,
            )),
            None => out.push(TurnOption::infeasible(
                ActionKind::DeliverLoad,
                description,
                format!(
                    "{} not reachable within {} remaining movement",
                    demand.city, snapshot.movement_remaining
                ),
            )),
        }
    }
}

fn generate_pickups(
    snapshot: &WorldSnapshot,
    graph: &ReachabilityGraph,
    out: &mut GeneratedOptions,
) {
    for (card_id, demand) in snapshot.demands() {
        // Already carried or no room on the train: skip entirely.
        if snapshot.carries(&demand.load) || snapshot.at_capacity() {
            continue;
        }

        // Dropped loads first, then city stock; one option per source city.
        let mut source_cities: Vec<(String, bool)> = snapshot
            .dropped_loads
            .iter()
            .filter(|(_, drops)| drops.iter().any(|d| d.load == demand.load))
            .map(|(city, _)| (city.clone(), true))
            .collect();
        for (city, stock) in &snapshot.city_loads {
            if stock.iter().any(|l| l == &demand.load)
                && !source_cities.iter().any(|(c, _)| c == city)
            {
                source_cities.push((city.clone(), false));
            }
        }

        for (pickup_city, from_dropped) in source_cities {
            let description = format!(
                "Pick up {} at {} toward {} ({}M)",
                demand.load, pickup_city, demand.city, demand.payment
            );
            let Some(position) = snapshot.position else {
                out.push(TurnOption::infeasible(
                    ActionKind::PickupAndDeliver,
                    description,
                    "train is not on the board yet",
                ));
                continue;
            };
            let Some((pickup_path, pickup_cost)) = graph.reachable_within_budget(
                position,
                &pickup_city,
                snapshot.movement_remaining,
            ) else {
                out.push(TurnOption::infeasible(
                    ActionKind::PickupAndDeliver,
                    description,
                    format!(
                        "{} not reachable within {} remaining movement",
                        pickup_city, snapshot.movement_remaining
                    ),
                ));
                continue;
            };

            // Delivery leg when it still fits this turn.
            let arrival = *pickup_path.last().unwrap_or(&position);
            let remaining = snapshot.movement_remaining - pickup_cost;
            let deliver_leg = graph.reachable_within_budget(arrival, &demand.city, remaining);
            let (deliver_city, demand_card_id, payment, deliver_path) = match deliver_leg {
                Some((path, _)) => (
                    Some(demand.city.clone()),
                    Some(card_id),
                    Some(demand.payment),
                    path,
                ),
                None => (None, None, None, Vec::new()),
            };

            out.push(TurnOption::feasible(
                BotAction::PickupAndDeliver {
                    load: demand.load.clone(),
                    pickup_city: pickup_city.clone(),
                    from_dropped,
                    pickup_path,
                    pickup_cost,
                    deliver_city,
                    demand_card_id,
                    payment,
                    deliver_path,
                },
                description,
            ));
        }
    }
}

fn generate_upgrades(snapshot: &WorldSnapshot, out: &mut GeneratedOptions) {
    let budget_left = BUILD_BUDGET_PER_TURN - snapshot.turn_build_spend;
    for (target, kind) in snapshot.train_type.transitions() {
        let verb = match kind {
            UpgradeKind::Upgrade => "Upgrade",
            UpgradeKind::Crossgrade => "Crossgrade",
        };
        let description = format!("{verb} to {target} for {TRAIN_PURCHASE_COST}M");
        if TRAIN_PURCHASE_COST <= snapshot.money && TRAIN_PURCHASE_COST <= budget_left {
            out.push(TurnOption::feasible(
                BotAction::UpgradeTrain {
                    kind: *kind,
                    target: *target,
                    cost: TRAIN_PURCHASE_COST,
                },
                description,
            ));
        } else {
            out.push(TurnOption::infeasible(
                ActionKind::UpgradeTrain,
                description,
                "insufficient funds",
            ));
        }
    }
}

fn generate_builds(snapshot: &WorldSnapshot, out: &mut GeneratedOptions) {
    let budget_left =
        (BUILD_BUDGET_PER_TURN - snapshot.turn_build_spend).min(snapshot.money);
    // Budget or funds exhausted: no build options at all, feasible or not.
    if budget_left <= 0 {
        return;
    }
    let board = snapshot.board;

    // Track toward cities named by demands in hand.
    let mut demand_cities: Vec<&str> = snapshot.demands().map(|(_, d)| d.city.as_str()).collect();
    demand_cities.sort_unstable();
    demand_cities.dedup();
    for city in demand_cities {
        if network_touches_city(snapshot, city) {
            continue;
        }
        if let Some((segments, cost)) = propose_extension(snapshot, city, budget_left) {
            let description = format!(
                "Build {} segments toward {} for {}M",
                segments.len(),
                city,
                cost
            );
            out.push(TurnOption::feasible(
                BotAction::BuildTrack {
                    segments,
                    cost,
                    toward: city.to_string(),
                },
                description,
            ));
        }
    }

    // Track toward unconnected major cities. Never proposes a city already in
    // the bot's connected component.
    for group in board.major_cities() {
        if snapshot
            .connected_major_cities
            .iter()
            .any(|c| c == &group.name)
        {
            continue;
        }
        if let Some((segments, cost)) = propose_extension(snapshot, &group.name, budget_left) {
            let description = format!(
                "Extend toward major city {} for {}M",
                group.name, cost
            );
            out.push(TurnOption::feasible(
                BotAction::BuildTowardMajorCity {
                    segments,
                    cost,
                    city: group.name.clone(),
                },
                description,
            ));
        }
    }
}

fn network_touches_city(snapshot: &WorldSnapshot, city: &str) -> bool {
    let board = snapshot.board;
    let posts = board.city_mileposts(city);
    snapshot
        .own_segments
        .iter()
        .flat_map(|s| [s.from, s.to])
        .any(|c| posts.contains(&c))
}

/// Greedy extension from the bot's network (or starting point) toward a city:
/// repeatedly step to the neighbor closest to the target, paying terrain build
/// cost for each new segment, until the budget runs out or the city is
/// reached. None when no new segment fits.
fn propose_extension(
    snapshot: &WorldSnapshot,
    target_city: &str,
    budget: i64,
) -> Option<(Vec<TrackSegment>, i64)> {
    let board = snapshot.board;
    let target = *board.city_mileposts(target_city).first()?;

    let start = nearest_network_point(snapshot, target)?;
    let own_edges: std::collections::BTreeSet<(GridCoord, GridCoord)> = snapshot
        .own_segments
        .iter()
        .map(|s| edge_key(s.from, s.to))
        .collect();

    let mut segments = Vec::new();
    let mut cost = 0i64;
    let mut at = start;
    let target_posts = board.city_mileposts(target_city);

    while !target_posts.contains(&at) {
        let current_distance = at.distance(target);
        let next = board
            .neighbors(at)
            .filter(|n| n.distance(target) < current_distance)
            .min_by_key(|n| (n.distance(target), *n))?;

        if own_edges.contains(&edge_key(at, next)) {
            at = next;
            continue;
        }
        let step_cost = board.build_cost_into(next);
        if cost + step_cost > budget {
            break;
        }
        segments.push(TrackSegment::new(at, next));
        cost += step_cost;
        at = next;
    }

    if segments.is_empty() {
        None
    } else {
        Some((segments, cost))
    }
}

fn edge_key(a: GridCoord, b: GridCoord) -> (GridCoord, GridCoord) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Where an extension starts: the network point nearest the target, the train
/// itself, or (before any track exists) the nearest major-city center.
fn nearest_network_point(snapshot: &WorldSnapshot, target: GridCoord) -> Option<GridCoord> {
    let network_points: Vec<GridCoord> = snapshot
        .own_segments
        .iter()
        .flat_map(|s| [s.from, s.to])
        .collect();
    if !network_points.is_empty() {
        return network_points
            .into_iter()
            .min_by_key(|c| (c.distance(target), *c));
    }
    if let Some(position) = snapshot.position {
        return Some(position);
    }
    snapshot
        .board
        .major_cities()
        .iter()
        .map(|g| g.center)
        .filter(|c| *c != target)
        .min_by_key(|c| (c.distance(target), *c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use boxcar_common::GamePhase;

    #[test]
    fn pass_turn_is_always_feasible() {
        let snapshot = fixtures::snapshot_builder().build();
        let options = generate(&snapshot);
        assert!(options
            .feasible
            .iter()
            .any(|o| o.action == BotAction::PassTurn));
    }

    #[test]
    fn exactly_one_pass_turn_is_emitted() {
        let snapshot = fixtures::snapshot_builder().build();
        let options = generate(&snapshot);
        let passes = options
            .feasible
            .iter()
            .filter(|o| o.action == BotAction::PassTurn)
            .count();
        assert_eq!(passes, 1);
    }

    #[test]
    fn initial_build_phase_only_produces_build_and_pass() {
        let snapshot = fixtures::snapshot_builder()
            .phase(GamePhase::InitialBuild)
            .carrying(&["Coal"])
            .demand(1, "Karst", "Coal", 18)
            .build();
        let options = generate(&snapshot);
        for option in &options.feasible {
            assert!(matches!(
                option.action.kind(),
                ActionKind::BuildTrack | ActionKind::BuildTowardMajorCity | ActionKind::PassTurn
            ));
        }
        assert!(options.infeasible.is_empty());
    }

    #[test]
    fn carried_load_with_unreachable_city_is_infeasible_with_reason() {
        // Train parked on its own two-segment track far from Marrow.
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(3, 3), (4, 3), (5, 3)])
            .position(3, 3)
            .movement(9)
            .carrying(&["Coal"])
            .demand(7, "Marrow", "Coal", 22)
            .build();
        let options = generate(&snapshot);
        let rejected: Vec<_> = options
            .infeasible
            .iter()
            .filter(|o| o.kind == ActionKind::DeliverLoad)
            .collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].reason.contains("not reachable"));
    }

    #[test]
    fn at_capacity_emits_no_pickup_options_at_all() {
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(3, 3), (4, 3)])
            .position(3, 3)
            .movement(9)
            .carrying(&["Coal", "Steel"]) // Freight capacity is 2
            .demand(1, "Karst", "Oats", 12)
            .city_stock("Halvard", &["Oats"])
            .build();
        let options = generate(&snapshot);
        assert!(!options
            .feasible
            .iter()
            .any(|o| o.action.kind() == ActionKind::PickupAndDeliver));
        assert!(!options
            .infeasible
            .iter()
            .any(|o| o.kind == ActionKind::PickupAndDeliver));
    }

    #[test]
    fn upgrade_without_funds_is_infeasible_insufficient_funds() {
        let snapshot = fixtures::snapshot_builder().money(5).build();
        let options = generate(&snapshot);
        let upgrades: Vec<_> = options
            .infeasible
            .iter()
            .filter(|o| o.kind == ActionKind::UpgradeTrain)
            .collect();
        assert_eq!(upgrades.len(), 2); // Freight has two transitions
        assert!(upgrades.iter().all(|o| o.reason == "insufficient funds"));
    }

    #[test]
    fn terminal_train_type_emits_no_upgrade_options() {
        let snapshot = fixtures::snapshot_builder()
            .train(boxcar_common::TrainType::Superfreight)
            .build();
        let options = generate(&snapshot);
        assert!(!options
            .feasible
            .iter()
            .any(|o| o.action.kind() == ActionKind::UpgradeTrain));
        assert!(!options
            .infeasible
            .iter()
            .any(|o| o.kind == ActionKind::UpgradeTrain));
    }

    #[test]
    fn exhausted_build_budget_emits_no_build_options() {
        let snapshot = fixtures::snapshot_builder()
            .turn_build_spend(BUILD_BUDGET_PER_TURN)
            .build();
        let options = generate(&snapshot);
        assert!(!options.feasible.iter().any(|o| matches!(
            o.action.kind(),
            ActionKind::BuildTrack | ActionKind::BuildTowardMajorCity
        )));
    }

    #[test]
    fn build_toward_major_city_skips_connected_cities() {
        // Network already touching Karst.
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(8, 6), (9, 6)])
            .build();
        let options = generate(&snapshot);
        assert!(!options.feasible.iter().any(|o| matches!(
            &o.action,
            BotAction::BuildTowardMajorCity { city, .. } if city == "Karst"
        )));
    }

    #[test]
    fn reachable_delivery_is_feasible_with_path() {
        let snapshot = fixtures::snapshot_builder()
            .with_track(&[(5, 9), (6, 9), (7, 9)])
            .position(5, 9)
            .movement(9)
            .carrying(&["Coal"])
            .demand(3, "Stonebridge", "Coal", 15)
            .build();
        let options = generate(&snapshot);
        let delivery = options
            .feasible
            .iter()
            .find(|o| o.action.kind() == ActionKind::DeliverLoad)
            .expect("delivery should be feasible");
        match &delivery.action {
            BotAction::DeliverLoad {
                path, movement_cost, ..
            } => {
                assert_eq!(path.first(), Some(&GridCoord::new(5, 9)));
                assert_eq!(*movement_cost, 2);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }
}
