//! Plan execution against live game state. Actions apply strictly in order;
//! the first failure stops the run and is reported with the count of actions
//! that fully completed before it. Completed actions are never rolled back —
//! atomicity lives inside each collaborator call's storage transaction, not
//! across the plan.

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use boxcar_common::GridCoord;

use crate::graph::ReachabilityGraph;
use crate::options::{BotAction, TurnPlan};
use crate::snapshot::WorldSnapshot;
use crate::traits::{BotDeps, MoveRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub actions_completed: u32,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            actions_completed: 0,
            error: Some(message.into()),
            duration_ms: 0,
        }
    }
}

/// Apply a validated plan. An empty plan (or bare PassTurn) succeeds
/// immediately with zero side effects.
pub async fn execute(
    deps: &BotDeps,
    plan: &TurnPlan,
    snapshot: &WorldSnapshot,
) -> ExecutionResult {
    let started = Instant::now();
    let mut completed = 0u32;

    for scored in &plan.actions {
        match apply(deps, snapshot, &scored.action).await {
            Ok(()) => completed += 1,
            Err(e) => {
                warn!(
                    game = %snapshot.game_id,
                    bot = %snapshot.bot_player_id,
                    action = %scored.action.kind(),
                    error = %e,
                    "Plan execution stopped"
                );
                return ExecutionResult {
                    success: false,
                    actions_completed: completed,
                    error: Some(format!("{e:#}")),
                    duration_ms: started.elapsed().as_millis() as u64,
                };
            }
        }
    }

    info!(
        game = %snapshot.game_id,
        bot = %snapshot.bot_player_id,
        actions = completed,
        "Plan executed"
    );
    ExecutionResult {
        success: true,
        actions_completed: completed,
        error: None,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

async fn apply(deps: &BotDeps, snapshot: &WorldSnapshot, action: &BotAction) -> Result<()> {
    match action {
        BotAction::PassTurn => Ok(()),

        BotAction::DeliverLoad {
            load,
            city,
            demand_card_id,
            path,
            ..
        } => {
            replay_moves(deps, snapshot, path).await?;
            deps.trains
                .deliver_load(
                    snapshot.game_id,
                    snapshot.bot_user_id,
                    city,
                    load,
                    *demand_card_id,
                )
                .await
                .with_context(|| format!("delivering {load} to {city}"))?;
            return_unit(deps, snapshot, city, load).await;
            Ok(())
        }

        BotAction::PickupAndDeliver {
            load,
            pickup_city,
            from_dropped,
            pickup_path,
            deliver_city,
            demand_card_id,
            deliver_path,
            ..
        } => {
            replay_moves(deps, snapshot, pickup_path).await?;

            // Carried-load update is one read-modify-write transaction on the
            // store; it rolls back there on failure.
            let mut loads = snapshot.loads.clone();
            loads.push(load.clone());
            deps.store
                .update_carried_loads(snapshot.game_id, snapshot.bot_player_id, &loads)
                .await
                .with_context(|| format!("updating carried loads with {load}"))?;

            if *from_dropped {
                deps.loads
                    .pickup_dropped_load(snapshot.game_id, snapshot.bot_user_id, pickup_city, load)
                    .await
                    .with_context(|| format!("picking up dropped {load} at {pickup_city}"))?;
            } else {
                deps.loads
                    .pickup_city_load(snapshot.game_id, snapshot.bot_user_id, pickup_city, load)
                    .await
                    .with_context(|| format!("picking up {load} at {pickup_city}"))?;
            }

            if let (Some(city), Some(card_id)) = (deliver_city, demand_card_id) {
                replay_moves(deps, snapshot, deliver_path).await?;
                deps.trains
                    .deliver_load(snapshot.game_id, snapshot.bot_user_id, city, load, *card_id)
                    .await
                    .with_context(|| format!("delivering {load} to {city}"))?;
                return_unit(deps, snapshot, city, load).await;
            }
            Ok(())
        }

        BotAction::BuildTrack { segments, cost, .. }
        | BotAction::BuildTowardMajorCity { segments, cost, .. } => deps
            .store
            .commit_build(snapshot.game_id, snapshot.bot_player_id, segments, *cost)
            .await
            .with_context(|| format!("committing {} segments for {cost}M", segments.len())),

        BotAction::UpgradeTrain { kind, target, .. } => deps
            .trains
            .purchase_train(snapshot.game_id, snapshot.bot_user_id, *kind, *target)
            .await
            .with_context(|| format!("purchasing {target}")),
    }
}

/// Persist one move per hop after the path's first point.
async fn replay_moves(deps: &BotDeps, snapshot: &WorldSnapshot, path: &[GridCoord]) -> Result<()> {
    if path.len() < 2 {
        return Ok(());
    }
    let graph = ReachabilityGraph::from_segments(
        deps.board,
        snapshot
            .all_tracks
            .iter()
            .flat_map(|t| t.segments.iter().copied()),
    );
    for hop in path.windows(2) {
        let (from, to) = (hop[0], hop[1]);
        deps.trains
            .move_train(MoveRequest {
                game_id: snapshot.game_id,
                user_id: snapshot.bot_user_id,
                to,
                movement_cost: graph.edge_cost(from, to),
            })
            .await
            .with_context(|| format!("moving to {to}"))?;
    }
    Ok(())
}

/// Best-effort: hand the consumed unit back to the city pool. Failure is
/// informational only.
async fn return_unit(deps: &BotDeps, snapshot: &WorldSnapshot, city: &str, load: &str) {
    if let Err(e) = deps
        .loads
        .return_load(snapshot.game_id, city, load)
        .await
    {
        warn!(
            game = %snapshot.game_id,
            city,
            load,
            error = %e,
            "Failed to return delivered load to the city pool"
        );
    }
}
