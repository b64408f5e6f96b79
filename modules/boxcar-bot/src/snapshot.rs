//! Point-in-time world capture. One snapshot per turn attempt, exclusively
//! owned by that turn. Returned behind `Arc` with no mutable access path, so
//! no consumer can write to it or to anything nested in it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::try_join;
use tracing::debug;

use boxcar_common::{
    Board, BotError, DemandCard, DroppedLoad, EventCard, GameId, GamePhase, GridCoord, PlayerId,
    TrackRecord, TrackSegment, TrainType, UserId, VictoryCheck,
};

use crate::graph::ReachabilityGraph;
use crate::traits::BotDeps;

/// What a bot knows about one opponent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentSummary {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Option<GridCoord>,
    pub money: i64,
    pub train_type: TrainType,
    pub loads: Vec<String>,
    pub segment_count: usize,
    pub connected_major_cities: usize,
}

/// Everything a bot needs to decide its turn, captured once. Never mutated
/// after construction; every nested container is owned and only ever read.
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub game_id: GameId,
    pub bot_player_id: PlayerId,
    pub bot_user_id: UserId,
    pub phase: GamePhase,
    /// Build spend already committed this turn, in millions.
    pub turn_build_spend: i64,
    pub position: Option<GridCoord>,
    pub money: i64,
    pub debt: i64,
    pub train_type: TrainType,
    pub movement_remaining: u32,
    pub loads: Vec<String>,
    pub hand: Vec<DemandCard>,
    pub own_segments: Vec<TrackSegment>,
    /// Major cities connected by the bot's best subnetwork, sorted.
    pub connected_major_cities: Vec<String>,
    pub opponents: Vec<OpponentSummary>,
    pub all_tracks: Vec<TrackRecord>,
    /// City → load types in stock. Cities with no stock are omitted.
    pub city_loads: BTreeMap<String, Vec<String>>,
    /// City → loads dropped there.
    pub dropped_loads: BTreeMap<String, Vec<DroppedLoad>>,
    pub victory_city_count: usize,
    pub victory_money: i64,
    pub active_events: Vec<EventCard>,
    /// The process-wide board catalog.
    #[serde(skip)]
    pub board: &'static Board,
    #[serde(skip)]
    pub captured_at: DateTime<Utc>,
}

impl WorldSnapshot {
    /// Short content digest for the audit trail: sha256 over the serialized
    /// snapshot, truncated to 12 hex chars.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let hash = Sha256::digest(&bytes);
        hex::encode(hash)[..12].to_string()
    }

    /// Victory eligibility for the bot: enough connected major cities AND
    /// enough cash on hand.
    pub fn victory_check(&self) -> VictoryCheck {
        let eligible = self.connected_major_cities.len() >= self.victory_city_count
            && self.money >= self.victory_money;
        VictoryCheck {
            eligible,
            connected_cities: self.connected_major_cities.clone(),
            money: self.money,
        }
    }

    /// Every demand in hand as (card id, demand).
    pub fn demands(&self) -> impl Iterator<Item = (u32, &boxcar_common::Demand)> {
        self.hand
            .iter()
            .flat_map(|card| card.demands.iter().map(move |d| (card.id, d)))
    }

    pub fn carries(&self, load: &str) -> bool {
        self.loads.iter().any(|l| l == load)
    }

    pub fn at_capacity(&self) -> bool {
        self.loads.len() >= self.train_type.capacity()
    }

    /// One-line bot status for the audit.
    pub fn status_summary(&self) -> String {
        format!(
            "money={}M debt={}M train={} pos={} loads=[{}] cities={}",
            self.money,
            self.debt,
            self.train_type,
            self.position
                .map(|p| p.to_string())
                .unwrap_or_else(|| "off-board".to_string()),
            self.loads.join(", "),
            self.connected_major_cities.len(),
        )
    }
}

/// Capture one immutable snapshot for a bot's turn.
///
/// Fails with a not-found error if the game or the bot's player record is
/// missing. The game state and the track records are independent reads and
/// load concurrently.
pub async fn capture(
    deps: &BotDeps,
    game_id: GameId,
    bot_player_id: PlayerId,
    bot_user_id: UserId,
) -> Result<Arc<WorldSnapshot>, BotError> {
    let (game, all_tracks) = try_join!(
        deps.store.get_game(game_id, bot_user_id),
        deps.store.get_all_tracks(game_id),
    )?;

    let game = game.ok_or(BotError::GameNotFound(game_id))?;
    let player = game
        .player(bot_player_id)
        .ok_or(BotError::PlayerNotFound(bot_player_id))?;

    let own_track = all_tracks.iter().find(|t| t.player_id == bot_player_id);
    let own_segments: Vec<TrackSegment> = own_track
        .map(|t| t.segments.clone())
        .unwrap_or_default();
    let turn_build_spend = own_track.map(|t| t.turn_build_spend).unwrap_or(0);

    let connected_major_cities =
        ReachabilityGraph::from_segments(deps.board, own_segments.iter().copied())
            .connected_major_cities();

    // Off-board trains have no movement or cargo yet.
    let (movement_remaining, loads) = match player.position {
        Some(_) => (player.movement_remaining, player.loads.clone()),
        None => (0, Vec::new()),
    };

    let opponents = game
        .players
        .iter()
        .filter(|p| p.player_id != bot_player_id)
        .map(|p| {
            let segments: Vec<TrackSegment> = all_tracks
                .iter()
                .find(|t| t.player_id == p.player_id)
                .map(|t| t.segments.clone())
                .unwrap_or_default();
            let connected =
                ReachabilityGraph::from_segments(deps.board, segments.iter().copied())
                    .connected_major_cities()
                    .len();
            OpponentSummary {
                player_id: p.player_id,
                name: p.name.clone(),
                position: p.position,
                money: p.money,
                train_type: p.train_type,
                loads: p.loads.clone(),
                segment_count: segments.len(),
                connected_major_cities: connected,
            }
        })
        .collect();

    // One scan over the board's cities for available stock.
    let mut city_loads = BTreeMap::new();
    for city in deps.board.cities() {
        let stock = deps.loads.available_loads_for_city(&city.name).await?;
        if !stock.is_empty() {
            city_loads.insert(city.name.clone(), stock);
        }
    }

    let mut dropped_loads: BTreeMap<String, Vec<DroppedLoad>> = BTreeMap::new();
    for dropped in deps.loads.dropped_loads(game_id).await? {
        dropped_loads
            .entry(dropped.city.clone())
            .or_default()
            .push(dropped);
    }

    let snapshot = WorldSnapshot {
        game_id,
        bot_player_id,
        bot_user_id,
        phase: GamePhase::from_status(game.status),
        turn_build_spend,
        position: player.position,
        money: player.money,
        debt: player.debt,
        train_type: player.train_type,
        movement_remaining,
        loads,
        hand: player.hand.clone(),
        own_segments,
        connected_major_cities,
        opponents,
        all_tracks,
        city_loads,
        dropped_loads,
        victory_city_count: game.victory_city_count,
        victory_money: game.victory_money,
        active_events: game.active_events.clone(),
        board: deps.board,
        captured_at: Utc::now(),
    };

    debug!(
        game = %game_id,
        bot = %bot_player_id,
        digest = %snapshot.digest(),
        "World snapshot captured"
    );

    Ok(Arc::new(snapshot))
}
