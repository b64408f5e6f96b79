//! Test doubles for the collaborator seams, one per trait:
//! - MemoryGameStore (GameStore) — stateful in-memory game + track records
//! - MemoryLoadBank (LoadBank) — city stock and dropped loads
//! - RecordingTrainOps (TrainOps) — records every call, optional failures
//! - MemoryAuditSink (AuditSink) — captured audits
//! - MemoryEventSink (GameEvents) — captured emits
//!
//! Plus `fixtures`: board-consistent snapshot and game builders. No network,
//! no database; `cargo test` in seconds.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use boxcar_common::{
    DroppedLoad, GameId, GameState, GridCoord, PlayerId, TrackRecord, TrackSegment, TrainType,
    UpgradeKind, UserId,
};

use crate::audit::StrategyAudit;
use crate::traits::{AuditSink, GameEvents, GameStore, LoadBank, MoveRequest, TrainOps};

// ---------------------------------------------------------------------------
// MemoryGameStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryGameStore {
    game: Mutex<Option<GameState>>,
    tracks: Mutex<Vec<TrackRecord>>,
    committed_builds: AtomicU32,
    load_updates: Mutex<Vec<Vec<String>>>,
    fail_commits: AtomicBool,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_game(&self, game: GameState) {
        *self.game.lock().unwrap() = Some(game);
    }

    pub fn set_tracks(&self, tracks: Vec<TrackRecord>) {
        *self.tracks.lock().unwrap() = tracks;
    }

    pub fn committed_builds(&self) -> u32 {
        self.committed_builds.load(Ordering::Relaxed)
    }

    pub fn load_updates(&self) -> Vec<Vec<String>> {
        self.load_updates.lock().unwrap().clone()
    }

    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn get_game(&self, _game_id: GameId, _user_id: UserId) -> Result<Option<GameState>> {
        Ok(self.game.lock().unwrap().clone())
    }

    async fn get_all_tracks(&self, _game_id: GameId) -> Result<Vec<TrackRecord>> {
        Ok(self.tracks.lock().unwrap().clone())
    }

    async fn get_track_state(
        &self,
        _game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<TrackRecord>> {
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.player_id == player_id)
            .cloned())
    }

    async fn commit_build(
        &self,
        _game_id: GameId,
        player_id: PlayerId,
        segments: &[TrackSegment],
        cost: i64,
    ) -> Result<()> {
        if self.fail_commits.load(Ordering::Relaxed) {
            bail!("storage transaction aborted");
        }
        let mut tracks = self.tracks.lock().unwrap();
        match tracks.iter_mut().find(|t| t.player_id == player_id) {
            Some(record) => {
                record.segments.extend_from_slice(segments);
                record.turn_build_spend += cost;
                record.total_spend += cost;
            }
            None => tracks.push(TrackRecord {
                player_id,
                segments: segments.to_vec(),
                turn_build_spend: cost,
                total_spend: cost,
            }),
        }
        self.committed_builds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update_carried_loads(
        &self,
        _game_id: GameId,
        _player_id: PlayerId,
        loads: &[String],
    ) -> Result<()> {
        self.load_updates.lock().unwrap().push(loads.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryLoadBank
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryLoadBank {
    city_stock: Mutex<BTreeMap<String, Vec<String>>>,
    dropped: Mutex<Vec<DroppedLoad>>,
    dropped_pickups: AtomicU32,
    city_pickups: AtomicU32,
    returns: AtomicU32,
    fail_returns: AtomicBool,
}

impl MemoryLoadBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock(&self, city: &str, loads: &[&str]) {
        self.city_stock
            .lock()
            .unwrap()
            .insert(city.to_string(), loads.iter().map(|l| l.to_string()).collect());
    }

    pub fn drop_load(&self, dropped: DroppedLoad) {
        self.dropped.lock().unwrap().push(dropped);
    }

    pub fn dropped_pickups(&self) -> u32 {
        self.dropped_pickups.load(Ordering::Relaxed)
    }

    pub fn city_pickups(&self) -> u32 {
        self.city_pickups.load(Ordering::Relaxed)
    }

    pub fn returns(&self) -> u32 {
        self.returns.load(Ordering::Relaxed)
    }

    pub fn fail_returns(&self) {
        self.fail_returns.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl LoadBank for MemoryLoadBank {
    async fn available_loads_for_city(&self, city: &str) -> Result<Vec<String>> {
        Ok(self
            .city_stock
            .lock()
            .unwrap()
            .get(city)
            .cloned()
            .unwrap_or_default())
    }

    async fn dropped_loads(&self, _game_id: GameId) -> Result<Vec<DroppedLoad>> {
        Ok(self.dropped.lock().unwrap().clone())
    }

    async fn pickup_dropped_load(
        &self,
        _game_id: GameId,
        _user_id: UserId,
        city: &str,
        load: &str,
    ) -> Result<()> {
        let mut dropped = self.dropped.lock().unwrap();
        match dropped
            .iter()
            .position(|d| d.city == city && d.load == load)
        {
            Some(at) => {
                dropped.remove(at);
                self.dropped_pickups.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => bail!("no dropped {load} at {city}"),
        }
    }

    async fn pickup_city_load(
        &self,
        _game_id: GameId,
        _user_id: UserId,
        city: &str,
        load: &str,
    ) -> Result<()> {
        let mut stock = self.city_stock.lock().unwrap();
        let loads = stock.get_mut(city);
        match loads.and_then(|l| l.iter().position(|x| x == load).map(|at| l.remove(at))) {
            Some(_) => {
                self.city_pickups.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => bail!("{city} does not stock {load}"),
        }
    }

    async fn return_load(&self, _game_id: GameId, city: &str, load: &str) -> Result<()> {
        if self.fail_returns.load(Ordering::Relaxed) {
            bail!("load pool unavailable");
        }
        self.city_stock
            .lock()
            .unwrap()
            .entry(city.to_string())
            .or_default()
            .push(load.to_string());
        self.returns.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingTrainOps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Move { to: GridCoord, cost: u32 },
    Deliver { city: String, load: String, card: u32 },
    Purchase { kind: UpgradeKind, target: TrainType },
}

#[derive(Default)]
pub struct RecordingTrainOps {
    calls: Mutex<Vec<RecordedCall>>,
    fail_deliveries: AtomicBool,
    fail_next_deliveries: AtomicU32,
    fail_moves: AtomicBool,
    fail_purchases: AtomicBool,
}

impl RecordingTrainOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_deliveries(&self) {
        self.fail_deliveries.store(true, Ordering::Relaxed);
    }

    /// Fail only the next `n` delivery calls, then recover.
    pub fn fail_next_deliveries(&self, n: u32) {
        self.fail_next_deliveries.store(n, Ordering::Relaxed);
    }

    pub fn fail_moves(&self) {
        self.fail_moves.store(true, Ordering::Relaxed);
    }

    pub fn fail_purchases(&self) {
        self.fail_purchases.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl TrainOps for RecordingTrainOps {
    async fn move_train(&self, req: MoveRequest) -> Result<()> {
        if self.fail_moves.load(Ordering::Relaxed) {
            bail!("movement rejected");
        }
        self.calls.lock().unwrap().push(RecordedCall::Move {
            to: req.to,
            cost: req.movement_cost,
        });
        Ok(())
    }

    async fn deliver_load(
        &self,
        _game_id: GameId,
        _user_id: UserId,
        city: &str,
        load: &str,
        demand_card_id: u32,
    ) -> Result<()> {
        if self.fail_deliveries.load(Ordering::Relaxed) {
            bail!("delivery rejected");
        }
        if self
            .fail_next_deliveries
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            bail!("delivery rejected");
        }
        self.calls.lock().unwrap().push(RecordedCall::Deliver {
            city: city.to_string(),
            load: load.to_string(),
            card: demand_card_id,
        });
        Ok(())
    }

    async fn purchase_train(
        &self,
        _game_id: GameId,
        _user_id: UserId,
        kind: UpgradeKind,
        target: TrainType,
    ) -> Result<()> {
        if self.fail_purchases.load(Ordering::Relaxed) {
            bail!("purchase rejected");
        }
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::Purchase { kind, target });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryAuditSink / MemoryEventSink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAuditSink {
    audits: Mutex<Vec<StrategyAudit>>,
    fail_saves: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audits(&self) -> Vec<StrategyAudit> {
        self.audits.lock().unwrap().clone()
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn save_turn_audit(
        &self,
        _game_id: GameId,
        _bot_player_id: PlayerId,
        audit: &StrategyAudit,
    ) -> Result<()> {
        if self.fail_saves.load(Ordering::Relaxed) {
            bail!("audit store unavailable");
        }
        self.audits.lock().unwrap().push(audit.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl GameEvents for MemoryEventSink {
    async fn emit(&self, _game_id: GameId, event: &str, payload: serde_json::Value) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub mod fixtures {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use boxcar_common::{
        Demand, DemandCard, DroppedLoad, GameId, GamePhase, GameState, GameStatus, GridCoord,
        PlayerId, PlayerState, TrackRecord, TrackSegment, TrainType, UserId,
    };

    use super::{
        MemoryAuditSink, MemoryEventSink, MemoryGameStore, MemoryLoadBank, RecordingTrainOps,
    };
    use crate::graph::ReachabilityGraph;
    use crate::snapshot::WorldSnapshot;
    use crate::traits::BotDeps;

    pub fn game_id() -> GameId {
        GameId(Uuid::from_u128(0xB0C0_0001))
    }

    pub fn bot_player_id() -> PlayerId {
        PlayerId(Uuid::from_u128(0xB0C0_0002))
    }

    pub fn bot_user_id() -> UserId {
        UserId(Uuid::from_u128(0xB0C0_0003))
    }

    /// All five doubles wired into one `BotDeps`.
    pub struct TestHarness {
        pub deps: BotDeps,
        pub store: Arc<MemoryGameStore>,
        pub loads: Arc<MemoryLoadBank>,
        pub trains: Arc<RecordingTrainOps>,
        pub audits: Arc<MemoryAuditSink>,
        pub events: Arc<MemoryEventSink>,
    }

    pub fn harness() -> TestHarness {
        let store = Arc::new(MemoryGameStore::new());
        let loads = Arc::new(MemoryLoadBank::new());
        let trains = Arc::new(RecordingTrainOps::new());
        let audits = Arc::new(MemoryAuditSink::new());
        let events = Arc::new(MemoryEventSink::new());
        let deps = BotDeps::new(
            store.clone(),
            loads.clone(),
            trains.clone(),
            audits.clone(),
            events.clone(),
        );
        TestHarness {
            deps,
            store,
            loads,
            trains,
            audits,
            events,
        }
    }

    /// Builder for a snapshot without going through capture. Track chains use
    /// consecutive board coordinates.
    pub struct SnapshotBuilder {
        phase: GamePhase,
        money: i64,
        turn_build_spend: i64,
        train_type: TrainType,
        position: Option<GridCoord>,
        movement_remaining: u32,
        loads: Vec<String>,
        hand: Vec<DemandCard>,
        own_segments: Vec<TrackSegment>,
        city_loads: std::collections::BTreeMap<String, Vec<String>>,
        dropped_loads: std::collections::BTreeMap<String, Vec<DroppedLoad>>,
        victory_city_count: usize,
        victory_money: i64,
    }

    pub fn snapshot_builder() -> SnapshotBuilder {
        SnapshotBuilder {
            phase: GamePhase::Active,
            money: 60,
            turn_build_spend: 0,
            train_type: TrainType::Freight,
            position: None,
            movement_remaining: 0,
            loads: Vec::new(),
            hand: Vec::new(),
            own_segments: Vec::new(),
            city_loads: Default::default(),
            dropped_loads: Default::default(),
            victory_city_count: 7,
            victory_money: 250,
        }
    }

    impl SnapshotBuilder {
        pub fn phase(mut self, phase: GamePhase) -> Self {
            self.phase = phase;
            self
        }

        pub fn money(mut self, money: i64) -> Self {
            self.money = money;
            self
        }

        pub fn turn_build_spend(mut self, spend: i64) -> Self {
            self.turn_build_spend = spend;
            self
        }

        pub fn train(mut self, train_type: TrainType) -> Self {
            self.train_type = train_type;
            self
        }

        pub fn position(mut self, col: i32, row: i32) -> Self {
            self.position = Some(GridCoord::new(col, row));
            self
        }

        pub fn movement(mut self, movement: u32) -> Self {
            self.movement_remaining = movement;
            self
        }

        pub fn carrying(mut self, loads: &[&str]) -> Self {
            self.loads = loads.iter().map(|l| l.to_string()).collect();
            self
        }

        /// One demand card with a single demand line.
        pub fn demand(mut self, card_id: u32, city: &str, load: &str, payment: i64) -> Self {
            self.hand.push(DemandCard {
                id: card_id,
                demands: vec![Demand {
                    city: city.to_string(),
                    load: load.to_string(),
                    payment,
                }],
            });
            self
        }

        /// Own track as a chain along consecutive coordinates.
        pub fn with_track(mut self, points: &[(i32, i32)]) -> Self {
            self.own_segments.extend(points.windows(2).map(|w| {
                TrackSegment::new(
                    GridCoord::new(w[0].0, w[0].1),
                    GridCoord::new(w[1].0, w[1].1),
                )
            }));
            self
        }

        pub fn city_stock(mut self, city: &str, loads: &[&str]) -> Self {
            self.city_loads
                .insert(city.to_string(), loads.iter().map(|l| l.to_string()).collect());
            self
        }

        pub fn dropped(mut self, city: &str, load: &str) -> Self {
            self.dropped_loads
                .entry(city.to_string())
                .or_default()
                .push(DroppedLoad {
                    city: city.to_string(),
                    load: load.to_string(),
                    dropped_by: None,
                    dropped_at: Utc::now(),
                });
            self
        }

        pub fn victory(mut self, cities: usize, money: i64) -> Self {
            self.victory_city_count = cities;
            self.victory_money = money;
            self
        }

        pub fn build(self) -> WorldSnapshot {
            let connected_major_cities = ReachabilityGraph::from_segments(
                &boxcar_common::BOARD,
                self.own_segments.iter().copied(),
            )
            .connected_major_cities();
            let all_tracks = if self.own_segments.is_empty() {
                Vec::new()
            } else {
                vec![TrackRecord {
                    player_id: bot_player_id(),
                    segments: self.own_segments.clone(),
                    turn_build_spend: self.turn_build_spend,
                    total_spend: self.turn_build_spend,
                }]
            };
            WorldSnapshot {
                game_id: game_id(),
                bot_player_id: bot_player_id(),
                bot_user_id: bot_user_id(),
                phase: self.phase,
                turn_build_spend: self.turn_build_spend,
                position: self.position,
                money: self.money,
                debt: 0,
                train_type: self.train_type,
                movement_remaining: self.movement_remaining,
                loads: self.loads,
                hand: self.hand,
                own_segments: self.own_segments,
                connected_major_cities,
                opponents: Vec::new(),
                all_tracks,
                city_loads: self.city_loads,
                dropped_loads: self.dropped_loads,
                victory_city_count: self.victory_city_count,
                victory_money: self.victory_money,
                active_events: Vec::new(),
                board: &boxcar_common::BOARD,
                captured_at: Utc::now(),
            }
        }
    }

    /// Builder for a full `GameState` to seed the store with.
    pub struct GameBuilder {
        status: GameStatus,
        bot: PlayerState,
        opponents: Vec<PlayerState>,
        victory_city_count: usize,
        victory_money: i64,
    }

    pub fn game_builder() -> GameBuilder {
        GameBuilder {
            status: GameStatus::Active,
            bot: PlayerState {
                player_id: bot_player_id(),
                user_id: bot_user_id(),
                name: "bot".to_string(),
                money: 60,
                debt: 0,
                train_type: TrainType::Freight,
                position: None,
                movement_remaining: 0,
                loads: Vec::new(),
                hand: Vec::new(),
            },
            opponents: Vec::new(),
            victory_city_count: 7,
            victory_money: 250,
        }
    }

    impl GameBuilder {
        pub fn status(mut self, status: GameStatus) -> Self {
            self.status = status;
            self
        }

        pub fn bot_money(mut self, money: i64) -> Self {
            self.bot.money = money;
            self
        }

        pub fn bot_position(mut self, col: i32, row: i32) -> Self {
            self.bot.position = Some(GridCoord::new(col, row));
            self
        }

        pub fn bot_movement(mut self, movement: u32) -> Self {
            self.bot.movement_remaining = movement;
            self
        }

        pub fn bot_carrying(mut self, loads: &[&str]) -> Self {
            self.bot.loads = loads.iter().map(|l| l.to_string()).collect();
            self
        }

        pub fn bot_demand(mut self, card_id: u32, city: &str, load: &str, payment: i64) -> Self {
            self.bot.hand.push(DemandCard {
                id: card_id,
                demands: vec![Demand {
                    city: city.to_string(),
                    load: load.to_string(),
                    payment,
                }],
            });
            self
        }

        pub fn victory(mut self, cities: usize, money: i64) -> Self {
            self.victory_city_count = cities;
            self.victory_money = money;
            self
        }

        pub fn opponent(mut self, name: &str, seed: u128) -> Self {
            self.opponents.push(PlayerState {
                player_id: PlayerId(Uuid::from_u128(seed)),
                user_id: UserId(Uuid::from_u128(seed + 1)),
                name: name.to_string(),
                money: 50,
                debt: 0,
                train_type: TrainType::Freight,
                position: None,
                movement_remaining: 0,
                loads: Vec::new(),
                hand: Vec::new(),
            });
            self
        }

        pub fn build(self) -> GameState {
            let mut players = vec![self.bot];
            players.extend(self.opponents);
            GameState {
                id: game_id(),
                status: self.status,
                players,
                victory_city_count: self.victory_city_count,
                victory_money: self.victory_money,
                active_events: Vec::new(),
            }
        }
    }

    /// A track record for an arbitrary player, as a coordinate chain.
    pub fn track_record(player_id: PlayerId, points: &[(i32, i32)]) -> TrackRecord {
        TrackRecord {
            player_id,
            segments: points
                .windows(2)
                .map(|w| {
                    TrackSegment::new(
                        GridCoord::new(w[0].0, w[0].1),
                        GridCoord::new(w[1].0, w[1].1),
                    )
                })
                .collect(),
            turn_build_spend: 0,
            total_spend: 0,
        }
    }
}
