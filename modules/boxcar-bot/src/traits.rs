//! Collaborator contracts the pipeline consumes. Implemented by the game
//! server's storage and socket layers; stubbed in-memory by [`crate::testing`].
//!
//! Atomicity notes live on the operations that need them: the durable store,
//! not this crate, guarantees the transaction boundary.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use boxcar_common::{
    Board, DroppedLoad, GameId, GameState, GridCoord, PlayerId, TrackRecord, TrackSegment,
    TrainType, UpgradeKind, UserId, BOARD,
};

use crate::audit::StrategyAudit;

// ---------------------------------------------------------------------------
// GameStore — game/track reads plus the transactional writes
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Load the game state as visible to a user. None when the game is gone.
    async fn get_game(&self, game_id: GameId, user_id: UserId) -> Result<Option<GameState>>;

    /// All players' track records for a game.
    async fn get_all_tracks(&self, game_id: GameId) -> Result<Vec<TrackRecord>>;

    /// One player's track record. None when the player has never built.
    async fn get_track_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<TrackRecord>>;

    /// Append segments and deduct cost as one durable transaction: read-merge
    /// the existing record, append, deduct — commit or fully roll back.
    async fn commit_build(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        segments: &[TrackSegment],
        cost: i64,
    ) -> Result<()>;

    /// Replace a player's carried loads as one read-modify-write transaction.
    async fn update_carried_loads(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        loads: &[String],
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LoadBank — city stock and dropped loads
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LoadBank: Send + Sync {
    /// Load types a city currently stocks.
    async fn available_loads_for_city(&self, city: &str) -> Result<Vec<String>>;

    /// Every load dropped on the board in this game.
    async fn dropped_loads(&self, game_id: GameId) -> Result<Vec<DroppedLoad>>;

    /// Claim a dropped load at a city for a user's train.
    async fn pickup_dropped_load(
        &self,
        game_id: GameId,
        user_id: UserId,
        city: &str,
        load: &str,
    ) -> Result<()>;

    /// Take a unit from a city's stock onto a user's train.
    async fn pickup_city_load(
        &self,
        game_id: GameId,
        user_id: UserId,
        city: &str,
        load: &str,
    ) -> Result<()>;

    /// Return a consumed unit to a city's pool. Callers treat failure as
    /// informational, never fatal.
    async fn return_load(&self, game_id: GameId, city: &str, load: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// TrainOps — movement, delivery, purchases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub game_id: GameId,
    pub user_id: UserId,
    pub to: GridCoord,
    pub movement_cost: u32,
}

#[async_trait]
pub trait TrainOps: Send + Sync {
    /// Persist one hop of train movement.
    async fn move_train(&self, req: MoveRequest) -> Result<()>;

    /// Deliver a carried load against a demand card at a city.
    async fn deliver_load(
        &self,
        game_id: GameId,
        user_id: UserId,
        city: &str,
        load: &str,
        demand_card_id: u32,
    ) -> Result<()>;

    /// Purchase an upgrade or crossgrade to a target train type.
    async fn purchase_train(
        &self,
        game_id: GameId,
        user_id: UserId,
        kind: UpgradeKind,
        target: TrainType,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// AuditSink / GameEvents — best-effort persistence and socket emission
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn save_turn_audit(
        &self,
        game_id: GameId,
        bot_player_id: PlayerId,
        audit: &StrategyAudit,
    ) -> Result<()>;
}

#[async_trait]
pub trait GameEvents: Send + Sync {
    /// Emit a named event to everyone in a game room.
    async fn emit(&self, game_id: GameId, event: &str, payload: serde_json::Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// BotDeps — the bundle handed to every pipeline stage
// ---------------------------------------------------------------------------

/// Immutable dependencies for one bot. Cheap to clone; the board reference is
/// the process-wide catalog.
#[derive(Clone)]
pub struct BotDeps {
    pub store: Arc<dyn GameStore>,
    pub loads: Arc<dyn LoadBank>,
    pub trains: Arc<dyn TrainOps>,
    pub audits: Arc<dyn AuditSink>,
    pub events: Arc<dyn GameEvents>,
    pub board: &'static Board,
}

impl BotDeps {
    pub fn new(
        store: Arc<dyn GameStore>,
        loads: Arc<dyn LoadBank>,
        trains: Arc<dyn TrainOps>,
        audits: Arc<dyn AuditSink>,
        events: Arc<dyn GameEvents>,
    ) -> Self {
        Self {
            store,
            loads,
            trains,
            audits,
            events,
            board: &BOARD,
        }
    }
}
