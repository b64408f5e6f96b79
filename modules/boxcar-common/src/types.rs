use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::GridCoord;

// --- Identifiers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Trains ---

/// Locomotive tiers. Speed is mileposts-worth of movement per turn,
/// capacity is simultaneous loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainType {
    Freight,
    FastFreight,
    HeavyFreight,
    Superfreight,
}

/// Whether a train purchase moves up a tier or trades sideways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Upgrade,
    Crossgrade,
}

/// Every train purchase costs the same flat fee.
pub const TRAIN_PURCHASE_COST: i64 = 20;

impl TrainType {
    pub fn speed(self) -> u32 {
        match self {
            TrainType::Freight | TrainType::HeavyFreight => 9,
            TrainType::FastFreight | TrainType::Superfreight => 12,
        }
    }

    pub fn capacity(self) -> usize {
        match self {
            TrainType::Freight | TrainType::FastFreight => 2,
            TrainType::HeavyFreight | TrainType::Superfreight => 3,
        }
    }

    /// Valid purchase targets from this tier. Superfreight is terminal.
    pub fn transitions(self) -> &'static [(TrainType, UpgradeKind)] {
        match self {
            TrainType::Freight => &[
                (TrainType::FastFreight, UpgradeKind::Upgrade),
                (TrainType::HeavyFreight, UpgradeKind::Upgrade),
            ],
            TrainType::FastFreight => &[
                (TrainType::Superfreight, UpgradeKind::Upgrade),
                (TrainType::HeavyFreight, UpgradeKind::Crossgrade),
            ],
            TrainType::HeavyFreight => &[
                (TrainType::Superfreight, UpgradeKind::Upgrade),
                (TrainType::FastFreight, UpgradeKind::Crossgrade),
            ],
            TrainType::Superfreight => &[],
        }
    }

    /// Lookup in the transition table. Identity moves are never valid.
    pub fn transition_to(self, target: TrainType) -> Option<UpgradeKind> {
        self.transitions()
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, kind)| *kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrainType::Freight => "Freight",
            TrainType::FastFreight => "Fast Freight",
            TrainType::HeavyFreight => "Heavy Freight",
            TrainType::Superfreight => "Superfreight",
        }
    }
}

impl std::fmt::Display for TrainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Demand cards ---

/// One deliverable line on a demand card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    pub city: String,
    pub load: String,
    pub payment: i64,
}

/// A demand card in a player's hand. Three demands; delivering any one
/// discards the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandCard {
    pub id: u32,
    pub demands: Vec<Demand>,
}

// --- Track ---

/// One built rail edge between two adjacent mileposts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackSegment {
    pub from: GridCoord,
    pub to: GridCoord,
}

impl TrackSegment {
    pub fn new(from: GridCoord, to: GridCoord) -> Self {
        Self { from, to }
    }
}

/// A player's persisted track state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub player_id: PlayerId,
    pub segments: Vec<TrackSegment>,
    /// Build spend so far this turn, in millions.
    pub turn_build_spend: i64,
    /// Lifetime build spend, in millions.
    pub total_spend: i64,
}

// --- Players and game state ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub user_id: UserId,
    pub name: String,
    pub money: i64,
    pub debt: i64,
    pub train_type: TrainType,
    /// None until the train is placed on the board.
    pub position: Option<GridCoord>,
    pub movement_remaining: u32,
    pub loads: Vec<String>,
    pub hand: Vec<DemandCard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Setup,
    InitialBuild,
    Active,
    Complete,
}

/// The phase the bot pipeline distinguishes. InitialBuild only when the
/// game status explicitly says so; everything else is Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    InitialBuild,
    Active,
}

impl GamePhase {
    pub fn from_status(status: GameStatus) -> Self {
        match status {
            GameStatus::InitialBuild => GamePhase::InitialBuild,
            _ => GamePhase::Active,
        }
    }
}

/// An event card currently in effect (derailments, strikes, floods...).
/// The pipeline only reads these as risk inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCard {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub status: GameStatus,
    pub players: Vec<PlayerState>,
    /// Major cities a network must connect to win.
    pub victory_city_count: usize,
    /// Cash-on-hand threshold to win, in millions.
    pub victory_money: i64,
    pub active_events: Vec<EventCard>,
}

impl GameState {
    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

// --- Loads ---

/// A load sitting on the board where some train dropped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedLoad {
    pub city: String,
    pub load: String,
    pub dropped_by: Option<PlayerId>,
    pub dropped_at: DateTime<Utc>,
}

// --- Victory ---

/// Result of a victory-eligibility check over one player's network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryCheck {
    pub eligible: bool,
    /// Major cities connected by the player's best subnetwork.
    pub connected_cities: Vec<String>,
    pub money: i64,
}
