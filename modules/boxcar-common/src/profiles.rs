//! Skill and archetype profiles: static scoring configuration resolved once at
//! process start. A skill profile sets base weights over the fixed dimension
//! catalog plus injected randomness and lookahead; an archetype multiplies the
//! weights into a strategic personality.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// The fixed scoring-dimension catalog. Order is the weight-array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDimension {
    IncomeNow,
    IncomePerDistance,
    MultiDeliveryPotential,
    NetworkExpansion,
    VictoryProgress,
    CompetitorBlocking,
    RiskExposure,
    LoadScarcity,
    UpgradeRoi,
    BackboneAlignment,
    LoadSynergy,
    MajorCityProximity,
}

pub const DIMENSION_COUNT: usize = 12;

pub const ALL_DIMENSIONS: [ScoreDimension; DIMENSION_COUNT] = [
    ScoreDimension::IncomeNow,
    ScoreDimension::IncomePerDistance,
    ScoreDimension::MultiDeliveryPotential,
    ScoreDimension::NetworkExpansion,
    ScoreDimension::VictoryProgress,
    ScoreDimension::CompetitorBlocking,
    ScoreDimension::RiskExposure,
    ScoreDimension::LoadScarcity,
    ScoreDimension::UpgradeRoi,
    ScoreDimension::BackboneAlignment,
    ScoreDimension::LoadSynergy,
    ScoreDimension::MajorCityProximity,
];

impl ScoreDimension {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreDimension::IncomeNow => "income_now",
            ScoreDimension::IncomePerDistance => "income_per_distance",
            ScoreDimension::MultiDeliveryPotential => "multi_delivery_potential",
            ScoreDimension::NetworkExpansion => "network_expansion",
            ScoreDimension::VictoryProgress => "victory_progress",
            ScoreDimension::CompetitorBlocking => "competitor_blocking",
            ScoreDimension::RiskExposure => "risk_exposure",
            ScoreDimension::LoadScarcity => "load_scarcity",
            ScoreDimension::UpgradeRoi => "upgrade_roi",
            ScoreDimension::BackboneAlignment => "backbone_alignment",
            ScoreDimension::LoadSynergy => "load_synergy",
            ScoreDimension::MajorCityProximity => "major_city_proximity",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Weights (or multipliers) over the dimension catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights(pub [f64; DIMENSION_COUNT]);

impl DimensionWeights {
    pub const fn uniform(value: f64) -> Self {
        Self([value; DIMENSION_COUNT])
    }

    pub fn get(&self, dim: ScoreDimension) -> f64 {
        self.0[dim.index()]
    }

    pub fn set(mut self, dim: ScoreDimension, value: f64) -> Self {
        self.0[dim.index()] = value;
        self
    }
}

/// Lookahead shape for a skill tier. Depth/breadth bound how far the scorer
/// projects follow-on deliveries; discount decays their contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lookahead {
    pub depth: u8,
    pub breadth: u8,
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProfile {
    pub name: String,
    pub base_weights: DimensionWeights,
    /// Probability in [0,1] that the turn picks a uniformly random feasible
    /// option instead of the top-ranked one.
    pub random_choice_percent: f64,
    /// Probability band after `random_choice_percent` that the turn picks the
    /// second-ranked option.
    pub suboptimality_percent: f64,
    pub lookahead: Lookahead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub name: String,
    pub tagline: String,
    pub multipliers: DimensionWeights,
}

// --- Catalog keys ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Novice,
    Casual,
    Seasoned,
    Master,
}

impl SkillLevel {
    pub fn profile(self) -> &'static SkillProfile {
        &SKILL_CATALOG[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Novice => "novice",
            SkillLevel::Casual => "casual",
            SkillLevel::Seasoned => "seasoned",
            SkillLevel::Master => "master",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Magnate,
    Surveyor,
    Saboteur,
    Gambler,
    Clockwork,
}

impl Archetype {
    pub fn profile(self) -> &'static ArchetypeProfile {
        &ARCHETYPE_CATALOG[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::Magnate => "magnate",
            Archetype::Surveyor => "surveyor",
            Archetype::Saboteur => "saboteur",
            Archetype::Gambler => "gambler",
            Archetype::Clockwork => "clockwork",
        }
    }
}

// --- Catalogs ---

static SKILL_CATALOG: LazyLock<[SkillProfile; 4]> = LazyLock::new(|| {
    [
        SkillProfile {
            name: "novice".into(),
            base_weights: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::IncomeNow, 2.0)
                .set(ScoreDimension::CompetitorBlocking, 0.2)
                .set(ScoreDimension::RiskExposure, 0.3)
                .set(ScoreDimension::LoadSynergy, 0.4),
            random_choice_percent: 0.25,
            suboptimality_percent: 0.30,
            lookahead: Lookahead { depth: 1, breadth: 2, discount: 0.5 },
        },
        SkillProfile {
            name: "casual".into(),
            base_weights: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::IncomeNow, 1.6)
                .set(ScoreDimension::IncomePerDistance, 1.2)
                .set(ScoreDimension::CompetitorBlocking, 0.5),
            random_choice_percent: 0.10,
            suboptimality_percent: 0.20,
            lookahead: Lookahead { depth: 1, breadth: 3, discount: 0.6 },
        },
        SkillProfile {
            name: "seasoned".into(),
            base_weights: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::IncomePerDistance, 1.4)
                .set(ScoreDimension::MultiDeliveryPotential, 1.3)
                .set(ScoreDimension::VictoryProgress, 1.3)
                .set(ScoreDimension::BackboneAlignment, 1.2),
            random_choice_percent: 0.03,
            suboptimality_percent: 0.10,
            lookahead: Lookahead { depth: 2, breadth: 3, discount: 0.8 },
        },
        SkillProfile {
            name: "master".into(),
            base_weights: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::IncomePerDistance, 1.5)
                .set(ScoreDimension::MultiDeliveryPotential, 1.5)
                .set(ScoreDimension::VictoryProgress, 1.6)
                .set(ScoreDimension::BackboneAlignment, 1.4)
                .set(ScoreDimension::LoadSynergy, 1.3)
                .set(ScoreDimension::RiskExposure, 1.2),
            random_choice_percent: 0.0,
            suboptimality_percent: 0.0,
            lookahead: Lookahead { depth: 3, breadth: 4, discount: 0.9 },
        },
    ]
});

static ARCHETYPE_CATALOG: LazyLock<[ArchetypeProfile; 5]> = LazyLock::new(|| {
    [
        ArchetypeProfile {
            name: "magnate".into(),
            tagline: "Cash first, always".into(),
            multipliers: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::IncomeNow, 1.8)
                .set(ScoreDimension::IncomePerDistance, 1.5)
                .set(ScoreDimension::UpgradeRoi, 1.3)
                .set(ScoreDimension::NetworkExpansion, 0.7),
        },
        ArchetypeProfile {
            name: "surveyor".into(),
            tagline: "Track on the map beats money in the bank".into(),
            multipliers: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::NetworkExpansion, 1.8)
                .set(ScoreDimension::MajorCityProximity, 1.5)
                .set(ScoreDimension::BackboneAlignment, 1.4)
                .set(ScoreDimension::VictoryProgress, 1.3)
                .set(ScoreDimension::IncomeNow, 0.7),
        },
        ArchetypeProfile {
            name: "saboteur".into(),
            tagline: "Your route is my route now".into(),
            multipliers: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::CompetitorBlocking, 2.0)
                .set(ScoreDimension::LoadScarcity, 1.4)
                .set(ScoreDimension::IncomeNow, 0.8),
        },
        ArchetypeProfile {
            name: "gambler".into(),
            tagline: "Long odds, long hauls".into(),
            multipliers: DimensionWeights::uniform(1.0)
                .set(ScoreDimension::IncomeNow, 1.4)
                .set(ScoreDimension::RiskExposure, 0.3)
                .set(ScoreDimension::LoadScarcity, 1.5)
                .set(ScoreDimension::IncomePerDistance, 1.3),
        },
        ArchetypeProfile {
            name: "clockwork".into(),
            tagline: "No flair, no mistakes".into(),
            multipliers: DimensionWeights::uniform(1.0),
        },
    ]
});
