use serde::{Deserialize, Serialize};

use crate::profiles::{Archetype, ArchetypeProfile, SkillLevel, SkillProfile};

/// Per-bot configuration the pipeline consumes. How this gets loaded (CLI,
/// lobby settings, …) is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub skill: SkillLevel,
    pub archetype: Archetype,
    /// Fixed seed for the turn's perturbation draw. None seeds from entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl BotConfig {
    pub fn new(skill: SkillLevel, archetype: Archetype) -> Self {
        Self {
            skill,
            archetype,
            rng_seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn skill_profile(&self) -> &'static SkillProfile {
        self.skill.profile()
    }

    pub fn archetype_profile(&self) -> &'static ArchetypeProfile {
        self.archetype.profile()
    }
}
