//! NPC definitions loaded from TOML.
//!
//! An [`NpcDefinition`] bundles everything needed to bring an NPC to life:
//! its identity, the state machine, the outcome rules, its starting
//! inventory and its knowledge. [`DialogueSettings`] carries the tunables of
//! the turn pipeline.

use game_rules::{Character, Inventory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::ConfigError;
use crate::executor::OutcomeRules;
use crate::knowledge::KnowledgeBase;
use crate::machine::MachineSpec;

const MERCHANT_TOML: &str = include_str!("../data/merchant.toml");

/// Tunables for the turn pipeline. Every field is optional in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueSettings {
    /// Detections below this confidence are treated as none (0.0-1.0).
    pub confidence_threshold: f32,

    /// Gold paid by the player when a bribe is accepted.
    pub bribe_price: u32,

    /// Number of past exchanges handed to collaborators.
    pub history_turns: usize,

    /// Upper bound on requests in one trade session.
    pub max_trade_rounds: usize,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            bribe_price: 5,
            history_turns: 2,
            max_trade_rounds: 10,
        }
    }
}

impl DialogueSettings {
    /// Set the confidence threshold, clamped to 0.0-1.0.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_bribe_price(mut self, price: u32) -> Self {
        self.bribe_price = price;
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn with_max_trade_rounds(mut self, rounds: usize) -> Self {
        self.max_trade_rounds = rounds;
        self
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidSetting {
                name: "confidence_threshold",
                reason: format!("{threshold} is outside 0.0-1.0"),
            });
        }
        if self.max_trade_rounds == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_trade_rounds",
                reason: "must allow at least one round".to_string(),
            });
        }
        Ok(())
    }
}

/// A complete NPC as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcDefinition {
    pub name: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Personality traits handed to the response collaborator.
    #[serde(default)]
    pub personality: Vec<String>,

    #[serde(default)]
    pub settings: DialogueSettings,

    pub machine: MachineSpec,

    /// Replaces the standard rule table when present.
    #[serde(default = "OutcomeRules::standard")]
    pub outcome_rules: OutcomeRules,

    #[serde(default)]
    pub inventory: Inventory,

    #[serde(default)]
    pub knowledge: KnowledgeBase,
}

impl NpcDefinition {
    /// Read and parse a definition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let definition = Self::from_toml_str(&text)?;
        info!(npc = %definition.name, path = %path.display(), "loaded NPC definition");
        Ok(definition)
    }

    /// Parse a definition from TOML text.
    ///
    /// Settings are validated here; the machine is validated when it is
    /// turned into a [`MachineConfig`](crate::machine::MachineConfig).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let definition: Self = toml::from_str(text)?;
        definition.settings.validate()?;
        Ok(definition)
    }

    /// The bundled merchant preset.
    pub fn merchant() -> Result<Self, ConfigError> {
        Self::from_toml_str(MERCHANT_TOML)
    }

    /// The NPC as a game character holding the configured inventory.
    pub fn character(&self) -> Character {
        let mut character = Character::new(&self.name).with_inventory(self.inventory.clone());
        character.title = self.title.clone();
        character.personality_traits = self.personality.clone();
        character
    }
}
