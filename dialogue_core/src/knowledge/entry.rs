//! Knowledge entries - secrets, facts and quests tagged with the states allowed to see them.

use game_rules::{Quest, QuestId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A secret or fact the NPC knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub name: String,

    /// Human-readable content.
    pub description: String,

    /// Names of the states in which this entry may be revealed.
    #[serde(default)]
    pub visible_in: BTreeSet<String>,
}

impl KnowledgeEntry {
    /// Create an entry that no state may reveal yet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            visible_in: BTreeSet::new(),
        }
    }

    /// Allow a state to reveal this entry.
    pub fn with_visibility(mut self, state: impl Into<String>) -> Self {
        self.visible_in.insert(state.into());
        self
    }

    /// Allow several states to reveal this entry.
    pub fn with_visibilities(mut self, states: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.visible_in.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn is_visible_in(&self, state: &str) -> bool {
        self.visible_in.contains(state)
    }
}

/// A quest in the NPC's quest log.
///
/// `is_given` only ever moves from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestRecord {
    #[serde(default)]
    pub id: QuestId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub visible_in: BTreeSet<String>,
    #[serde(default)]
    is_given: bool,
}

impl QuestRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: QuestId::new(),
            name: name.into(),
            description: description.into(),
            visible_in: BTreeSet::new(),
            is_given: false,
        }
    }

    /// Allow a state to offer this quest.
    pub fn with_visibility(mut self, state: impl Into<String>) -> Self {
        self.visible_in.insert(state.into());
        self
    }

    pub fn is_visible_in(&self, state: &str) -> bool {
        self.visible_in.contains(state)
    }

    pub fn is_given(&self) -> bool {
        self.is_given
    }

    /// Record that the quest was handed out.
    pub fn mark_given(&mut self) {
        self.is_given = true;
    }

    /// The quest as the player receives it.
    pub fn quest(&self) -> Quest {
        Quest {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}
