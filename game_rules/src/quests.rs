//! Quest definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestId(pub Uuid);

impl QuestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quest an NPC can hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    #[serde(default)]
    pub id: QuestId,
    pub name: String,
    pub description: String,
}

impl Quest {
    /// Create a quest with a fresh ID.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: QuestId::new(),
            name: name.into(),
            description: description.into(),
        }
    }
}
