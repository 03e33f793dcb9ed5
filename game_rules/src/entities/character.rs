//! Character definitions.

use serde::{Deserialize, Serialize};

use super::{EntityId, Inventory};
use crate::quests::{Quest, QuestId};

/// A participant in a conversation: the player or an NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,
    pub title: Option<String>,

    /// Owned exclusively by this character.
    pub inventory: Inventory,

    /// Quests this character has accepted.
    pub quest_log: Vec<Quest>,

    pub personality_traits: Vec<String>,
}

impl Character {
    /// Create a new character with the given name and an empty inventory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            title: None,
            inventory: Inventory::default(),
            quest_log: Vec::new(),
            personality_traits: Vec::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replace the inventory.
    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = inventory;
        self
    }

    /// Check whether a quest is already in the quest log.
    pub fn has_quest(&self, id: QuestId) -> bool {
        self.quest_log.iter().any(|q| q.id == id)
    }

    /// Record an accepted quest. Returns false if it was already logged.
    pub fn accept_quest(&mut self, quest: Quest) -> bool {
        if self.has_quest(quest.id) {
            return false;
        }
        self.quest_log.push(quest);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character() {
        let character = Character::new("Stephen");
        assert_eq!(character.name, "Stephen");
        assert!(character.title.is_none());
        assert_eq!(character.inventory.gold, 0);
        assert!(character.quest_log.is_empty());
    }

    #[test]
    fn test_accept_quest_once() {
        let mut character = Character::new("Stephen");
        let quest = Quest::new("Defeat the Dragon", "Slay the beast");

        assert!(character.accept_quest(quest.clone()));
        assert!(!character.accept_quest(quest.clone()));
        assert_eq!(character.quest_log.len(), 1);
        assert!(character.has_quest(quest.id));
    }
}
