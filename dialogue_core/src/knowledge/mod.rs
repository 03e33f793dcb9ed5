//! Knowledge module - what the NPC knows and what each state may reveal.
//!
//! The knowledge base holds three collections:
//! - **Quests**: handed out by the `give_quest` action
//! - **Secrets**: shared by `share_secret`
//! - **Facts**: shared by `basic_info`
//!
//! Every entry carries the set of state names allowed to see it. The gate
//! turns a knowledge base into [`ProtectedKnowledge`] for one state.

mod entry;
mod gate;

pub use entry::*;
pub use gate::*;

use game_rules::QuestId;
use serde::{Deserialize, Serialize};

/// Everything an NPC knows, regardless of state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    quests: Vec<QuestRecord>,
    #[serde(default)]
    secrets: Vec<KnowledgeEntry>,
    #[serde(default)]
    facts: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quest(mut self, quest: QuestRecord) -> Self {
        self.quests.push(quest);
        self
    }

    pub fn with_secret(mut self, secret: KnowledgeEntry) -> Self {
        self.secrets.push(secret);
        self
    }

    pub fn with_fact(mut self, fact: KnowledgeEntry) -> Self {
        self.facts.push(fact);
        self
    }

    pub fn quests(&self) -> &[QuestRecord] {
        &self.quests
    }

    pub fn secrets(&self) -> &[KnowledgeEntry] {
        &self.secrets
    }

    pub fn facts(&self) -> &[KnowledgeEntry] {
        &self.facts
    }

    /// First quest visible in `state` that has not been handed out yet.
    pub fn next_offerable_quest(&self, state: &str) -> Option<&QuestRecord> {
        self.quests
            .iter()
            .find(|q| q.is_visible_in(state) && !q.is_given())
    }

    /// Mark a quest as given. Returns false if no such quest exists.
    pub fn mark_quest_given(&mut self, id: QuestId) -> bool {
        match self.quests.iter_mut().find(|q| q.id == id) {
            Some(record) => {
                record.mark_given();
                true
            }
            None => false,
        }
    }
}
