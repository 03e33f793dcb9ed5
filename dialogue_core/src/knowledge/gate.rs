//! Knowledge gate - filters a knowledge base down to what a state may reveal.

use game_rules::QuestId;
use serde::Serialize;

use super::{KnowledgeBase, KnowledgeEntry};
use crate::machine::State;

/// A quest as seen from a given state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestView {
    pub id: QuestId,
    pub name: String,
    pub description: String,
    pub is_given: bool,
}

/// The subset of a knowledge base visible in one state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtectedKnowledge {
    pub state: String,
    pub quests: Vec<QuestView>,
    pub secrets: Vec<KnowledgeEntry>,
    pub facts: Vec<KnowledgeEntry>,
}

impl ProtectedKnowledge {
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty() && self.secrets.is_empty() && self.facts.is_empty()
    }

    /// Render as prompt sections. Empty collections are omitted.
    pub fn to_context(&self) -> String {
        let mut out = String::new();

        if !self.quests.is_empty() {
            out.push_str("### Quests\n");
            for quest in &self.quests {
                out.push_str(&format!(
                    "- {}: {}{}\n",
                    quest.name,
                    quest.description,
                    if quest.is_given { " (already given)" } else { "" }
                ));
            }
        }
        for (title, entries) in [("### Secrets\n", &self.secrets), ("### Facts\n", &self.facts)] {
            if entries.is_empty() {
                continue;
            }
            out.push_str(title);
            for entry in entries {
                out.push_str(&format!("- {}: {}\n", entry.name, entry.description));
            }
        }

        out
    }
}

/// Collect every quest, secret and fact that `state` is allowed to reveal.
///
/// Pure; call it again whenever the state may have changed.
pub fn get_visible_knowledge(state: &State, knowledge: &KnowledgeBase) -> ProtectedKnowledge {
    let name = state.name.as_str();

    ProtectedKnowledge {
        state: state.name.clone(),
        quests: knowledge
            .quests()
            .iter()
            .filter(|q| q.is_visible_in(name))
            .map(|q| QuestView {
                id: q.id,
                name: q.name.clone(),
                description: q.description.clone(),
                is_given: q.is_given(),
            })
            .collect(),
        secrets: knowledge
            .secrets()
            .iter()
            .filter(|s| s.is_visible_in(name))
            .cloned()
            .collect(),
        facts: knowledge
            .facts()
            .iter()
            .filter(|f| f.is_visible_in(name))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::QuestRecord;

    fn state(name: &str) -> State {
        State {
            name: name.to_string(),
            demeanor: String::new(),
            allowed_actions: Vec::new(),
        }
    }

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase::new()
            .with_quest(
                QuestRecord::new("Defeat the Dragon", "A dragon terrorizes the town")
                    .with_visibility("trusting")
                    .with_visibility("helpful"),
            )
            .with_secret(KnowledgeEntry::new("cave", "Treasure in the northern cave").with_visibility("helpful"))
            .with_fact(
                KnowledgeEntry::new("town", "The town is called Millbrook")
                    .with_visibilities(["untrusting", "trusting", "helpful"]),
            )
    }

    #[test]
    fn test_untrusting_sees_only_public_facts() {
        let visible = get_visible_knowledge(&state("untrusting"), &knowledge());

        assert!(visible.quests.is_empty());
        assert!(visible.secrets.is_empty());
        assert_eq!(visible.facts.len(), 1);
    }

    #[test]
    fn test_helpful_sees_everything() {
        let visible = get_visible_knowledge(&state("helpful"), &knowledge());

        assert_eq!(visible.quests.len(), 1);
        assert_eq!(visible.secrets.len(), 1);
        assert_eq!(visible.facts.len(), 1);
        assert_eq!(visible.state, "helpful");
    }

    #[test]
    fn test_unknown_state_sees_nothing() {
        assert!(get_visible_knowledge(&state("asleep"), &knowledge()).is_empty());
    }

    #[test]
    fn test_quest_view_reflects_given_flag() {
        let mut kb = knowledge();
        let id = kb.quests()[0].id;
        kb.mark_quest_given(id);

        let visible = get_visible_knowledge(&state("trusting"), &kb);
        assert!(visible.quests[0].is_given);
        assert!(visible.to_context().contains("(already given)"));
    }

    #[test]
    fn test_to_context_sections() {
        let context = get_visible_knowledge(&state("helpful"), &knowledge()).to_context();

        assert!(context.contains("### Quests"));
        assert!(context.contains("- cave: Treasure in the northern cave"));
        assert!(context.contains("### Facts"));

        let context = get_visible_knowledge(&state("untrusting"), &knowledge()).to_context();
        assert!(!context.contains("### Secrets"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::knowledge::QuestRecord;
    use proptest::prelude::*;

    const STATES: [&str; 4] = ["untrusting", "trusting", "helpful", "hostile"];

    fn visibility() -> impl Strategy<Value = Vec<usize>> {
        proptest::collection::vec(0usize..STATES.len(), 0..4)
    }

    fn knowledge_base() -> impl Strategy<Value = KnowledgeBase> {
        (
            proptest::collection::vec(visibility(), 0..5),
            proptest::collection::vec(visibility(), 0..5),
            proptest::collection::vec(visibility(), 0..5),
        )
            .prop_map(|(quests, secrets, facts)| {
                let mut kb = KnowledgeBase::new();
                for (i, tags) in quests.into_iter().enumerate() {
                    let mut record = QuestRecord::new(format!("quest {i}"), "");
                    for t in tags {
                        record = record.with_visibility(STATES[t]);
                    }
                    kb = kb.with_quest(record);
                }
                for (i, tags) in secrets.into_iter().enumerate() {
                    kb = kb.with_secret(
                        KnowledgeEntry::new(format!("secret {i}"), "")
                            .with_visibilities(tags.into_iter().map(|t| STATES[t])),
                    );
                }
                for (i, tags) in facts.into_iter().enumerate() {
                    kb = kb.with_fact(
                        KnowledgeEntry::new(format!("fact {i}"), "")
                            .with_visibilities(tags.into_iter().map(|t| STATES[t])),
                    );
                }
                kb
            })
    }

    proptest! {
        #[test]
        fn never_reveals_hidden_entries(kb in knowledge_base(), pick in 0usize..STATES.len()) {
            let state = State {
                name: STATES[pick].to_string(),
                demeanor: String::new(),
                allowed_actions: Vec::new(),
            };
            let visible = get_visible_knowledge(&state, &kb);

            for quest in &visible.quests {
                let record = kb.quests().iter().find(|q| q.id == quest.id).unwrap();
                prop_assert!(record.is_visible_in(&state.name));
            }
            for entry in visible.secrets.iter().chain(visible.facts.iter()) {
                prop_assert!(entry.is_visible_in(&state.name));
            }

            let expected_secrets = kb.secrets().iter().filter(|s| s.is_visible_in(&state.name)).count();
            prop_assert_eq!(visible.secrets.len(), expected_secrets);
        }
    }
}
