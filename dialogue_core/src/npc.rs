//! The NPC and its turn pipeline.
//!
//! One turn runs, in order:
//!
//! 1. **Detect**: the classifier proposes a transition condition and an
//!    action. Low-confidence, failed and unresolvable detections become none.
//! 2. **Reflect**: the reflection gate approves or vetoes each detection.
//! 3. **Act**: the approved action runs through the [`ActionExecutor`].
//! 4. **Transition**: the approved transition is applied unless the outcome
//!    rules veto it for this action's result.
//!
//! A turn takes `&mut self`, so a single NPC is never driven concurrently.
//! NPCs built from the same definition can share one [`MachineConfig`].

use game_rules::Character;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::{ActionQuery, IntentClassifier, TransitionQuery};
use crate::config::{DialogueSettings, NpcDefinition};
use crate::confirmation::ConfirmationPrompt;
use crate::error::ConfigError;
use crate::executor::{
    ActionContext, ActionExecutor, ActionFailure, ActionPhase, OutcomeRules, TransitionOverride,
};
use crate::knowledge::{get_visible_knowledge, KnowledgeBase, KnowledgeEntry};
use crate::machine::{ActionDef, ActionKind, MachineConfig, State, StateMachine, TransitionCondition};
use crate::memory::{ChatHistory, ChatRole};
use crate::reflection::{Approval, ReflectionGate, ReflectionRequest};
use crate::response::{respond_or_fallback, ResponseGenerator, ResponseRequest};
use crate::trade::{TradeNegotiator, TradeSummary};

/// External collaborators consulted during a turn.
pub struct Collaborators<'a> {
    pub classifier: &'a dyn IntentClassifier,
    pub reflection: &'a dyn ReflectionGate,
    pub confirmation: &'a mut dyn ConfirmationPrompt,
    pub negotiator: &'a mut dyn TradeNegotiator,
}

/// Everything that happened during one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub state_before: String,
    pub state_after: String,

    /// Approved action, if any.
    pub action: Option<ActionKind>,
    pub action_succeeded: bool,
    pub action_failure: Option<ActionFailure>,
    pub phases: Vec<ActionPhase>,

    /// Approved transition condition, if any.
    pub transition: Option<String>,
    pub transition_succeeded: bool,
    /// The outcome rules blocked the transition.
    pub transition_vetoed: bool,

    pub reasoning: String,
    pub overridden_utterance: Option<String>,
    pub surfaced_knowledge: Vec<KnowledgeEntry>,
    pub trade: Option<TradeSummary>,
}

impl TurnOutcome {
    /// Plain-text account of the turn for the response prompt.
    pub fn to_context(&self) -> String {
        let mut out = String::new();

        if self.state_before == self.state_after {
            out.push_str(&format!("State: {}\n", self.state_after));
        } else {
            out.push_str(&format!("State: {} -> {}\n", self.state_before, self.state_after));
        }

        match &self.action {
            None => out.push_str("Action: none\n"),
            Some(kind) if self.action_succeeded => out.push_str(&format!("Action: {kind} (succeeded)\n")),
            Some(kind) => match &self.action_failure {
                Some(failure) => out.push_str(&format!("Action: {kind} (failed: {failure})\n")),
                None => out.push_str(&format!("Action: {kind} (failed)\n")),
            },
        }

        if !self.surfaced_knowledge.is_empty() {
            out.push_str("Revealed:\n");
            for entry in &self.surfaced_knowledge {
                out.push_str(&format!("- {}: {}\n", entry.name, entry.description));
            }
        }

        if let Some(trade) = &self.trade {
            out.push_str("Trade:\n");
            out.push_str(&trade.to_context());
        }

        out
    }
}

/// A resolved turn together with the NPC's spoken answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub outcome: TurnOutcome,
    pub text: String,
}

/// A conversational NPC.
#[derive(Debug, Clone)]
pub struct Npc {
    character: Character,
    machine: StateMachine,
    knowledge: KnowledgeBase,
    history: ChatHistory,
    settings: DialogueSettings,
    rules: OutcomeRules,
    previous_reasoning: Option<String>,
}

impl Npc {
    /// Validate a definition and bring the NPC to life.
    pub fn from_definition(definition: &NpcDefinition) -> Result<Self, ConfigError> {
        let config = MachineConfig::from_spec(&definition.machine)?;
        Self::with_config(definition, Arc::new(config))
    }

    /// Build an NPC around an already validated, possibly shared, machine
    /// configuration.
    pub fn with_config(definition: &NpcDefinition, config: Arc<MachineConfig>) -> Result<Self, ConfigError> {
        definition.settings.validate()?;
        let machine = StateMachine::new(config);
        info!(
            npc = %definition.name,
            state = %machine.current_state().name,
            "NPC created"
        );

        Ok(Self {
            character: definition.character(),
            machine,
            knowledge: definition.knowledge.clone(),
            history: ChatHistory::new(),
            settings: definition.settings.clone(),
            rules: definition.outcome_rules.clone(),
            previous_reasoning: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.character.name
    }

    /// The NPC as a game character, including its inventory.
    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn state(&self) -> &State {
        self.machine.current_state()
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn settings(&self) -> &DialogueSettings {
        &self.settings
    }

    pub fn previous_reasoning(&self) -> Option<&str> {
        self.previous_reasoning.as_deref()
    }

    /// Start the conversation over. Inventory and given quests are kept.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.history = ChatHistory::new();
        self.previous_reasoning = None;
    }

    /// Resolve one player utterance: detect, reflect, act, transition.
    ///
    /// Nothing is written to the chat history; see [`Npc::respond`].
    pub fn take_turn(
        &mut self,
        player: &mut Character,
        utterance: &str,
        collaborators: &mut Collaborators<'_>,
    ) -> TurnOutcome {
        let state_before = self.machine.current_state().name.clone();

        let detected_transition = self.detect_transition(utterance, collaborators.classifier);
        let detected_action = self.detect_action(utterance, collaborators.classifier);

        let approval = self.reflect(
            utterance,
            detected_transition.as_ref(),
            detected_action.as_ref(),
            collaborators.reflection,
        );
        let transition = detected_transition.filter(|condition| {
            if !approval.transition_approved {
                info!(condition = %condition.name, "transition rejected by reflection");
            }
            approval.transition_approved
        });
        let action = detected_action.filter(|action| {
            if !approval.action_approved {
                info!(action = %action.name, "action rejected by reflection");
            }
            approval.action_approved
        });

        let report = {
            let mut ctx = ActionContext {
                npc_name: &self.character.name,
                state: self.machine.current_state(),
                settings: &self.settings,
                npc_inventory: &mut self.character.inventory,
                knowledge: &mut self.knowledge,
                player: &mut *player,
                confirmation: &mut *collaborators.confirmation,
                negotiator: &mut *collaborators.negotiator,
            };
            ActionExecutor::new(&mut ctx).execute(action.as_ref())
        };

        let mut transition_succeeded = false;
        let mut transition_vetoed = false;
        if let Some(condition) = &transition {
            let verdict = match report.action {
                Some(kind) => self.rules.resolve(kind, report.outcome()),
                None => TransitionOverride::Allow,
            };
            match verdict {
                TransitionOverride::Veto => {
                    info!(
                        condition = %condition.name,
                        action = ?report.action,
                        "transition vetoed by action outcome"
                    );
                    transition_vetoed = true;
                }
                TransitionOverride::Allow => {
                    transition_succeeded = self.machine.attempt_transition(&condition.name).is_ok();
                }
            }
        }

        self.previous_reasoning = Some(approval.reasoning.clone());

        TurnOutcome {
            state_before,
            state_after: self.machine.current_state().name.clone(),
            action: report.action,
            action_succeeded: report.succeeded,
            action_failure: report.failure,
            phases: report.phases,
            transition: transition.map(|condition| condition.name),
            transition_succeeded,
            transition_vetoed,
            reasoning: approval.reasoning,
            overridden_utterance: report.overridden_utterance,
            surfaced_knowledge: report.surfaced_knowledge,
            trade: report.trade,
        }
    }

    /// Take a turn, answer in character and record both lines.
    ///
    /// The player's line is stored as the canonical acknowledgement when the
    /// turn produced one.
    pub fn respond(
        &mut self,
        player: &mut Character,
        utterance: &str,
        collaborators: &mut Collaborators<'_>,
        responder: &dyn ResponseGenerator,
    ) -> Reply {
        let outcome = self.take_turn(player, utterance, collaborators);
        let spoken = outcome
            .overridden_utterance
            .clone()
            .unwrap_or_else(|| utterance.to_string());

        let state = self.machine.current_state();
        let knowledge = get_visible_knowledge(state, &self.knowledge);
        let request = ResponseRequest {
            npc: &self.character.name,
            title: self.character.title.as_deref(),
            personality: &self.character.personality_traits,
            utterance: &spoken,
            state: &state.name,
            demeanor: &state.demeanor,
            history: self.history.window(self.settings.history_turns),
            knowledge: &knowledge,
            outcome: &outcome,
        };
        let text = respond_or_fallback(responder, &request);

        self.history.push(ChatRole::Player, spoken);
        self.history.push(ChatRole::Npc, text.clone());
        Reply { outcome, text }
    }

    /// Run a scripted conversation, one reply per utterance.
    pub fn converse<'u, I>(
        &mut self,
        player: &mut Character,
        utterances: I,
        collaborators: &mut Collaborators<'_>,
        responder: &dyn ResponseGenerator,
    ) -> Vec<Reply>
    where
        I: IntoIterator<Item = &'u str>,
    {
        utterances
            .into_iter()
            .map(|utterance| self.respond(player, utterance, collaborators, responder))
            .collect()
    }

    fn detect_transition(&self, utterance: &str, classifier: &dyn IntentClassifier) -> Option<TransitionCondition> {
        let state = self.machine.current_state();
        let query = TransitionQuery {
            utterance,
            state: &state.name,
            history: self.history.window(self.settings.history_turns),
            candidates: self.machine.available_conditions(),
        };

        let detection = match classifier.detect_transition(&query) {
            Ok(detection) => detection,
            Err(error) => {
                warn!(%error, "transition detection failed");
                return None;
            }
        };
        let threshold = self.settings.confidence_threshold;
        let Some(label) = detection.accept(threshold) else {
            debug!(
                label = ?detection.label,
                confidence = detection.confidence,
                threshold,
                "no transition detected"
            );
            return None;
        };

        match self.machine.lookup_condition(label) {
            Some(condition) => {
                debug!(condition = label, confidence = detection.confidence, "transition detected");
                Some(condition.clone())
            }
            None => {
                warn!(label, "classifier returned an unknown condition");
                None
            }
        }
    }

    fn detect_action(&self, utterance: &str, classifier: &dyn IntentClassifier) -> Option<ActionDef> {
        let state = self.machine.current_state();
        let query = ActionQuery {
            utterance,
            state: &state.name,
            history: self.history.window(self.settings.history_turns),
            candidates: &state.allowed_actions,
        };

        let detection = match classifier.detect_action(&query) {
            Ok(detection) => detection,
            Err(error) => {
                warn!(%error, "action detection failed");
                return None;
            }
        };
        let threshold = self.settings.confidence_threshold;
        let Some(label) = detection.accept(threshold) else {
            debug!(
                label = ?detection.label,
                confidence = detection.confidence,
                threshold,
                "no action detected"
            );
            return None;
        };

        match state.action(label) {
            Some(action) => {
                debug!(action = label, confidence = detection.confidence, "action detected");
                Some(action.clone())
            }
            None if self.machine.lookup_action(label).is_some() => {
                warn!(action = label, state = %state.name, "action not permitted in current state");
                None
            }
            None => {
                warn!(label, "classifier returned an unknown action");
                None
            }
        }
    }

    fn reflect(
        &self,
        utterance: &str,
        transition: Option<&TransitionCondition>,
        action: Option<&ActionDef>,
        gate: &dyn ReflectionGate,
    ) -> Approval {
        let state = self.machine.current_state();
        let knowledge = get_visible_knowledge(state, &self.knowledge);
        let request = ReflectionRequest {
            utterance,
            state,
            transition,
            action,
            previous_reasoning: self.previous_reasoning.as_deref(),
            knowledge: &knowledge,
            history: self.history.window(self.settings.history_turns),
        };

        match gate.reflect(&request) {
            Ok(approval) => {
                debug!(
                    transition = approval.transition_approved,
                    action = approval.action_approved,
                    reasoning = %approval.reasoning,
                    "reflection verdict"
                );
                approval
            }
            Err(error) => {
                warn!(%error, "reflection failed, rejecting detections");
                Approval::reject_all(format!("reflection unavailable: {error}"))
            }
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::classifier::Detection;
    use crate::confirmation::ConfirmationRequest;
    use crate::error::CollaboratorError;
    use crate::reflection::ApproveAll;
    use crate::trade::{TradeRequest, TradeView};
    use game_rules::Inventory;
    use proptest::prelude::*;

    const CONDITIONS: [&str; 4] = [
        "player_shared_personal_info",
        "player_offer_bribe",
        "player_threaten_npc",
        "player_sings",
    ];
    const ACTIONS: [&str; 7] = [
        "basic_info",
        "question_player",
        "share_secret",
        "take_bribe",
        "give_quest",
        "trade",
        "dance",
    ];

    /// Returns the same detections for every utterance.
    struct Fixed {
        transition: Detection,
        action: Detection,
    }

    impl IntentClassifier for Fixed {
        fn detect_transition(&self, _query: &TransitionQuery<'_>) -> Result<Detection, CollaboratorError> {
            Ok(self.transition.clone())
        }

        fn detect_action(&self, _query: &ActionQuery<'_>) -> Result<Detection, CollaboratorError> {
            Ok(self.action.clone())
        }
    }

    fn negotiator<F>(f: F) -> F
    where
        F: FnMut(&TradeView<'_>) -> TradeRequest,
    {
        f
    }

    fn step() -> impl Strategy<Value = (usize, usize, f32, bool, bool)> {
        (
            0..CONDITIONS.len(),
            0..ACTIONS.len(),
            0.0f32..=1.0,
            any::<bool>(),
            any::<bool>(),
        )
    }

    proptest! {
        #[test]
        fn turns_preserve_invariants(steps in proptest::collection::vec(step(), 1..25), gold in 0u32..30) {
            let mut npc = Npc::from_definition(&NpcDefinition::merchant().unwrap()).unwrap();
            let mut player = Character::new("Stephen").with_inventory(Inventory::with_gold(gold));
            let total_gold = u64::from(gold) + u64::from(npc.character().inventory.gold);
            let total_items = npc.character().inventory.item_count();

            for (condition, action, confidence, confirm, buy) in steps {
                let classifier = Fixed {
                    transition: Detection::new(CONDITIONS[condition], confidence),
                    action: Detection::new(ACTIONS[action], confidence),
                };
                let mut confirmation = |_: &ConfirmationRequest| Some(if confirm { "y" } else { "n" }.to_string());
                let mut asked = false;
                let mut negotiator = negotiator(move |_| {
                    if buy && !asked {
                        asked = true;
                        TradeRequest::Buy { item: "Potion".to_string() }
                    } else {
                        TradeRequest::Exit
                    }
                });
                let mut collaborators = Collaborators {
                    classifier: &classifier,
                    reflection: &ApproveAll,
                    confirmation: &mut confirmation,
                    negotiator: &mut negotiator,
                };

                let before = npc.state().clone();
                let outcome = npc.take_turn(&mut player, "...", &mut collaborators);

                prop_assert!(npc.machine().config().state(&outcome.state_after).is_some());
                prop_assert_eq!(&outcome.state_before, &before.name);
                for entry in &outcome.surfaced_knowledge {
                    prop_assert!(entry.is_visible_in(&before.name));
                }
                if let Some(kind) = outcome.action {
                    prop_assert!(before.allows(kind));
                }
                if confidence < 0.7 {
                    prop_assert_eq!(outcome.action, None);
                    prop_assert_eq!(&outcome.state_after, &before.name);
                }
                if outcome.action == Some(ActionKind::TakeBribe) && !outcome.action_succeeded {
                    prop_assert_eq!(&outcome.state_after, &before.name);
                }

                let gold_now = u64::from(player.inventory.gold) + u64::from(npc.character().inventory.gold);
                prop_assert_eq!(gold_now, total_gold);
                prop_assert_eq!(
                    player.inventory.item_count() + npc.character().inventory.item_count(),
                    total_items
                );
            }
        }
    }
}
