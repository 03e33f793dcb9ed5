//! Configuration data for the NPC state machine.
//!
//! A [`MachineSpec`] is the raw, serializable shape read from configuration.
//! [`MachineConfig::from_spec`] validates it once and produces the immutable
//! configuration that every [`StateMachine`](super::StateMachine) reads from.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ConfigError;

/// The closed set of actions the executor knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Share simple, non-sensitive facts.
    BasicInfo,
    /// Ask the player about their intentions.
    QuestionPlayer,
    /// Share secrets visible in the current state.
    ShareSecret,
    /// Accept gold from the player.
    TakeBribe,
    /// Offer a quest from the quest log.
    GiveQuest,
    /// Enter trade mode.
    Trade,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::BasicInfo,
        ActionKind::QuestionPlayer,
        ActionKind::ShareSecret,
        ActionKind::TakeBribe,
        ActionKind::GiveQuest,
        ActionKind::Trade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::BasicInfo => "basic_info",
            ActionKind::QuestionPlayer => "question_player",
            ActionKind::ShareSecret => "share_secret",
            ActionKind::TakeBribe => "take_bribe",
            ActionKind::GiveQuest => "give_quest",
            ActionKind::Trade => "trade",
        }
    }

    /// Whether the player must accept this action before it runs, unless
    /// configuration says otherwise.
    pub fn requires_confirmation_by_default(&self) -> bool {
        matches!(
            self,
            ActionKind::TakeBribe | ActionKind::GiveQuest | ActionKind::Trade
        )
    }
}

impl FromStr for ActionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedAction(s.to_string()))
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action an NPC may perform. Identified by name.
#[derive(Debug, Clone, Serialize)]
pub struct ActionDef {
    pub name: String,
    pub kind: ActionKind,
    pub description: String,
    pub requires_confirmation: bool,
}

impl PartialEq for ActionDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ActionDef {}

impl Hash for ActionDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A named classifier label that can trigger a state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionCondition {
    pub name: String,
    /// Example utterances for few-shot classification.
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TransitionCondition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            examples: Vec::new(),
            description: None,
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl PartialEq for TransitionCondition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TransitionCondition {}

impl Hash for TransitionCondition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// An emotional state of the NPC and the actions it permits.
#[derive(Debug, Clone, Serialize)]
pub struct State {
    pub name: String,
    /// How the NPC behaves while in this state.
    pub demeanor: String,
    pub allowed_actions: Vec<ActionDef>,
}

impl State {
    /// Allowed action with the given name.
    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.allowed_actions.iter().find(|a| a.name == name)
    }

    pub fn allows(&self, kind: ActionKind) -> bool {
        self.allowed_actions.iter().any(|a| a.kind == kind)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Edge between two states, taken when any of its conditions fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    #[serde(rename = "from")]
    pub source: String,
    #[serde(rename = "to")]
    pub destination: String,
    pub conditions: Vec<String>,
}

impl StateTransition {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        conditions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            conditions: conditions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Action as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Falls back to [`ActionKind::requires_confirmation_by_default`].
    #[serde(default)]
    pub requires_confirmation: Option<bool>,
}

/// State as written in configuration; actions are referenced by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    #[serde(default)]
    pub demeanor: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Unvalidated machine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSpec {
    pub initial_state: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub states: Vec<StateSpec>,
    #[serde(default)]
    pub conditions: Vec<TransitionCondition>,
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
}

/// Validated, immutable state machine configuration.
///
/// States are addressed internally by index; the trigger table maps
/// `(source state, condition name)` to the destination state.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    states: Vec<State>,
    state_index: HashMap<String, usize>,
    initial: usize,
    actions: Vec<ActionDef>,
    conditions: Vec<TransitionCondition>,
    condition_index: HashMap<String, usize>,
    transitions: Vec<StateTransition>,
    /// Per source state: condition name -> destination state index.
    triggers: Vec<HashMap<String, usize>>,
    /// Per source state: outgoing condition indices in declaration order.
    outgoing: Vec<Vec<usize>>,
}

impl MachineConfig {
    /// Validate a spec and build the trigger table.
    pub fn from_spec(spec: &MachineSpec) -> Result<Self, ConfigError> {
        let mut actions: Vec<ActionDef> = Vec::with_capacity(spec.actions.len());
        for action in &spec.actions {
            if actions.iter().any(|a| a.name == action.name) {
                return Err(ConfigError::DuplicateAction(action.name.clone()));
            }
            let kind: ActionKind = action.name.parse()?;
            actions.push(ActionDef {
                name: action.name.clone(),
                kind,
                description: action.description.clone(),
                requires_confirmation: action
                    .requires_confirmation
                    .unwrap_or_else(|| kind.requires_confirmation_by_default()),
            });
        }

        let mut states = Vec::with_capacity(spec.states.len());
        let mut state_index = HashMap::new();
        for state in &spec.states {
            if state_index.contains_key(&state.name) {
                return Err(ConfigError::DuplicateState(state.name.clone()));
            }
            let allowed_actions = state
                .actions
                .iter()
                .map(|name| {
                    actions
                        .iter()
                        .find(|a| &a.name == name)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnknownAction {
                            state: state.name.clone(),
                            action: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            state_index.insert(state.name.clone(), states.len());
            states.push(State {
                name: state.name.clone(),
                demeanor: state.demeanor.clone(),
                allowed_actions,
            });
        }

        let mut condition_index = HashMap::new();
        for (i, condition) in spec.conditions.iter().enumerate() {
            if condition_index.insert(condition.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateCondition(condition.name.clone()));
            }
        }

        let initial = *state_index
            .get(&spec.initial_state)
            .ok_or_else(|| ConfigError::UnknownState(spec.initial_state.clone()))?;

        let mut triggers: Vec<HashMap<String, usize>> = vec![HashMap::new(); states.len()];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); states.len()];
        for transition in &spec.transitions {
            let source = lookup_state(&state_index, &transition.source)?;
            let destination = lookup_state(&state_index, &transition.destination)?;
            for condition in &transition.conditions {
                let condition_idx = *condition_index.get(condition).ok_or_else(|| {
                    ConfigError::UnknownCondition {
                        from_state: transition.source.clone(),
                        to_state: transition.destination.clone(),
                        condition: condition.clone(),
                    }
                })?;
                match triggers[source].get(condition) {
                    Some(&existing) if existing != destination => {
                        return Err(ConfigError::AmbiguousTrigger {
                            state: transition.source.clone(),
                            condition: condition.clone(),
                            first: states[existing].name.clone(),
                            second: transition.destination.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        triggers[source].insert(condition.clone(), destination);
                        outgoing[source].push(condition_idx);
                    }
                }
            }
        }

        let config = Self {
            states,
            state_index,
            initial,
            actions,
            conditions: spec.conditions.clone(),
            condition_index,
            transitions: spec.transitions.clone(),
            triggers,
            outgoing,
        };
        config.check_reachability()?;
        Ok(config)
    }

    fn check_reachability(&self) -> Result<(), ConfigError> {
        let mut seen = vec![false; self.states.len()];
        let mut queue = VecDeque::from([self.initial]);
        seen[self.initial] = true;

        while let Some(current) = queue.pop_front() {
            for &next in self.triggers[current].values() {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }

        match seen.iter().position(|reached| !reached) {
            Some(unreached) => Err(ConfigError::UnreachableState(
                self.states[unreached].name.clone(),
            )),
            None => Ok(()),
        }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.state_index.get(name).map(|&i| &self.states[i])
    }

    pub fn initial_state(&self) -> &State {
        &self.states[self.initial]
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn conditions(&self) -> &[TransitionCondition] {
        &self.conditions
    }

    pub fn condition(&self, name: &str) -> Option<&TransitionCondition> {
        self.condition_index.get(name).map(|&i| &self.conditions[i])
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub(crate) fn initial_index(&self) -> usize {
        self.initial
    }

    pub(crate) fn state_at(&self, index: usize) -> &State {
        &self.states[index]
    }

    pub(crate) fn destination(&self, source: usize, condition: &str) -> Option<usize> {
        self.triggers[source].get(condition).copied()
    }

    pub(crate) fn outgoing(&self, source: usize) -> impl Iterator<Item = &TransitionCondition> {
        self.outgoing[source].iter().map(|&i| &self.conditions[i])
    }
}

fn lookup_state(index: &HashMap<String, usize>, name: &str) -> Result<usize, ConfigError> {
    index
        .get(name)
        .copied()
        .ok_or_else(|| ConfigError::UnknownState(name.to_string()))
}
