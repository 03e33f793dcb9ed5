//! NPC state machine.
//!
//! Each NPC owns a [`StateMachine`] bound to a shared, immutable
//! [`MachineConfig`]. Triggers are resolved through the configuration's
//! explicit `(source, condition) -> destination` table.

mod definition;

pub use definition::*;

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::TransitionError;

/// Runtime state machine for a single NPC.
#[derive(Debug, Clone)]
pub struct StateMachine {
    config: Arc<MachineConfig>,
    current: usize,
}

impl StateMachine {
    /// Create a machine in the configured initial state.
    pub fn new(config: Arc<MachineConfig>) -> Self {
        let current = config.initial_index();
        Self { config, current }
    }

    pub fn config(&self) -> &Arc<MachineConfig> {
        &self.config
    }

    pub fn current_state(&self) -> &State {
        self.config.state_at(self.current)
    }

    /// Fire a trigger. On success the machine moves to, and returns, the
    /// destination state. An unknown trigger leaves the machine untouched.
    pub fn attempt_transition(&mut self, condition: &str) -> Result<&State, TransitionError> {
        match self.config.destination(self.current, condition) {
            Some(destination) => {
                info!(
                    from = %self.current_state().name,
                    to = %self.config.state_at(destination).name,
                    condition,
                    "state transition"
                );
                self.current = destination;
                Ok(self.current_state())
            }
            None => {
                let state = self.current_state().name.clone();
                warn!(condition, state = %state, "transition not valid for current state");
                Err(TransitionError::InvalidForState {
                    condition: condition.to_string(),
                    state,
                })
            }
        }
    }

    /// Check whether a trigger would be accepted without firing it.
    pub fn can_transition(&self, condition: &str) -> bool {
        self.config.destination(self.current, condition).is_some()
    }

    /// Actions permitted in the current state.
    pub fn available_actions(&self) -> &[ActionDef] {
        &self.current_state().allowed_actions
    }

    /// Triggers leaving the current state.
    pub fn available_conditions(&self) -> Vec<&TransitionCondition> {
        self.config.outgoing(self.current).collect()
    }

    /// Look up any configured action, regardless of the current state.
    pub fn lookup_action(&self, name: &str) -> Option<&ActionDef> {
        self.config.action(name)
    }

    /// Look up any configured condition, regardless of the current state.
    pub fn lookup_condition(&self, name: &str) -> Option<&TransitionCondition> {
        self.config.condition(name)
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        self.current = self.config.initial_index();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NpcDefinition;

    fn merchant_machine() -> StateMachine {
        let definition = NpcDefinition::merchant().unwrap();
        let config = MachineConfig::from_spec(&definition.machine).unwrap();
        StateMachine::new(Arc::new(config))
    }

    #[test]
    fn test_starts_in_initial_state() {
        let machine = merchant_machine();
        assert_eq!(machine.current_state().name, "untrusting");
    }

    #[test]
    fn test_valid_transition() {
        let mut machine = merchant_machine();

        let state = machine.attempt_transition("player_offer_bribe").unwrap();
        assert_eq!(state.name, "helpful");
        assert_eq!(machine.current_state().name, "helpful");
    }

    #[test]
    fn test_condition_invalid_for_current_state() {
        let mut machine = merchant_machine();

        // Valid from "trusting" and "helpful", not from "untrusting".
        let err = machine.attempt_transition("player_threaten_npc").unwrap_err();

        assert_eq!(
            err,
            TransitionError::InvalidForState {
                condition: "player_threaten_npc".to_string(),
                state: "untrusting".to_string(),
            }
        );
        assert_eq!(machine.current_state().name, "untrusting");
    }

    #[test]
    fn test_unknown_condition_is_rejected() {
        let mut machine = merchant_machine();
        assert!(machine.attempt_transition("player_sings").is_err());
        assert_eq!(machine.current_state().name, "untrusting");
    }

    #[test]
    fn test_available_actions_follow_state() {
        let mut machine = merchant_machine();
        assert!(machine.current_state().allows(ActionKind::TakeBribe));
        assert!(!machine.current_state().allows(ActionKind::Trade));

        machine.attempt_transition("player_shared_personal_info").unwrap();
        let names: Vec<_> = machine.available_actions().iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"trade"));
        assert!(names.contains(&"give_quest"));
    }

    #[test]
    fn test_available_conditions() {
        let machine = merchant_machine();
        let names: Vec<_> = machine
            .available_conditions()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["player_shared_personal_info", "player_offer_bribe"]);
    }

    #[test]
    fn test_global_lookups_ignore_current_state() {
        let machine = merchant_machine();
        assert!(machine.lookup_condition("player_threaten_npc").is_some());
        assert!(machine.lookup_action("share_secret").is_some());
        assert!(!machine.can_transition("player_threaten_npc"));
        assert!(machine.lookup_action("dance").is_none());
    }

    #[test]
    fn test_reset() {
        let mut machine = merchant_machine();
        machine.attempt_transition("player_offer_bribe").unwrap();
        machine.reset();
        assert_eq!(machine.current_state().name, "untrusting");
    }

    #[test]
    fn test_instances_are_independent() {
        let shared = Arc::clone(merchant_machine().config());
        let mut first = StateMachine::new(Arc::clone(&shared));
        let second = StateMachine::new(shared);

        first.attempt_transition("player_offer_bribe").unwrap();

        assert_eq!(first.current_state().name, "helpful");
        assert_eq!(second.current_state().name, "untrusting");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::config::NpcDefinition;
    use proptest::prelude::*;

    const TRIGGERS: [&str; 5] = [
        "player_shared_personal_info",
        "player_offer_bribe",
        "player_threaten_npc",
        "player_sings",
        "",
    ];

    proptest! {
        #[test]
        fn always_in_a_configured_state(picks in proptest::collection::vec(0usize..TRIGGERS.len(), 0..40)) {
            let definition = NpcDefinition::merchant().unwrap();
            let config = Arc::new(MachineConfig::from_spec(&definition.machine).unwrap());
            let mut machine = StateMachine::new(Arc::clone(&config));

            for pick in picks {
                let before = machine.current_state().name.clone();
                let accepted = machine.can_transition(TRIGGERS[pick]);
                let result = machine.attempt_transition(TRIGGERS[pick]).map(|s| s.name.clone());

                prop_assert_eq!(result.is_ok(), accepted);
                if !accepted {
                    prop_assert_eq!(&machine.current_state().name, &before);
                }
                prop_assert!(config.state(&machine.current_state().name).is_some());
            }
        }
    }
}
