//! Outcome rules - how an action's result affects the pending transition.
//!
//! The executor always runs the action before the approved transition is
//! applied. These rules decide, per `(action, outcome)` pair, whether that
//! transition may still go ahead. Pairs without a rule allow it.

use serde::{Deserialize, Serialize};

use crate::machine::ActionKind;

/// Whether an action ended well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Succeeded,
    Failed,
}

impl ActionOutcome {
    pub fn from_success(succeeded: bool) -> Self {
        if succeeded {
            ActionOutcome::Succeeded
        } else {
            ActionOutcome::Failed
        }
    }
}

/// Effect of a rule on the approved transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOverride {
    Allow,
    Veto,
}

/// A single `(action, outcome) -> override` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRule {
    pub action: ActionKind,
    pub outcome: ActionOutcome,
    pub transition: TransitionOverride,
}

impl OutcomeRule {
    pub fn veto_on_failure(action: ActionKind) -> Self {
        Self {
            action,
            outcome: ActionOutcome::Failed,
            transition: TransitionOverride::Veto,
        }
    }
}

/// Ordered rule table. The first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeRules {
    rules: Vec<OutcomeRule>,
}

impl OutcomeRules {
    pub fn new(rules: Vec<OutcomeRule>) -> Self {
        Self { rules }
    }

    /// A declined or failed bribe never improves the NPC's attitude.
    pub fn standard() -> Self {
        Self::new(vec![OutcomeRule::veto_on_failure(ActionKind::TakeBribe)])
    }

    pub fn with_rule(mut self, rule: OutcomeRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[OutcomeRule] {
        &self.rules
    }

    pub fn resolve(&self, action: ActionKind, outcome: ActionOutcome) -> TransitionOverride {
        self.rules
            .iter()
            .find(|rule| rule.action == action && rule.outcome == outcome)
            .map(|rule| rule.transition)
            .unwrap_or(TransitionOverride::Allow)
    }
}
