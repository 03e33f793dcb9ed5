//! Reflection gate - a second opinion on what the classifier detected.
//!
//! The gate sees the detections together with the NPC's state, its visible
//! knowledge and the conversation so far, and may veto the transition and
//! the action independently.

use serde::{Deserialize, Serialize};

use crate::classifier::extract_json;
use crate::error::CollaboratorError;
use crate::knowledge::ProtectedKnowledge;
use crate::machine::{ActionDef, State, TransitionCondition};
use crate::memory::ChatEntry;

/// Everything the gate gets to look at.
#[derive(Debug, Clone, Serialize)]
pub struct ReflectionRequest<'a> {
    pub utterance: &'a str,
    pub state: &'a State,
    pub transition: Option<&'a TransitionCondition>,
    pub action: Option<&'a ActionDef>,
    /// Reasoning returned by the gate on the previous turn.
    pub previous_reasoning: Option<&'a str>,
    /// Knowledge visible in `state`, before any transition.
    pub knowledge: &'a ProtectedKnowledge,
    pub history: &'a [ChatEntry],
}

/// The gate's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub transition_approved: bool,
    pub action_approved: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl Approval {
    pub fn approve_all(reasoning: impl Into<String>) -> Self {
        Self {
            transition_approved: true,
            action_approved: true,
            reasoning: reasoning.into(),
        }
    }

    pub fn reject_all(reasoning: impl Into<String>) -> Self {
        Self {
            transition_approved: false,
            action_approved: false,
            reasoning: reasoning.into(),
        }
    }

    /// Parse a collaborator's JSON verdict, ignoring surrounding prose.
    pub fn from_json(text: &str) -> Result<Self, CollaboratorError> {
        let json = extract_json("reflection", text)?;
        serde_json::from_str(json)
            .map_err(|e| CollaboratorError::new("reflection", format!("invalid approval: {e}")))
    }
}

/// Approves or vetoes detected transitions and actions.
pub trait ReflectionGate {
    fn reflect(&self, request: &ReflectionRequest<'_>) -> Result<Approval, CollaboratorError>;
}

/// A gate that approves everything it is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

impl ReflectionGate for ApproveAll {
    fn reflect(&self, request: &ReflectionRequest<'_>) -> Result<Approval, CollaboratorError> {
        let detected = [
            request.transition.map(|c| c.name.as_str()),
            request.action.map(|a| a.name.as_str()),
        ];
        let reasoning = match detected {
            [None, None] => "nothing to approve".to_string(),
            [Some(t), None] => format!("approved transition {t}"),
            [None, Some(a)] => format!("approved action {a}"),
            [Some(t), Some(a)] => format!("approved transition {t} and action {a}"),
        };
        Ok(Approval::approve_all(reasoning))
    }
}
