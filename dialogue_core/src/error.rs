//! Error types for the dialogue controller.

use thiserror::Error;

/// Errors detected while loading or validating an NPC definition.
///
/// These are raised at startup only; a definition that loads cleanly cannot
/// produce them at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate state: {0}")]
    DuplicateState(String),

    #[error("duplicate action: {0}")]
    DuplicateAction(String),

    #[error("duplicate transition condition: {0}")]
    DuplicateCondition(String),

    #[error("unknown state: {0}")]
    UnknownState(String),

    #[error("state '{state}' allows unknown action '{action}'")]
    UnknownAction { state: String, action: String },

    #[error("unsupported action '{0}': no executor is registered for it")]
    UnsupportedAction(String),

    #[error("transition {from_state} -> {to_state} references unknown condition '{condition}'")]
    UnknownCondition {
        from_state: String,
        to_state: String,
        condition: String,
    },

    #[error("condition '{condition}' leads from '{state}' to both '{first}' and '{second}'")]
    AmbiguousTrigger {
        state: String,
        condition: String,
        first: String,
        second: String,
    },

    #[error("state '{0}' is unreachable from the initial state")]
    UnreachableState(String),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// A trigger was attempted that the current state does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("'{condition}' is not a valid transition from state '{state}'")]
    InvalidForState { condition: String, state: String },
}

/// Failure reported by an external collaborator (classifier, reflection, responder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator} failed: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}
