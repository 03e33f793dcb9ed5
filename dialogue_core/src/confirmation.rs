//! Synchronous yes/no confirmation for state-changing actions.

use serde::Serialize;

use crate::machine::ActionKind;

/// A question put to the player before an action executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationRequest {
    pub action: ActionKind,
    pub npc: String,
    /// Question text, e.g. `"Pay 5 gold to Magnus? (y/n)"`.
    pub question: String,
}

impl ConfirmationRequest {
    pub fn bribe(npc: &str, price: u32) -> Self {
        Self {
            action: ActionKind::TakeBribe,
            npc: npc.to_string(),
            question: format!("Pay {price} gold to {npc}? (y/n)"),
        }
    }

    pub fn quest(npc: &str, quest_name: &str) -> Self {
        Self {
            action: ActionKind::GiveQuest,
            npc: npc.to_string(),
            question: format!("{npc} offers you the quest \"{quest_name}\". Accept? (y/n)"),
        }
    }

    pub fn trade(npc: &str) -> Self {
        Self {
            action: ActionKind::Trade,
            npc: npc.to_string(),
            question: format!("Trade with {npc}? (y/n)"),
        }
    }
}

/// Asks the player to confirm an action.
///
/// Returns the raw answer, or `None` if the prompt was cancelled.
pub trait ConfirmationPrompt {
    fn confirm(&mut self, request: &ConfirmationRequest) -> Option<String>;
}

impl<F> ConfirmationPrompt for F
where
    F: FnMut(&ConfirmationRequest) -> Option<String>,
{
    fn confirm(&mut self, request: &ConfirmationRequest) -> Option<String> {
        self(request)
    }
}

/// `y` or `yes`, ignoring case and surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Put the request to the player. Anything but an affirmative answer,
/// including a cancelled prompt, is a decline.
pub fn ask(prompt: &mut dyn ConfirmationPrompt, request: &ConfirmationRequest) -> bool {
    prompt
        .confirm(request)
        .map(|answer| is_affirmative(&answer))
        .unwrap_or(false)
}
