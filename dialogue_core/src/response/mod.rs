//! Response assembly - builds what the response collaborator needs to speak.
//!
//! After a turn has been resolved the NPC answers in character. The
//! [`ResponseRequest`] gathers the NPC's identity, its post-transition state
//! and demeanor, the recent conversation, the knowledge that state may
//! reveal and the outcome of the turn, and renders it as a prompt.

use serde::Serialize;
use tracing::warn;

use crate::error::CollaboratorError;
use crate::knowledge::ProtectedKnowledge;
use crate::memory::{render, ChatEntry};
use crate::npc::TurnOutcome;

/// Line spoken when the response collaborator fails.
pub const FALLBACK_RESPONSE: &str = "Hmm. Let me think about that for a moment.";

/// Input for the response collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest<'a> {
    pub npc: &'a str,
    pub title: Option<&'a str>,
    pub personality: &'a [String],

    /// The player's words, or the canonical acknowledgement replacing them.
    pub utterance: &'a str,

    /// State after the turn.
    pub state: &'a str,
    pub demeanor: &'a str,

    pub history: &'a [ChatEntry],

    /// Knowledge visible in `state`.
    pub knowledge: &'a ProtectedKnowledge,

    pub outcome: &'a TurnOutcome,
}

impl ResponseRequest<'_> {
    /// Format the request as a prompt string.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Character\n");
        prompt.push_str(self.npc);
        if let Some(title) = self.title {
            prompt.push(' ');
            prompt.push_str(title);
        }
        prompt.push('\n');
        if !self.personality.is_empty() {
            prompt.push_str(&format!("Personality: {}\n", self.personality.join(", ")));
        }
        prompt.push_str(&format!("State: {}\n", self.state));
        if !self.demeanor.is_empty() {
            prompt.push_str(&format!("Demeanor: {}\n", self.demeanor));
        }
        prompt.push('\n');

        if !self.history.is_empty() {
            prompt.push_str("## Conversation\n");
            prompt.push_str(&render(self.history));
            prompt.push('\n');
        }

        prompt.push_str("## Player Says\n");
        prompt.push_str(self.utterance);
        prompt.push_str("\n\n");

        prompt.push_str("## Turn Outcome\n");
        prompt.push_str(&self.outcome.to_context());
        prompt.push('\n');

        if !self.knowledge.is_empty() {
            prompt.push_str("## Knowledge\n");
            prompt.push_str(&self.knowledge.to_context());
            prompt.push('\n');
        }

        prompt
    }
}

/// Produces the NPC's spoken line.
pub trait ResponseGenerator {
    fn respond(&self, request: &ResponseRequest<'_>) -> Result<String, CollaboratorError>;
}

/// Ask the generator for a line, falling back to [`FALLBACK_RESPONSE`].
pub fn respond_or_fallback(generator: &dyn ResponseGenerator, request: &ResponseRequest<'_>) -> String {
    match generator.respond(request) {
        Ok(text) => text,
        Err(error) => {
            warn!(%error, npc = request.npc, "response generation failed, using fallback");
            FALLBACK_RESPONSE.to_string()
        }
    }
}
