//! Conversation memory - the chat history handed to collaborators.

use serde::{Deserialize, Serialize};

/// Who said a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Player,
    Npc,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::Player => "player",
            ChatRole::Npc => "npc",
        }
    }
}

/// One line of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
    /// Position in the whole conversation, starting at 0.
    pub index: usize,
}

/// Append-only chat history for one NPC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        let index = self.entries.len();
        self.entries.push(ChatEntry {
            role,
            text: text.into(),
            index,
        });
    }

    /// The last `turns` exchanges (two entries per turn).
    pub fn window(&self, turns: usize) -> &[ChatEntry] {
        let keep = turns.saturating_mul(2).min(self.entries.len());
        &self.entries[self.entries.len() - keep..]
    }

    /// Render the last `turns` exchanges as `role: text` lines.
    pub fn to_context(&self, turns: usize) -> String {
        render(self.window(turns))
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render entries as `role: text` lines.
pub fn render(entries: &[ChatEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(entry.role.as_str());
        out.push_str(": ");
        out.push_str(&entry.text);
        out.push('\n');
    }
    out
}
