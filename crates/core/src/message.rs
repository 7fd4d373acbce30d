//! Chat message domain types.
//!
//! A `ChatMessage` is the value object handed between the UI layer, the
//! budgeting pipeline, and the completion API client. It is immutable once
//! built: budgeting never edits a message in place, it builds a new one.

use serde::{Deserialize, Deserializer, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions and injected reference material
    System,
    /// The note author chatting in the sidebar
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// Wire name of the role (`"system"`, `"user"`, `"assistant"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Whether this role is one of the two conversational parties.
    pub fn is_conversational(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{role, content}` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: Role,

    /// Non-string content (null, numbers, objects) is read as empty text.
    #[serde(default, deserialize_with = "lenient_content")]
    content: String,
}

impl ChatMessage {
    /// Create a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Same role, new content. Used when a budgeting pass compresses a message.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self::new(self.role, content)
    }
}

fn lenient_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}
