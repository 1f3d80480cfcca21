//! UI-agnostic conversation types
//!
//! Shared between the chat controller, the history store and the terminal UI.

use serde::{Deserialize, Serialize};

/// Id of the greeting that opens every session
pub const GREETING_ID: &str = "initial";

pub const GREETING_TEXT: &str =
    "Olá! Sou seu assistente para o monitoramento do rebanho. Como posso ajudar?";

/// A chat message in the assistant conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    /// Grounding citations, assistant messages only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<GroundingSource>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A title/URI pair the AI used to ground its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub uri: String,
}

impl GroundingSource {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Ver no mapa")
    }
}

impl ChatMessage {
    pub fn greeting() -> Self {
        Self {
            id: GREETING_ID.to_string(),
            role: ChatRole::Assistant,
            text: GREETING_TEXT.to_string(),
            sources: Vec::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::User,
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>, sources: Vec<GroundingSource>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            text: text.into(),
            sources,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }

    pub fn is_greeting(&self) -> bool {
        self.id == GREETING_ID
    }
}
