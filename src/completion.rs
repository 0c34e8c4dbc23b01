use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a message in a chat completion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A language model that produces one reply for a list of messages
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a reply to the given conversation
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}
