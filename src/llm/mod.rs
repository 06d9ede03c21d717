pub mod azure_openai;

pub use azure_openai::AzureOpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a chat-completion message list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling settings for one completion request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the model for a JSON object reply.
    pub json_response: bool,
}

/// A hosted chat-completion model.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Returns the text of the first choice, verbatim.
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String>;
}
