use async_trait::async_trait;

use crate::AiError;

/// Text returned by a model together with the usage it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: Option<u32>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            total_tokens: None,
        }
    }
}

/// A hosted chat-completion model: one prompt in, one text reply out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn send_message(&self, prompt: &str) -> Result<Completion, AiError>;
}
