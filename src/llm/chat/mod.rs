pub mod openai_compat;
pub mod together;
pub mod openrouter;
pub mod anthropic;
pub mod gemini;
pub mod registry;

use async_trait::async_trait;
use log::{ info, warn };
use std::sync::Arc;
use thiserror::Error;

use super::{ ProviderConfig, ProviderKind };
use self::anthropic::AnthropicChatClient;
use self::gemini::GeminiChatClient;
use self::openrouter::OpenRouterChatClient;
use self::together::TogetherChatClient;
use crate::models::chat::{ ChatMessage, ChatOutcome, Role };

pub use self::registry::ProviderRegistry;

/// Sampling parameters shared by every vendor adapter.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} API key is required")]
    MissingCredential(ProviderKind),
    #[error("invalid {provider} configuration: {message}")]
    InvalidConfig {
        provider: ProviderKind,
        message: String,
    },
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned HTTP {status}: {body}")]
    Upstream {
        provider: ProviderKind,
        status: u16,
        body: String,
    },
    #[error("{0} returned no completion text")]
    EmptyResponse(ProviderKind),
}

impl ProviderError {
    pub(crate) fn transport(provider: ProviderKind) -> impl FnOnce(reqwest::Error) -> ProviderError {
        move |source| ProviderError::Transport { provider, source }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    fn system_prompt(&self) -> &str;

    /// One completion call with an already normalized conversation.
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;

    async fn chat(
        &self,
        prompt: &str,
        history: Vec<ChatMessage>
    ) -> Result<ChatOutcome, ProviderError> {
        let mut messages = prepare_conversation(prompt, history, self.system_prompt());
        info!(
            "{} chat → model={} messages={}",
            self.kind(),
            self.model(),
            messages.len()
        );
        let text = self.send(&messages).await?;
        messages.push(ChatMessage::assistant(text.clone()));
        Ok(ChatOutcome { text, updated_history: messages })
    }
}

/// Prepends the default system message unless the history already opens
/// with one, then appends the user turn.
pub fn prepare_conversation(
    prompt: &str,
    history: Vec<ChatMessage>,
    system_prompt: &str
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    let has_system = history.first().map(|m| m.role == Role::System).unwrap_or(false);
    if !has_system {
        messages.push(ChatMessage::system(system_prompt));
    }
    messages.extend(history);
    messages.push(ChatMessage::user(prompt));
    messages
}

pub(crate) async fn ensure_success(
    provider: ProviderKind,
    resp: reqwest::Response
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read {} error body (HTTP {}): {}", provider, status, e);
            String::new()
        }
    };
    Err(ProviderError::Upstream {
        provider,
        status: status.as_u16(),
        body,
    })
}

pub fn new_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    let provider: Arc<dyn ChatProvider> = match config.kind {
        ProviderKind::Together => {
            let specific_client = TogetherChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        ProviderKind::OpenRouter => {
            let specific_client = OpenRouterChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        ProviderKind::Anthropic => {
            let specific_client = AnthropicChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        ProviderKind::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(provider)
}
