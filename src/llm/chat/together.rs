use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::openai_compat::OpenAICompatClient;
use super::{ ChatProvider, ProviderError };
use crate::llm::{ ProviderConfig, ProviderKind };
use crate::models::chat::ChatMessage;

pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz";
pub const TOGETHER_DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

pub struct TogetherChatClient {
    inner: OpenAICompatClient,
    system_prompt: String,
}

impl TogetherChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        system_prompt: String
    ) -> Result<Self, ProviderError> {
        let chat_model = model.unwrap_or_else(|| TOGETHER_DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| TOGETHER_BASE_URL.to_string());
        let inner = OpenAICompatClient::new(
            ProviderKind::Together,
            &api_key,
            chat_model,
            &api_url,
            HeaderMap::new()
        )?;
        Ok(Self { inner, system_prompt })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key
            .clone()
            .ok_or(ProviderError::MissingCredential(ProviderKind::Together))?;

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.system_prompt.clone(),
        )
    }
}

#[async_trait]
impl ChatProvider for TogetherChatClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Together
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.inner.complete(messages).await
    }
}
