use async_trait::async_trait;
use reqwest::header::{ HeaderMap, HeaderName, HeaderValue };

use super::openai_compat::OpenAICompatClient;
use super::{ ChatProvider, ProviderError };
use crate::llm::{ ProviderConfig, ProviderKind };
use crate::models::chat::ChatMessage;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
pub const OPENROUTER_DEFAULT_MODEL: &str = "openrouter/auto";
pub const DEFAULT_SITE_URL: &str = "https://neuroexpert.vercel.app";
const APP_TITLE: &str = "NeuroExpert";

pub struct OpenRouterChatClient {
    inner: OpenAICompatClient,
    system_prompt: String,
}

fn attribution_headers(site_url: &str) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    let referer = HeaderValue::from_str(site_url).map_err(|e| ProviderError::InvalidConfig {
        provider: ProviderKind::OpenRouter,
        message: format!("Invalid site url '{}': {}", site_url, e),
    })?;
    headers.insert(HeaderName::from_static("http-referer"), referer);
    headers.insert(HeaderName::from_static("x-title"), HeaderValue::from_static(APP_TITLE));
    Ok(headers)
}

impl OpenRouterChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        site_url: Option<String>,
        system_prompt: String
    ) -> Result<Self, ProviderError> {
        let chat_model = model.unwrap_or_else(|| OPENROUTER_DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| OPENROUTER_BASE_URL.to_string());
        let site = site_url.unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        let inner = OpenAICompatClient::new(
            ProviderKind::OpenRouter,
            &api_key,
            chat_model,
            &api_url,
            attribution_headers(&site)?
        )?;
        Ok(Self { inner, system_prompt })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key
            .clone()
            .ok_or(ProviderError::MissingCredential(ProviderKind::OpenRouter))?;

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.site_url.clone(),
            config.system_prompt.clone(),
        )
    }
}

#[async_trait]
impl ChatProvider for OpenRouterChatClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
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
