use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };

use super::{ ensure_success, ChatProvider, ProviderError, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE };
use crate::llm::{ ProviderConfig, ProviderKind };
use crate::models::chat::{ ChatMessage, Role };

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    system_prompt: String,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        system_prompt: String
    ) -> Result<Self, ProviderError> {
        let chat_model = model.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key.trim()).map_err(|e| ProviderError::InvalidConfig {
                provider: ProviderKind::Anthropic,
                message: format!("Invalid API key format: {}", e),
            })?
        );
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION)
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(ProviderError::transport(ProviderKind::Anthropic))?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
            system_prompt,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key
            .clone()
            .ok_or(ProviderError::MissingCredential(ProviderKind::Anthropic))?;

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.system_prompt.clone(),
        )
    }

    /// The messages API takes system text as a top-level field, so system
    /// turns are lifted out of the sequence.
    fn build_request<'a>(&'a self, messages: &'a [ChatMessage]) -> AnthropicRequest<'a> {
        let system_parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let system = if system_parts.is_empty() { None } else { Some(system_parts.join("\n\n")) };

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage { role: m.role.as_str(), content: &m.content })
            .collect();

        AnthropicRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            system,
            messages: turns,
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicChatClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let resp = self.http
            .post(&url)
            .json(&self.build_request(messages))
            .send()
            .await
            .map_err(ProviderError::transport(ProviderKind::Anthropic))?;

        let resp = ensure_success(ProviderKind::Anthropic, resp).await?;
        let parsed = resp
            .json::<AnthropicResponse>()
            .await
            .map_err(ProviderError::transport(ProviderKind::Anthropic))?;

        let text: String = parsed.content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(ProviderKind::Anthropic));
        }
        Ok(text)
    }
}
