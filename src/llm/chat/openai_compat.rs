//! Wire format shared by vendors exposing an OpenAI-style
//! `/v1/chat/completions` endpoint (Together AI, OpenRouter).

use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ ensure_success, ProviderError, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE };
use crate::llm::ProviderKind;
use crate::models::chat::ChatMessage;

pub const CHAT_COMPLETIONS_ROUTE: &str = "/v1/chat/completions";

#[derive(Serialize)]
pub struct CompatChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
struct CompatResponse {
    #[serde(default)]
    choices: Vec<CompatChoice>,
}

#[derive(Deserialize)]
struct CompatChoice {
    message: CompatMessage,
}

#[derive(Deserialize)]
struct CompatMessage {
    content: Option<String>,
}

pub struct OpenAICompatClient {
    http: HttpClient,
    kind: ProviderKind,
    model: String,
    endpoint: String,
}

impl OpenAICompatClient {
    pub fn new(
        kind: ProviderKind,
        api_key: &str,
        model: String,
        base_url: &str,
        extra_headers: HeaderMap
    ) -> Result<Self, ProviderError> {
        let mut headers = extra_headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|e| {
                ProviderError::InvalidConfig {
                    provider: kind,
                    message: format!("Invalid API key format: {}", e),
                }
            })?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(ProviderError::transport(kind))?;

        Ok(Self {
            http,
            kind,
            model,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_ROUTE),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> CompatChatRequest<'a> {
        CompatChatRequest {
            model: &self.model,
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let resp = self.http
            .post(&self.endpoint)
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(ProviderError::transport(self.kind))?;

        let resp = ensure_success(self.kind, resp).await?;
        let parsed = resp
            .json::<CompatResponse>()
            .await
            .map_err(ProviderError::transport(self.kind))?;

        parsed.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(ProviderError::EmptyResponse(self.kind))
    }
}
