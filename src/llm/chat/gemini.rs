use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ ensure_success, ChatProvider, ProviderError, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE };
use crate::llm::{ ProviderConfig, ProviderKind };
use crate::models::chat::{ ChatMessage, Role };

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
    system_prompt: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        system_prompt: String
    ) -> Result<Self, ProviderError> {
        let chat_model = model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_string());

        Ok(Self {
            http: HttpClient::new(),
            api_key: api_key.trim().to_string(),
            model: chat_model,
            base_url: api_url,
            system_prompt,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key
            .clone()
            .ok_or(ProviderError::MissingCredential(ProviderKind::Gemini))?;

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.system_prompt.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request<'a>(&self, messages: &'a [ChatMessage]) -> GeminiRequest<'a> {
        let system_parts: Vec<GeminiPart<'a>> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| GeminiPart { text: &m.content })
            .collect();
        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent { role: None, parts: system_parts })
        };

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| GeminiContent {
                role: Some(if m.role == Role::Assistant { "model" } else { "user" }),
                parts: vec![GeminiPart { text: &m.content }],
            })
            .collect();

        GeminiRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig {
                temperature: DEFAULT_TEMPERATURE,
                max_output_tokens: DEFAULT_MAX_TOKENS,
            },
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiChatClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = self.endpoint();
        info!("GeminiChatClient::send() → model={} url={}", self.model, url);

        let resp = self.http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_request(messages))
            .send()
            .await
            .map_err(ProviderError::transport(ProviderKind::Gemini))?;

        let resp = ensure_success(ProviderKind::Gemini, resp).await?;
        let parsed = resp
            .json::<GoogleResponse>()
            .await
            .map_err(ProviderError::transport(ProviderKind::Gemini))?;

        let text: String = parsed.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(ProviderKind::Gemini));
        }
        Ok(text)
    }
}
